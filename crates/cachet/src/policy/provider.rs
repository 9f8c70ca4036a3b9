/*
 *  Copyright 2025-2026 Cachet Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Resolves the client trust policy across settings scopes.

use super::client_policy::ClientPolicy;
use super::settings::SettingsScope;
use super::PolicyError;
use crate::security::audit;
use parking_lot::Mutex;

/// Settings key holding the policy.
pub const SIGNATURE_VALIDATION_MODE_KEY: &str = "signatureValidationMode";

/// Loads, saves and deletes the client policy.
///
/// The loaded value is cached per instance. Another instance writing the same
/// files is only observed after [`ClientPolicyProvider::reload`].
pub struct ClientPolicyProvider {
    scopes: Vec<Box<dyn SettingsScope>>,
    cached: Mutex<Option<ClientPolicy>>,
}

impl ClientPolicyProvider {
    /// `scopes` are ordered nearest first.
    pub fn new(scopes: Vec<Box<dyn SettingsScope>>) -> Self {
        Self {
            scopes,
            cached: Mutex::new(None),
        }
    }

    pub fn scopes(&self) -> &[Box<dyn SettingsScope>] {
        &self.scopes
    }

    /// The effective policy.
    ///
    /// The nearest scope that defines the key decides, whatever its value.
    /// An empty or unrecognized value resolves to [`ClientPolicy::Accept`], as
    /// does the absence of any definition. Scopes that cannot be read are
    /// skipped with a warning.
    pub fn load(&self) -> ClientPolicy {
        let mut cached = self.cached.lock();
        if let Some(policy) = *cached {
            return policy;
        }

        let policy = self.resolve();
        *cached = Some(policy);
        policy
    }

    /// Drops the cached value so the next [`load`](Self::load) re-reads the
    /// scopes.
    pub fn reload(&self) {
        *self.cached.lock() = None;
    }

    /// Writes `policy` into the nearest writable scope.
    pub fn save(&self, policy: ClientPolicy) -> Result<(), PolicyError> {
        let scope = self
            .scopes
            .iter()
            .find(|s| s.is_writable())
            .ok_or(PolicyError::NoWritableScope)?;

        scope.set(SIGNATURE_VALIDATION_MODE_KEY, policy.as_str())?;
        self.reload();

        audit::log_policy_saved(&scope.name(), policy);
        Ok(())
    }

    /// Removes the policy from the nearest writable scope that defines it.
    ///
    /// Returns whether a value was removed. Definitions in read-only scopes
    /// remain in effect.
    pub fn delete(&self) -> Result<bool, PolicyError> {
        for scope in self.scopes.iter().filter(|s| s.is_writable()) {
            if scope.get(SIGNATURE_VALIDATION_MODE_KEY)?.is_some() {
                let removed = scope.remove(SIGNATURE_VALIDATION_MODE_KEY)?;
                self.reload();
                audit::log_policy_deleted(&scope.name());
                return Ok(removed);
            }
        }
        self.reload();
        Ok(false)
    }

    fn resolve(&self) -> ClientPolicy {
        for scope in &self.scopes {
            let value = match scope.get(SIGNATURE_VALIDATION_MODE_KEY) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Skipping unreadable settings scope {}: {}", scope.name(), e);
                    continue;
                }
            };

            let Some(value) = value else {
                continue;
            };

            return match value.parse::<ClientPolicy>() {
                Ok(policy) => {
                    tracing::debug!("Client policy {} from {}", policy, scope.name());
                    policy
                }
                Err(e) => {
                    tracing::warn!("{} in {}; using Accept", e, scope.name());
                    ClientPolicy::Accept
                }
            };
        }
        ClientPolicy::default()
    }
}

impl std::fmt::Debug for ClientPolicyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.scopes.iter().map(|s| s.name()).collect();
        f.debug_struct("ClientPolicyProvider")
            .field("scopes", &names)
            .field("cached", &*self.cached.lock())
            .finish()
    }
}
