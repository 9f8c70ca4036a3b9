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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether unsigned packages are acceptable to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClientPolicy {
    /// Unsigned packages are accepted with a warning.
    #[default]
    Accept,
    /// Every package must carry a trusted signature.
    Require,
}

impl ClientPolicy {
    /// Canonical spelling written to settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Require => "Require",
        }
    }
}

impl fmt::Display for ClientPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown signature validation mode '{0}' (expected 'accept' or 'require')")]
pub struct ParseClientPolicyError(pub String);

impl FromStr for ClientPolicy {
    type Err = ParseClientPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "require" => Ok(Self::Require),
            _ => Err(ParseClientPolicyError(s.to_string())),
        }
    }
}
