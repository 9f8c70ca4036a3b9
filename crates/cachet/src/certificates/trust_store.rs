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

//! Trust anchors used to terminate certificate chains.

use super::info::CertificateInfo;
use crate::error::SignatureError;

/// A set of trusted root certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<CertificateInfo>,
}

impl TrustStore {
    /// An empty store. Nothing chains until roots are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a DER-encoded root.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), SignatureError> {
        let info = CertificateInfo::from_der(der)?;
        if !self.contains(&info) {
            self.anchors.push(info);
        }
        Ok(())
    }

    /// Builder form of [`TrustStore::add_der`].
    pub fn with_root_der(mut self, der: &[u8]) -> Result<Self, SignatureError> {
        self.add_der(der)?;
        Ok(self)
    }

    /// Adds every `CERTIFICATE` block found in a PEM bundle.
    pub fn add_pem_bundle(&mut self, bundle: &str) -> Result<usize, SignatureError> {
        let blocks = pem::parse_many(bundle)
            .map_err(|e| SignatureError::InvalidCertificate(format!("invalid PEM bundle: {e}")))?;
        let mut added = 0;
        for block in blocks.iter().filter(|b| b.tag() == "CERTIFICATE") {
            self.add_der(block.contents())?;
            added += 1;
        }
        Ok(added)
    }

    /// Loads the platform's root certificates.
    ///
    /// Roots the parser cannot read are skipped with a debug message.
    #[cfg(feature = "system-roots")]
    pub fn from_system() -> Self {
        let result = rustls_native_certs::load_native_certs();
        for error in &result.errors {
            tracing::warn!("Failed to load a system root certificate: {}", error);
        }

        let mut store = Self::new();
        for cert in result.certs {
            if let Err(e) = store.add_der(cert.as_ref()) {
                tracing::debug!("Skipping unreadable system root: {}", e);
            }
        }
        tracing::debug!("Loaded {} system trust anchors", store.len());
        store
    }

    pub fn contains(&self, certificate: &CertificateInfo) -> bool {
        self.anchors.iter().any(|a| a == certificate)
    }

    pub fn anchors(&self) -> &[CertificateInfo] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
