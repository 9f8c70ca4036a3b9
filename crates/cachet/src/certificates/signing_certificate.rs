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

//! Signing certificates and scoped private key handles.

use super::info::CertificateInfo;
use crate::crypto::PrivateKeyHandle;
use crate::error::SignatureError;
use std::fmt;
use std::ops::Deref;

const PEM_CERTIFICATE: &str = "CERTIFICATE";
const PEM_PRIVATE_KEY: &str = "PRIVATE KEY";

/// An X.509 certificate with optional PKCS#8 private key material and the
/// intermediates needed to chain it to a trusted root.
#[derive(Clone)]
pub struct SigningCertificate {
    info: CertificateInfo,
    private_key_der: Option<Vec<u8>>,
    additional_certificates: Vec<Vec<u8>>,
}

impl SigningCertificate {
    /// Loads a certificate and optional private key from DER.
    pub fn from_der(
        certificate_der: &[u8],
        private_key_der: Option<&[u8]>,
    ) -> Result<Self, SignatureError> {
        let info = CertificateInfo::from_der(certificate_der)?;
        Ok(Self {
            info,
            private_key_der: private_key_der.map(<[u8]>::to_vec),
            additional_certificates: Vec::new(),
        })
    }

    /// Loads from PEM. The first `CERTIFICATE` block is the signing
    /// certificate; any further blocks become additional chain certificates.
    pub fn from_pem(
        certificate_pem: &str,
        private_key_pem: Option<&str>,
    ) -> Result<Self, SignatureError> {
        let blocks = pem::parse_many(certificate_pem)
            .map_err(|e| SignatureError::InvalidCertificate(format!("invalid PEM: {e}")))?;
        let mut certificates = blocks
            .into_iter()
            .filter(|block| block.tag() == PEM_CERTIFICATE)
            .map(|block| block.into_contents());

        let leaf = certificates.next().ok_or_else(|| {
            SignatureError::InvalidCertificate("no CERTIFICATE block found".to_string())
        })?;
        let additional: Vec<Vec<u8>> = certificates.collect();

        let key = match private_key_pem {
            Some(key_pem) => {
                let block = pem::parse(key_pem).map_err(|e| {
                    SignatureError::InvalidCertificate(format!("invalid private key PEM: {e}"))
                })?;
                if block.tag() != PEM_PRIVATE_KEY {
                    return Err(SignatureError::InvalidCertificate(format!(
                        "expected a PKCS#8 '{}' block, found '{}'",
                        PEM_PRIVATE_KEY,
                        block.tag()
                    )));
                }
                Some(block.into_contents())
            }
            None => None,
        };

        Ok(Self::from_der(&leaf, key.as_deref())?.with_additional_certificates(additional))
    }

    /// Appends intermediates used during chain building.
    pub fn with_additional_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.additional_certificates.extend(certificates);
        self
    }

    /// A copy of this certificate without private key material.
    pub fn public_only(&self) -> Self {
        Self {
            info: self.info.clone(),
            private_key_der: None,
            additional_certificates: self.additional_certificates.clone(),
        }
    }

    pub fn info(&self) -> &CertificateInfo {
        &self.info
    }

    pub fn certificate_der(&self) -> &[u8] {
        self.info.der()
    }

    pub fn additional_certificates(&self) -> &[Vec<u8>] {
        &self.additional_certificates
    }

    pub fn fingerprint(&self) -> &str {
        &self.info.fingerprint
    }

    pub fn subject(&self) -> &str {
        &self.info.subject
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key_der.is_some()
    }

    /// Acquires the private key for the duration of one signing call.
    ///
    /// The key must match the certificate's public key. The returned guard
    /// releases the handle when dropped.
    pub fn acquire_private_key(&self) -> Result<KeyHandleGuard<'_>, SignatureError> {
        let der = self
            .private_key_der
            .as_deref()
            .ok_or(SignatureError::MissingPrivateKey)?;
        let handle = PrivateKeyHandle::from_pkcs8_der(der)
            .map_err(|e| SignatureError::InvalidCertificate(e.to_string()))?;
        if !handle.matches_public_key(self.info.public_key_der()) {
            return Err(SignatureError::InvalidCertificate(
                "private key does not match the certificate public key".to_string(),
            ));
        }
        tracing::trace!(fingerprint = %self.info.fingerprint, "acquired private key handle");
        Ok(KeyHandleGuard {
            handle,
            certificate: self,
        })
    }
}

impl fmt::Debug for SigningCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCertificate")
            .field("subject", &self.info.subject)
            .field("fingerprint", &self.info.fingerprint)
            .field("has_private_key", &self.has_private_key())
            .field("additional_certificates", &self.additional_certificates.len())
            .finish()
    }
}

impl Drop for SigningCertificate {
    fn drop(&mut self) {
        if let Some(key) = self.private_key_der.as_mut() {
            key.iter_mut().for_each(|b| *b = 0);
        }
    }
}

/// A private key borrowed from a [`SigningCertificate`] for one operation.
pub struct KeyHandleGuard<'a> {
    handle: PrivateKeyHandle,
    certificate: &'a SigningCertificate,
}

impl KeyHandleGuard<'_> {
    pub fn certificate(&self) -> &SigningCertificate {
        self.certificate
    }
}

impl Deref for KeyHandleGuard<'_> {
    type Target = PrivateKeyHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for KeyHandleGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(
            fingerprint = %self.certificate.info.fingerprint,
            "released private key handle"
        );
    }
}
