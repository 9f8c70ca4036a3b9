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

//! Certificate revocation lists.
//!
//! A [`RevocationSource`] hands out the CRL for an issuing CA. Fetching is the
//! only place chain validation awaits; callers cancel by dropping the future.

use super::info::{asn1_to_utc, CertificateInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use x509_parser::prelude::*;

/// Whether chain validation consults CRLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationMode {
    #[default]
    NoCheck,
    Online,
}

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("revocation source unreachable: {0}")]
    Unreachable(String),

    #[error("malformed CRL: {0}")]
    Malformed(String),

    #[error("CRL signature does not verify against the issuer")]
    BadSignature,
}

/// Result of checking one certificate against its issuer's CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationStatus {
    Good,
    /// Not revoked, but the CRL's next update has passed.
    Stale,
    Revoked { revoked_at: DateTime<Utc> },
}

/// Supplies DER CRLs for issuing certificates.
#[async_trait]
pub trait RevocationSource: Send + Sync {
    /// The CRL published by `issuer`, or `None` if none is available.
    async fn fetch_crl(&self, issuer: &CertificateInfo) -> Result<Option<Vec<u8>>, RevocationError>;
}

/// Serves CRLs from memory, keyed by issuer name.
#[derive(Debug, Default, Clone)]
pub struct StaticRevocationSource {
    crls: HashMap<String, Vec<u8>>,
}

impl StaticRevocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a DER CRL under the issuer named inside it.
    pub fn add_crl(&mut self, der: Vec<u8>) -> Result<(), RevocationError> {
        let (_, crl) = CertificateRevocationList::from_der(&der)
            .map_err(|e| RevocationError::Malformed(e.to_string()))?;
        let issuer = crl.issuer().to_string();
        self.crls.insert(issuer, der);
        Ok(())
    }

    pub fn with_crl(mut self, der: Vec<u8>) -> Result<Self, RevocationError> {
        self.add_crl(der)?;
        Ok(self)
    }
}

#[async_trait]
impl RevocationSource for StaticRevocationSource {
    async fn fetch_crl(
        &self,
        issuer: &CertificateInfo,
    ) -> Result<Option<Vec<u8>>, RevocationError> {
        Ok(self.crls.get(&issuer.subject).cloned())
    }
}

/// Checks `certificate` against a CRL published by `issuer`.
pub fn check_crl(
    certificate: &CertificateInfo,
    issuer: &CertificateInfo,
    crl_der: &[u8],
    now: DateTime<Utc>,
) -> Result<RevocationStatus, RevocationError> {
    let (_, crl) = CertificateRevocationList::from_der(crl_der)
        .map_err(|e| RevocationError::Malformed(e.to_string()))?;

    if crl.issuer().to_string() != issuer.subject {
        return Err(RevocationError::Malformed(format!(
            "CRL issuer '{}' does not match '{}'",
            crl.issuer(),
            issuer.subject
        )));
    }

    let (_, issuer_cert) = X509Certificate::from_der(issuer.der())
        .map_err(|e| RevocationError::Malformed(e.to_string()))?;
    crl.verify_signature(issuer_cert.public_key())
        .map_err(|_| RevocationError::BadSignature)?;

    if let Some(entry) = crl
        .iter_revoked_certificates()
        .find(|entry| entry.raw_serial() == certificate.raw_serial.as_slice())
    {
        return Ok(RevocationStatus::Revoked {
            revoked_at: asn1_to_utc(entry.revocation_date),
        });
    }

    match crl.next_update() {
        Some(next) if asn1_to_utc(next) < now => Ok(RevocationStatus::Stale),
        _ => Ok(RevocationStatus::Good),
    }
}
