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

//! Owned view of the X.509 fields the signing and chain code relies on.

use crate::crypto::{compute_certificate_fingerprint, SignatureAlgorithm};
use crate::error::SignatureError;
use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

const OID_ED25519: &str = "1.3.101.112";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

/// Extended key usage flags relevant to signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedKeyUsageFlags {
    pub any: bool,
    pub code_signing: bool,
    pub time_stamping: bool,
}

/// Parsed certificate fields, detached from the DER buffer.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    /// Hex serial number as printed by common tooling.
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// SHA256 hex fingerprint of the DER encoding
    pub fingerprint: String,
    pub is_ca: bool,
    /// `None` when the key type cannot sign packages (e.g. RSA roots)
    pub key_algorithm: Option<SignatureAlgorithm>,
    /// `None` when the extension is absent, which allows every usage
    pub extended_key_usage: Option<ExtendedKeyUsageFlags>,
    pub(crate) der: Vec<u8>,
    pub(crate) spki_der: Vec<u8>,
    pub(crate) raw_serial: Vec<u8>,
}

impl CertificateInfo {
    /// Parses a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| SignatureError::InvalidCertificate(format!("invalid DER: {e}")))?;

        let key_algorithm = match cert.public_key().algorithm.algorithm.to_id_string().as_str() {
            OID_ED25519 => Some(SignatureAlgorithm::Ed25519),
            OID_EC_PUBLIC_KEY => Some(SignatureAlgorithm::EcdsaP256),
            _ => None,
        };

        let extended_key_usage = cert
            .extended_key_usage()
            .map_err(|e| SignatureError::InvalidCertificate(format!("bad EKU extension: {e}")))?
            .map(|ext| ExtendedKeyUsageFlags {
                any: ext.value.any,
                code_signing: ext.value.code_signing,
                time_stamping: ext.value.time_stamping,
            });

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: asn1_to_utc(cert.validity().not_before),
            not_after: asn1_to_utc(cert.validity().not_after),
            fingerprint: compute_certificate_fingerprint(der),
            is_ca: cert.is_ca(),
            key_algorithm,
            extended_key_usage,
            der: der.to_vec(),
            spki_der: cert.public_key().raw.to_vec(),
            raw_serial: cert.tbs_certificate.raw_serial().to_vec(),
        })
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> &[u8] {
        &self.spki_der
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// Whether `issuer` signed this certificate.
    pub fn is_issued_by(&self, issuer: &CertificateInfo) -> bool {
        if self.issuer != issuer.subject {
            return false;
        }
        let (Ok((_, child)), Ok((_, parent))) = (
            X509Certificate::from_der(&self.der),
            X509Certificate::from_der(&issuer.der),
        ) else {
            return false;
        };
        child.verify_signature(Some(parent.public_key())).is_ok()
    }
}

impl PartialEq for CertificateInfo {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for CertificateInfo {}

pub(crate) fn asn1_to_utc(time: ASN1Time) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
