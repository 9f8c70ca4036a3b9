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

//! The signature document embedded in a package.

use super::archive::ArchiveError;
use crate::crypto::{HashAlgorithmName, SignatureAlgorithm};
use crate::security::TimestampToken;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Version written into every signature document.
pub const SIGNATURE_FORMAT_VERSION: u32 = 1;

/// Who produced a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    Author,
    Repository,
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Author => f.write_str("author"),
            Self::Repository => f.write_str("repository"),
        }
    }
}

/// Repository identity carried by repository signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub service_index: Url,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
}

/// Attributes covered by a signature value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttributes {
    pub signature_type: SignatureType,
    /// Hex digest of what is signed: the package content for a primary
    /// signature, the primary signature value for a countersignature.
    pub signed_digest: String,
    pub signed_digest_algorithm: HashAlgorithmName,
    pub signing_time: DateTime<Utc>,
    pub signer_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryMetadata>,
}

/// One signer's contribution: certificate, signed attributes, signature
/// value and optional timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Base64 DER signing certificate.
    pub certificate: String,
    /// Base64 DER intermediates, leaf excluded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    pub signature_algorithm: SignatureAlgorithm,
    pub hash_algorithm: HashAlgorithmName,
    /// Base64 of the exact JSON bytes that were signed.
    pub signed_attributes: String,
    /// Base64 signature value.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimestampToken>,
}

impl SignerInfo {
    /// Decodes the signed attributes.
    pub fn attributes(&self) -> Result<SignedAttributes, ArchiveError> {
        let bytes = self.signed_attributes_bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn signed_attributes_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        decode_field("signed_attributes", &self.signed_attributes)
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        decode_field("signature", &self.signature)
    }

    pub fn certificate_der(&self) -> Result<Vec<u8>, ArchiveError> {
        decode_field("certificate", &self.certificate)
    }

    pub fn chain_der(&self) -> Result<Vec<Vec<u8>>, ArchiveError> {
        self.chain
            .iter()
            .map(|c| decode_field("chain", c))
            .collect()
    }
}

/// The embedded signature document.
///
/// Exactly one primary signature exists per signed package. An author
/// primary may carry one repository countersignature over its signature
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimarySignature {
    pub format_version: u32,
    pub signature_type: SignatureType,
    pub signer: SignerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countersignature: Option<SignerInfo>,
}

impl PrimarySignature {
    pub fn new(signature_type: SignatureType, signer: SignerInfo) -> Self {
        Self {
            format_version: SIGNATURE_FORMAT_VERSION,
            signature_type,
            signer,
            countersignature: None,
        }
    }

    pub fn has_repository_countersignature(&self) -> bool {
        self.countersignature.is_some()
    }
}

pub(crate) fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, ArchiveError> {
    STANDARD
        .decode(value)
        .map_err(|e| ArchiveError::Malformed(format!("field '{field}' is not valid base64: {e}")))
}
