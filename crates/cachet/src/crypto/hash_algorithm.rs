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

//! Digest algorithm names and the allow-list check used by signing requests.

use crate::error::SignatureError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// A digest algorithm accepted for package signatures and timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashAlgorithmName {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithmName {
    /// Canonical upper-case name (`SHA256`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Computes the digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Computes the digest of `data` as lowercase hex.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a validated algorithm will be used for. Only affects error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmRole {
    Signature,
    Timestamp,
}

impl fmt::Display for AlgorithmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => f.write_str("signature"),
            Self::Timestamp => f.write_str("timestamp"),
        }
    }
}

/// Versioned signing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningProfile {
    V1,
}

impl SigningProfile {
    /// Algorithms allowed by this version, in preference order.
    pub fn allowed_hash_algorithms(&self) -> &'static [HashAlgorithmName] {
        match self {
            Self::V1 => &[
                HashAlgorithmName::Sha256,
                HashAlgorithmName::Sha384,
                HashAlgorithmName::Sha512,
            ],
        }
    }
}

/// Validates a requested algorithm name against the current signing
/// profile. Matching is case-insensitive.
pub fn validate_hash_algorithm(
    name: &str,
    role: AlgorithmRole,
) -> Result<HashAlgorithmName, SignatureError> {
    validate_hash_algorithm_for(name, role, SigningProfile::V1)
}

/// Like [`validate_hash_algorithm`] for an explicit signing profile.
pub fn validate_hash_algorithm_for(
    name: &str,
    role: AlgorithmRole,
    profile: SigningProfile,
) -> Result<HashAlgorithmName, SignatureError> {
    let allowed = profile.allowed_hash_algorithms();
    let requested = name.trim();

    allowed
        .iter()
        .copied()
        .find(|alg| alg.as_str().eq_ignore_ascii_case(requested))
        .ok_or_else(|| SignatureError::UnsupportedAlgorithm {
            name: name.to_string(),
            role,
            supported: allowed
                .iter()
                .map(|alg| alg.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}
