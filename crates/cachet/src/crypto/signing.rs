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

//! Signature primitives for package signing.
//!
//! Provides functions for:
//! - Loading PKCS#8 private keys into a [`PrivateKeyHandle`]
//! - Signing digests with Ed25519 or ECDSA P-256
//! - Verifying signatures against a DER SubjectPublicKeyInfo
//! - Computing SHA256 certificate fingerprints

use ed25519_dalek::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use ed25519_dalek::{Signer as _, Verifier as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Unsupported private key: {0}")]
    UnsupportedPrivateKey(String),

    #[error("Invalid public key for {algorithm}: {reason}")]
    InvalidPublicKey {
        algorithm: SignatureAlgorithm,
        reason: String,
    },

    #[error("Invalid {algorithm} signature encoding: {reason}")]
    InvalidSignatureEncoding {
        algorithm: SignatureAlgorithm,
        reason: String,
    },

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Signature algorithms a signing certificate key may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
}

impl SignatureAlgorithm {
    /// Identifier used in signature documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::EcdsaP256 => "ecdsa-p256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded private key.
///
/// Both key types wipe their secret material when dropped, so releasing a
/// handle is a matter of letting it go out of scope.
pub enum PrivateKeyHandle {
    Ed25519(ed25519_dalek::SigningKey),
    EcdsaP256(p256::ecdsa::SigningKey),
}

impl PrivateKeyHandle {
    /// Loads a PKCS#8 DER private key, trying Ed25519 then P-256.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, SigningError> {
        if let Ok(key) = ed25519_dalek::SigningKey::from_pkcs8_der(der) {
            return Ok(Self::Ed25519(key));
        }
        p256::ecdsa::SigningKey::from_pkcs8_der(der)
            .map(Self::EcdsaP256)
            .map_err(|e| SigningError::UnsupportedPrivateKey(e.to_string()))
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
            Self::EcdsaP256(_) => SignatureAlgorithm::EcdsaP256,
        }
    }

    /// Signs `message`. ECDSA signatures are DER encoded.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            Self::EcdsaP256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
        }
    }

    /// Whether `spki_der` holds the public half of this key.
    pub fn matches_public_key(&self, spki_der: &[u8]) -> bool {
        match self {
            Self::Ed25519(key) => ed25519_dalek::VerifyingKey::from_public_key_der(spki_der)
                .map(|public| public == key.verifying_key())
                .unwrap_or(false),
            Self::EcdsaP256(key) => p256::ecdsa::VerifyingKey::from_public_key_der(spki_der)
                .map(|public| &public == key.verifying_key())
                .unwrap_or(false),
        }
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKeyHandle")
            .field(&self.algorithm())
            .finish()
    }
}

/// Verifies `signature` over `message` with the public key in `spki_der`.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    spki_der: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), SigningError> {
    match algorithm {
        SignatureAlgorithm::Ed25519 => {
            let key = ed25519_dalek::VerifyingKey::from_public_key_der(spki_der).map_err(|e| {
                SigningError::InvalidPublicKey {
                    algorithm,
                    reason: e.to_string(),
                }
            })?;
            let sig = ed25519_dalek::Signature::from_slice(signature).map_err(|e| {
                SigningError::InvalidSignatureEncoding {
                    algorithm,
                    reason: e.to_string(),
                }
            })?;
            key.verify(message, &sig)
                .map_err(|_| SigningError::VerificationFailed)
        }
        SignatureAlgorithm::EcdsaP256 => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der).map_err(|e| {
                SigningError::InvalidPublicKey {
                    algorithm,
                    reason: e.to_string(),
                }
            })?;
            let sig = p256::ecdsa::Signature::from_der(signature).map_err(|e| {
                SigningError::InvalidSignatureEncoding {
                    algorithm,
                    reason: e.to_string(),
                }
            })?;
            key.verify(message, &sig)
                .map_err(|_| SigningError::VerificationFailed)
        }
    }
}

/// Computes the SHA256 hex fingerprint of a DER certificate.
///
/// # Returns
///
/// A 64-character hex string.
pub fn compute_certificate_fingerprint(certificate_der: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(certificate_der);
    hex::encode(hasher.finalize())
}
