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

//! Package verification.
//!
//! Verification checks, for every embedded signature:
//! 1. The signed digest matches the package content (or, for a
//!    countersignature, the primary signature value)
//! 2. The signature value verifies against the signer's certificate
//! 3. Any timestamp token is intact and covers the signature value
//! 4. The signer's chain is trusted at the timestamp time, or now
//!
//! Failures of 1 to 3 always reject the package. Failures of 4 reject it under
//! [`ClientPolicy::Require`] and are reported as warnings under
//! [`ClientPolicy::Accept`], which also admits unsigned packages.

use super::audit;
use super::package_signer::read_package;
use super::placement::PackageSignatureState;
use super::timestamp::TimestampError;
use crate::certificates::{CertificatePurpose, ChainValidator, ChainWarning, SigningCertificate};
use crate::crypto::verify_signature;
use crate::error::{DiagnosticCode, SignatureError};
use crate::packaging::{
    signature_state, ArchiveError, PackageArchive, SignatureType, SignedPackageReader,
    SignerInfo, SIGNATURE_FORMAT_VERSION,
};
use crate::policy::{ClientPolicy, ClientPolicyProvider};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

/// Verification configuration.
#[derive(Debug, Clone, Default)]
pub struct VerifierSettings {
    pub policy: ClientPolicy,
}

impl VerifierSettings {
    /// Settings that reject unsigned or untrusted packages.
    pub fn require_signatures() -> Self {
        Self {
            policy: ClientPolicy::Require,
        }
    }

    /// Settings using the policy resolved by `provider`.
    pub fn from_provider(provider: &ClientPolicyProvider) -> Self {
        Self {
            policy: provider.load(),
        }
    }
}

/// Position of a signature in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRole {
    Primary,
    Countersignature,
}

/// Conditions that did not cause rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationWarning {
    UnsignedPackage,
    Revocation(ChainWarning),
    /// A trust failure accepted because the policy is `Accept`.
    UntrustedSignature {
        role: SignatureRole,
        code: DiagnosticCode,
        message: String,
    },
}

impl fmt::Display for VerificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsignedPackage => f.write_str("package is not signed"),
            Self::Revocation(warning) => warning.fmt(f),
            Self::UntrustedSignature { role, code, message } => {
                write!(f, "{role:?} signature is not trusted ({code}): {message}")
            }
        }
    }
}

/// One verified signature.
#[derive(Debug, Clone)]
pub struct VerifiedSignature {
    pub role: SignatureRole,
    pub signature_type: SignatureType,
    pub signer_subject: String,
    pub signer_fingerprint: String,
    pub signing_time: DateTime<Utc>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether the signer's chain validated.
    pub trusted: bool,
}

/// An accepted package.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub state: PackageSignatureState,
    /// Digest of the package content under the primary signature's hash
    /// algorithm; `None` for unsigned packages.
    pub content_hash: Option<String>,
    pub policy: ClientPolicy,
    pub signatures: Vec<VerifiedSignature>,
    pub warnings: Vec<VerificationWarning>,
}

impl VerificationOutcome {
    /// Signed, and every signature chained to a trusted root.
    pub fn is_fully_trusted(&self) -> bool {
        !self.signatures.is_empty() && self.signatures.iter().all(|s| s.trusted)
    }
}

/// Verifies packages against a trust store and client policy.
#[derive(Debug, Clone)]
pub struct PackageVerifier {
    validator: ChainValidator,
    settings: VerifierSettings,
}

struct SignerCheck {
    signature: VerifiedSignature,
    trust_failure: Option<SignatureError>,
    warnings: Vec<ChainWarning>,
}

enum SignedContent<'a> {
    Package(&'a PackageArchive),
    PrimarySignatureValue(&'a [u8]),
}

impl PackageVerifier {
    pub fn new(validator: ChainValidator, settings: VerifierSettings) -> Self {
        Self {
            validator,
            settings,
        }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verifies the package at `path`.
    ///
    /// Returns the outcome when the package is accepted and the rejecting
    /// error otherwise.
    pub async fn verify(&self, path: &Path) -> Result<VerificationOutcome, SignatureError> {
        let package_path = path.display().to_string();
        match self.verify_package(path).await {
            Ok(outcome) => {
                let primary = outcome.signatures.first();
                audit::log_verification_success(
                    &package_path,
                    outcome.content_hash.as_deref(),
                    primary.map(|s| s.signer_fingerprint.as_str()),
                    outcome.policy,
                    outcome.warnings.len(),
                );
                Ok(outcome)
            }
            Err(e) => {
                audit::log_verification_failure(&package_path, e.code(), &e.to_string(), None);
                Err(e)
            }
        }
    }

    async fn verify_package(&self, path: &Path) -> Result<VerificationOutcome, SignatureError> {
        let package = read_package(path).await?;
        let state = signature_state(&package)?;
        let policy = self.settings.policy;

        let Some(primary) = package.primary_signature() else {
            return match policy {
                ClientPolicy::Accept => Ok(VerificationOutcome {
                    state,
                    content_hash: None,
                    policy,
                    signatures: Vec::new(),
                    warnings: vec![VerificationWarning::UnsignedPackage],
                }),
                ClientPolicy::Require => Err(SignatureError::PackageNotSigned),
            };
        };

        if primary.format_version != SIGNATURE_FORMAT_VERSION {
            return Err(ArchiveError::Malformed(format!(
                "unsupported signature format version {}",
                primary.format_version
            ))
            .into());
        }

        let mut checks = vec![
            self.check_signer(
                &primary.signer,
                SignatureRole::Primary,
                primary.signature_type,
                SignedContent::Package(&package),
            )
            .await?,
        ];

        if let Some(countersignature) = &primary.countersignature {
            let primary_value = primary.signer.signature_bytes()?;
            checks.push(
                self.check_signer(
                    countersignature,
                    SignatureRole::Countersignature,
                    SignatureType::Repository,
                    SignedContent::PrimarySignatureValue(&primary_value),
                )
                .await?,
            );
        }

        let mut signatures = Vec::with_capacity(checks.len());
        let mut warnings = Vec::new();
        for check in checks {
            warnings.extend(check.warnings.into_iter().map(VerificationWarning::Revocation));
            if let Some(failure) = check.trust_failure {
                if policy == ClientPolicy::Require {
                    return Err(failure);
                }
                warnings.push(VerificationWarning::UntrustedSignature {
                    role: check.signature.role,
                    code: failure.code(),
                    message: failure.to_string(),
                });
            }
            signatures.push(check.signature);
        }

        Ok(VerificationOutcome {
            state,
            content_hash: Some(package.content_hash(primary.signer.hash_algorithm)),
            policy,
            signatures,
            warnings,
        })
    }

    async fn check_signer(
        &self,
        signer: &SignerInfo,
        role: SignatureRole,
        expected_type: SignatureType,
        content: SignedContent<'_>,
    ) -> Result<SignerCheck, SignatureError> {
        let attributes = signer.attributes()?;
        if attributes.signature_type != expected_type {
            return Err(integrity(format!(
                "{role:?} signature claims to be a {} signature",
                attributes.signature_type
            )));
        }
        if expected_type == SignatureType::Repository && attributes.repository.is_none() {
            return Err(integrity(format!(
                "{role:?} repository signature has no repository metadata"
            )));
        }
        if attributes.signed_digest_algorithm != signer.hash_algorithm {
            return Err(integrity(format!("{role:?} signature hash algorithm mismatch")));
        }

        let actual_digest = match content {
            SignedContent::Package(package) => package.content_hash(signer.hash_algorithm),
            SignedContent::PrimarySignatureValue(value) => signer.hash_algorithm.hex_digest(value),
        };
        if actual_digest != attributes.signed_digest {
            return Err(integrity(format!(
                "{role:?} signature digest mismatch (expected {}, got {})",
                attributes.signed_digest, actual_digest
            )));
        }

        let certificate = SigningCertificate::from_der(&signer.certificate_der()?, None)?
            .with_additional_certificates(signer.chain_der()?);
        if certificate.fingerprint() != attributes.signer_fingerprint {
            return Err(integrity(format!(
                "{role:?} signer certificate does not match the signed fingerprint"
            )));
        }
        if certificate.info().key_algorithm != Some(signer.signature_algorithm) {
            return Err(integrity(format!(
                "{role:?} signature algorithm does not match the signer key"
            )));
        }

        let attribute_bytes = signer.signed_attributes_bytes()?;
        let signature = signer.signature_bytes()?;
        verify_signature(
            signer.signature_algorithm,
            certificate.info().public_key_der(),
            &signer.hash_algorithm.digest(&attribute_bytes),
            &signature,
        )
        .map_err(|e| integrity(format!("{role:?} signature value is invalid: {e}")))?;

        let mut trust_failure = None;
        let mut timestamp = None;
        if let Some(token) = &signer.timestamp {
            let info = token.verify_for(&signature, None)?;
            let authority = token.authority_certificate()?;
            match self
                .validator
                .validate_at(&authority, CertificatePurpose::Timestamping, info.gen_time)
                .await
            {
                Ok(_) if certificate.info().is_valid_at(info.gen_time) => {
                    timestamp = Some(info.gen_time);
                }
                Ok(_) => {
                    trust_failure = Some(
                        TimestampError::OutsideCertificateValidity(info.gen_time).into(),
                    );
                }
                Err(e) => {
                    trust_failure =
                        Some(TimestampError::UntrustedAuthority(e.to_string()).into());
                }
            }
        }

        let purpose = match (role, expected_type) {
            (SignatureRole::Countersignature, _) => CertificatePurpose::RepositoryCountersigning,
            (SignatureRole::Primary, SignatureType::Author) => CertificatePurpose::AuthorSigning,
            (SignatureRole::Primary, SignatureType::Repository) => {
                CertificatePurpose::RepositorySigning
            }
        };
        let at = timestamp.unwrap_or_else(Utc::now);

        let mut warnings = Vec::new();
        match self.validator.validate_at(&certificate, purpose, at).await {
            Ok(result) => warnings = result.warnings,
            Err(e) if e.code().is_trust_failure() => {
                trust_failure.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }

        Ok(SignerCheck {
            signature: VerifiedSignature {
                role,
                signature_type: attributes.signature_type,
                signer_subject: certificate.subject().to_string(),
                signer_fingerprint: certificate.fingerprint().to_string(),
                signing_time: attributes.signing_time,
                timestamp,
                trusted: trust_failure.is_none(),
            },
            trust_failure,
            warnings,
        })
    }
}

fn integrity(reason: String) -> SignatureError {
    SignatureError::IntegrityCheckFailed(reason)
}
