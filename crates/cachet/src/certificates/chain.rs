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

//! Certificate chain validation.
//!
//! Chains are built from the signing certificate through the caller-supplied
//! intermediates to an anchor in the [`TrustStore`]. Every link's signature is
//! verified, every element must be inside its validity window at the
//! validation time, and CRLs are consulted when [`RevocationMode::Online`] is
//! configured.

use super::info::CertificateInfo;
use super::revocation::{check_crl, RevocationMode, RevocationSource, RevocationStatus};
use super::signing_certificate::SigningCertificate;
use super::trust_store::TrustStore;
use crate::error::SignatureError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_CHAIN_DEPTH: usize = 16;

/// What the validated certificate will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificatePurpose {
    AuthorSigning,
    RepositorySigning,
    RepositoryCountersigning,
    Timestamping,
}

impl CertificatePurpose {
    fn allows(&self, certificate: &CertificateInfo) -> bool {
        let Some(eku) = certificate.extended_key_usage else {
            return true;
        };
        match self {
            Self::Timestamping => eku.any || eku.time_stamping,
            _ => eku.any || eku.code_signing,
        }
    }
}

impl fmt::Display for CertificatePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthorSigning => "author signing",
            Self::RepositorySigning => "repository signing",
            Self::RepositoryCountersigning => "repository countersigning",
            Self::Timestamping => "timestamping",
        };
        f.write_str(name)
    }
}

/// Advisory conditions that do not fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainWarning {
    RevocationUnavailable { subject: String, reason: String },
    RevocationStale { subject: String },
}

impl fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RevocationUnavailable { subject, reason } => {
                write!(f, "revocation status of '{subject}' is unknown: {reason}")
            }
            Self::RevocationStale { subject } => {
                write!(f, "revocation list for '{subject}' is past its next update")
            }
        }
    }
}

/// A successfully validated chain, leaf first.
#[derive(Debug, Clone)]
pub struct ChainValidationResult {
    pub chain: Vec<CertificateInfo>,
    pub warnings: Vec<ChainWarning>,
    pub validated_at: DateTime<Utc>,
}

impl ChainValidationResult {
    pub fn root(&self) -> Option<&CertificateInfo> {
        self.chain.last()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainValidatorConfig {
    pub revocation_mode: RevocationMode,
    pub max_depth: usize,
}

impl Default for ChainValidatorConfig {
    fn default() -> Self {
        Self {
            revocation_mode: RevocationMode::NoCheck,
            max_depth: MAX_CHAIN_DEPTH,
        }
    }
}

/// Validates signing certificates against a trust store.
#[derive(Clone)]
pub struct ChainValidator {
    trust_store: Arc<TrustStore>,
    revocation: Option<Arc<dyn RevocationSource>>,
    config: ChainValidatorConfig,
}

impl ChainValidator {
    pub fn new(trust_store: TrustStore) -> Self {
        Self {
            trust_store: Arc::new(trust_store),
            revocation: None,
            config: ChainValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChainValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables online revocation checking against `source`.
    pub fn with_revocation_source(mut self, source: Arc<dyn RevocationSource>) -> Self {
        self.revocation = Some(source);
        self.config.revocation_mode = RevocationMode::Online;
        self
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    pub fn config(&self) -> &ChainValidatorConfig {
        &self.config
    }

    /// Validates `certificate` for `purpose` at the current time.
    pub async fn validate(
        &self,
        certificate: &SigningCertificate,
        purpose: CertificatePurpose,
    ) -> Result<ChainValidationResult, SignatureError> {
        self.validate_at(certificate, purpose, Utc::now()).await
    }

    /// Validates `certificate` for `purpose` as of `at`.
    pub async fn validate_at(
        &self,
        certificate: &SigningCertificate,
        purpose: CertificatePurpose,
        at: DateTime<Utc>,
    ) -> Result<ChainValidationResult, SignatureError> {
        let leaf = certificate.info();

        if at.timestamp() < leaf.not_before.timestamp() {
            return Err(SignatureError::CertificateNotYetValid {
                subject: leaf.subject.clone(),
                not_before: leaf.not_before,
            });
        }
        if at.timestamp() > leaf.not_after.timestamp() {
            return Err(SignatureError::CertificateExpired {
                subject: leaf.subject.clone(),
                not_after: leaf.not_after,
            });
        }

        if !purpose.allows(leaf) {
            return Err(chain_failure(
                leaf,
                format!("extended key usage does not permit {purpose}"),
            ));
        }

        let chain = self.build_chain(certificate, at)?;
        debug!(
            subject = %leaf.subject,
            depth = chain.len(),
            "Built certificate chain for {}", purpose
        );

        let warnings = match (self.config.revocation_mode, &self.revocation) {
            (RevocationMode::Online, Some(source)) => {
                check_revocation(&chain, source.as_ref(), at).await?
            }
            (RevocationMode::Online, None) => chain
                .iter()
                .take(chain.len().saturating_sub(1))
                .map(|c| ChainWarning::RevocationUnavailable {
                    subject: c.subject.clone(),
                    reason: "no revocation source configured".to_string(),
                })
                .collect(),
            (RevocationMode::NoCheck, _) => Vec::new(),
        };

        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(ChainValidationResult {
            chain,
            warnings,
            validated_at: at,
        })
    }

    fn build_chain(
        &self,
        certificate: &SigningCertificate,
        at: DateTime<Utc>,
    ) -> Result<Vec<CertificateInfo>, SignatureError> {
        let leaf = certificate.info();

        if self.trust_store.contains(leaf) {
            return Ok(vec![leaf.clone()]);
        }

        let intermediates: Vec<CertificateInfo> = certificate
            .additional_certificates()
            .iter()
            .filter_map(|der| match CertificateInfo::from_der(der) {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!("Ignoring unreadable chain certificate: {}", e);
                    None
                }
            })
            .collect();

        let mut chain = vec![leaf.clone()];
        while chain.len() <= self.config.max_depth {
            let current = &chain[chain.len() - 1];

            let issuer = intermediates
                .iter()
                .chain(self.trust_store.anchors())
                .filter(|candidate| !chain.contains(candidate))
                .find(|candidate| current.is_issued_by(candidate))
                .cloned();

            let Some(issuer) = issuer else {
                return Err(chain_failure(
                    leaf,
                    format!(
                        "no trusted issuer found for '{}'; the chain ends in an untrusted root",
                        current.subject
                    ),
                ));
            };

            if !issuer.is_valid_at(at) {
                return Err(chain_failure(
                    leaf,
                    format!(
                        "issuer '{}' is outside its validity period ({} to {})",
                        issuer.subject, issuer.not_before, issuer.not_after
                    ),
                ));
            }

            let is_anchor = self.trust_store.contains(&issuer);
            if !is_anchor && !issuer.is_ca {
                return Err(chain_failure(
                    leaf,
                    format!("intermediate '{}' is not a certificate authority", issuer.subject),
                ));
            }

            chain.push(issuer);
            if is_anchor {
                return Ok(chain);
            }
        }

        Err(chain_failure(
            leaf,
            format!("chain exceeds the maximum depth of {}", self.config.max_depth),
        ))
    }
}

impl fmt::Debug for ChainValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainValidator")
            .field("anchors", &self.trust_store.len())
            .field("revocation_source", &self.revocation.is_some())
            .field("config", &self.config)
            .finish()
    }
}

async fn check_revocation(
    chain: &[CertificateInfo],
    source: &dyn RevocationSource,
    at: DateTime<Utc>,
) -> Result<Vec<ChainWarning>, SignatureError> {
    let mut warnings = Vec::new();

    for pair in chain.windows(2) {
        let (certificate, issuer) = (&pair[0], &pair[1]);

        let crl = match source.fetch_crl(issuer).await {
            Ok(Some(crl)) => crl,
            Ok(None) => {
                warnings.push(ChainWarning::RevocationUnavailable {
                    subject: certificate.subject.clone(),
                    reason: format!("no CRL published by '{}'", issuer.subject),
                });
                continue;
            }
            Err(e) => {
                warnings.push(ChainWarning::RevocationUnavailable {
                    subject: certificate.subject.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match check_crl(certificate, issuer, &crl, at) {
            Ok(RevocationStatus::Good) => {}
            Ok(RevocationStatus::Stale) => warnings.push(ChainWarning::RevocationStale {
                subject: certificate.subject.clone(),
            }),
            Ok(RevocationStatus::Revoked { revoked_at }) => {
                return Err(chain_failure(
                    certificate,
                    format!("certificate was revoked at {revoked_at}"),
                ));
            }
            Err(e) => warnings.push(ChainWarning::RevocationUnavailable {
                subject: certificate.subject.clone(),
                reason: e.to_string(),
            }),
        }
    }

    Ok(warnings)
}

fn chain_failure(certificate: &CertificateInfo, reason: String) -> SignatureError {
    SignatureError::ChainValidationFailed {
        subject: certificate.subject.clone(),
        reason,
    }
}
