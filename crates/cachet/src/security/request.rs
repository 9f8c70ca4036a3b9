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

//! Signing requests.
//!
//! Requests are validated when constructed: hash algorithm names must be
//! supported and a repository's service index must be an absolute HTTP(S)
//! URL.

use super::placement::{PackageSignatureState, SignatureRequestKind};
use crate::certificates::{CertificatePurpose, SigningCertificate};
use crate::crypto::{validate_hash_algorithm, AlgorithmRole, HashAlgorithmName};
use crate::error::SignatureError;
use crate::packaging::{RepositoryMetadata, SignatureType};
use url::Url;

/// Where a repository signature goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePlacement {
    Primary,
    Countersignature,
}

impl SignaturePlacement {
    /// Countersign author-signed packages; otherwise sign as primary.
    pub fn for_state(state: PackageSignatureState) -> Self {
        match state {
            PackageSignatureState::AuthorSigned => Self::Countersignature,
            _ => Self::Primary,
        }
    }
}

/// A request to add one signature to a package.
#[derive(Debug, Clone)]
pub enum SignPackageRequest {
    Author {
        certificate: SigningCertificate,
        signature_hash_algorithm: HashAlgorithmName,
        timestamp_hash_algorithm: HashAlgorithmName,
    },
    Repository {
        certificate: SigningCertificate,
        signature_hash_algorithm: HashAlgorithmName,
        timestamp_hash_algorithm: HashAlgorithmName,
        placement: SignaturePlacement,
        repository: RepositoryMetadata,
    },
}

impl SignPackageRequest {
    /// An author signing request.
    pub fn author(
        certificate: SigningCertificate,
        signature_hash_algorithm: &str,
        timestamp_hash_algorithm: &str,
    ) -> Result<Self, SignatureError> {
        Ok(Self::Author {
            certificate,
            signature_hash_algorithm: validate_hash_algorithm(
                signature_hash_algorithm,
                AlgorithmRole::Signature,
            )?,
            timestamp_hash_algorithm: validate_hash_algorithm(
                timestamp_hash_algorithm,
                AlgorithmRole::Timestamp,
            )?,
        })
    }

    /// A repository signing request.
    ///
    /// Owners are trimmed; blanks and repeats are dropped, keeping the first
    /// occurrence.
    pub fn repository<I, S>(
        certificate: SigningCertificate,
        signature_hash_algorithm: &str,
        timestamp_hash_algorithm: &str,
        placement: SignaturePlacement,
        service_index: &str,
        owners: I,
    ) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let signature_hash_algorithm =
            validate_hash_algorithm(signature_hash_algorithm, AlgorithmRole::Signature)?;
        let timestamp_hash_algorithm =
            validate_hash_algorithm(timestamp_hash_algorithm, AlgorithmRole::Timestamp)?;

        Ok(Self::Repository {
            certificate,
            signature_hash_algorithm,
            timestamp_hash_algorithm,
            placement,
            repository: RepositoryMetadata {
                service_index: parse_service_index(service_index)?,
                owners: normalize_owners(owners),
            },
        })
    }

    pub fn kind(&self) -> SignatureRequestKind {
        match self {
            Self::Author { .. } => SignatureRequestKind::AuthorPrimary,
            Self::Repository {
                placement: SignaturePlacement::Primary,
                ..
            } => SignatureRequestKind::RepositoryPrimary,
            Self::Repository {
                placement: SignaturePlacement::Countersignature,
                ..
            } => SignatureRequestKind::RepositoryCountersignature,
        }
    }

    pub fn signature_type(&self) -> SignatureType {
        match self {
            Self::Author { .. } => SignatureType::Author,
            Self::Repository { .. } => SignatureType::Repository,
        }
    }

    pub fn purpose(&self) -> CertificatePurpose {
        match self.kind() {
            SignatureRequestKind::AuthorPrimary => CertificatePurpose::AuthorSigning,
            SignatureRequestKind::RepositoryPrimary => CertificatePurpose::RepositorySigning,
            SignatureRequestKind::RepositoryCountersignature => {
                CertificatePurpose::RepositoryCountersigning
            }
        }
    }

    pub fn certificate(&self) -> &SigningCertificate {
        match self {
            Self::Author { certificate, .. } | Self::Repository { certificate, .. } => certificate,
        }
    }

    pub fn signature_hash_algorithm(&self) -> HashAlgorithmName {
        match self {
            Self::Author {
                signature_hash_algorithm,
                ..
            }
            | Self::Repository {
                signature_hash_algorithm,
                ..
            } => *signature_hash_algorithm,
        }
    }

    pub fn timestamp_hash_algorithm(&self) -> HashAlgorithmName {
        match self {
            Self::Author {
                timestamp_hash_algorithm,
                ..
            }
            | Self::Repository {
                timestamp_hash_algorithm,
                ..
            } => *timestamp_hash_algorithm,
        }
    }

    pub fn repository_metadata(&self) -> Option<&RepositoryMetadata> {
        match self {
            Self::Author { .. } => None,
            Self::Repository { repository, .. } => Some(repository),
        }
    }
}

fn parse_service_index(value: &str) -> Result<Url, SignatureError> {
    let invalid = |reason: String| SignatureError::InvalidServiceIndex {
        url: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

fn normalize_owners<I, S>(owners: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for owner in owners {
        let owner = owner.as_ref().trim();
        if !owner.is_empty() && !normalized.iter().any(|o| o == owner) {
            normalized.push(owner.to_string());
        }
    }
    normalized
}
