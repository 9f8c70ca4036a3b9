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

//! Signing and verification errors with stable diagnostic codes.
//!
//! Every [`SignatureError`] maps to exactly one [`DiagnosticCode`]. Codes are
//! machine-checkable and stable across releases; messages are for humans.

use crate::crypto::AlgorithmRole;
use crate::packaging::ArchiveError;
use crate::security::TimestampError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable diagnostic codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    CertificateExpired,
    CertificateNotYetValid,
    ChainValidationFailed,
    RepositoryPrimaryMustNotCountersign,
    CountersignatureAlreadyExists,
    PackageNotFound,
    UnsupportedAlgorithm,
    PackageAlreadySigned,
    PackageNotSigned,
    DestinationAlreadyExists,
    InvalidServiceIndex,
    MissingPrivateKey,
    InvalidCertificate,
    TimestampFailed,
    InvalidPackage,
    IntegrityCheckFailed,
    IoError,
}

impl DiagnosticCode {
    /// The code's canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CertificateExpired => "CertificateExpired",
            Self::CertificateNotYetValid => "CertificateNotYetValid",
            Self::ChainValidationFailed => "ChainValidationFailed",
            Self::RepositoryPrimaryMustNotCountersign => "RepositoryPrimaryMustNotCountersign",
            Self::CountersignatureAlreadyExists => "CountersignatureAlreadyExists",
            Self::PackageNotFound => "PackageNotFound",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            Self::PackageAlreadySigned => "PackageAlreadySigned",
            Self::PackageNotSigned => "PackageNotSigned",
            Self::DestinationAlreadyExists => "DestinationAlreadyExists",
            Self::InvalidServiceIndex => "InvalidServiceIndex",
            Self::MissingPrivateKey => "MissingPrivateKey",
            Self::InvalidCertificate => "InvalidCertificate",
            Self::TimestampFailed => "TimestampFailed",
            Self::InvalidPackage => "InvalidPackage",
            Self::IntegrityCheckFailed => "IntegrityCheckFailed",
            Self::IoError => "IoError",
        }
    }

    /// Whether the code reports a trust judgment rather than an integrity,
    /// input or I/O problem.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Self::CertificateExpired | Self::CertificateNotYetValid | Self::ChainValidationFailed
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by signing, removal and verification.
///
/// Nothing here is fatal to the process; callers decide whether a code is
/// retried, reported or turned into an exit status.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("The {role} hash algorithm '{name}' is not supported. Supported algorithms: {supported}")]
    UnsupportedAlgorithm {
        name: String,
        role: AlgorithmRole,
        supported: String,
    },

    #[error("The repository service index URL '{url}' is invalid: {reason}")]
    InvalidServiceIndex { url: String, reason: String },

    #[error("The signing certificate is not yet valid (subject: {subject}, not before: {not_before})")]
    CertificateNotYetValid {
        subject: String,
        not_before: DateTime<Utc>,
    },

    #[error("The signing certificate has expired (subject: {subject}, not after: {not_after})")]
    CertificateExpired {
        subject: String,
        not_after: DateTime<Utc>,
    },

    #[error("Certificate chain validation failed for '{subject}': {reason}")]
    ChainValidationFailed { subject: String, reason: String },

    #[error("A repository primary signature must not have a repository countersignature.")]
    RepositoryPrimaryMustNotCountersign,

    #[error("The package already contains a repository countersignature.")]
    CountersignatureAlreadyExists,

    #[error("The package already contains a primary signature.")]
    PackageAlreadySigned,

    #[error("The package is not signed.")]
    PackageNotSigned,

    #[error("The destination file '{}' already exists.", .path.display())]
    DestinationAlreadyExists { path: PathBuf },

    #[error("Package not found: {}", .path.display())]
    PackageNotFound { path: PathBuf },

    #[error("The signing certificate has no associated private key.")]
    MissingPrivateKey,

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Timestamping failed: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("Invalid package: {0}")]
    InvalidPackage(#[from] ArchiveError),

    #[error("Package integrity check failed: {0}")]
    IntegrityCheckFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignatureError {
    /// The stable diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::UnsupportedAlgorithm { .. } => DiagnosticCode::UnsupportedAlgorithm,
            Self::InvalidServiceIndex { .. } => DiagnosticCode::InvalidServiceIndex,
            Self::CertificateNotYetValid { .. } => DiagnosticCode::CertificateNotYetValid,
            Self::CertificateExpired { .. } => DiagnosticCode::CertificateExpired,
            Self::ChainValidationFailed { .. } => DiagnosticCode::ChainValidationFailed,
            Self::RepositoryPrimaryMustNotCountersign => {
                DiagnosticCode::RepositoryPrimaryMustNotCountersign
            }
            Self::CountersignatureAlreadyExists => DiagnosticCode::CountersignatureAlreadyExists,
            Self::PackageAlreadySigned => DiagnosticCode::PackageAlreadySigned,
            Self::PackageNotSigned => DiagnosticCode::PackageNotSigned,
            Self::DestinationAlreadyExists { .. } => DiagnosticCode::DestinationAlreadyExists,
            Self::PackageNotFound { .. } => DiagnosticCode::PackageNotFound,
            Self::MissingPrivateKey => DiagnosticCode::MissingPrivateKey,
            Self::InvalidCertificate(_) => DiagnosticCode::InvalidCertificate,
            Self::Timestamp(_) => DiagnosticCode::TimestampFailed,
            Self::InvalidPackage(_) => DiagnosticCode::InvalidPackage,
            Self::IntegrityCheckFailed(_) => DiagnosticCode::IntegrityCheckFailed,
            Self::Io(_) => DiagnosticCode::IoError,
        }
    }

    /// Whether the caller may reasonably retry the same operation.
    ///
    /// Only I/O and timestamp service failures qualify; the core itself never
    /// retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timestamp(_))
    }
}
