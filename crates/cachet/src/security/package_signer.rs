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

//! Package signing and signature removal.
//!
//! [`PackageSigner::sign`] runs its checks in a fixed order: the destination
//! overwrite check, algorithm validation, chain validation, then the
//! signature placement check against the package's current state. Only after
//! all of them pass is the private key used, and the result is committed
//! atomically so a failed or cancelled operation never leaves a partial
//! destination file.

use super::audit;
use super::placement::{
    plan_removal, plan_signature, PackageSignatureState, RemovalAction, SignatureRequestKind,
};
use super::request::SignPackageRequest;
use super::timestamp::{TimestampError, TimestampRequest, TimestampToken, Timestamper};
use crate::certificates::{CertificatePurpose, ChainValidator, ChainWarning, SigningCertificate};
use crate::crypto::{validate_hash_algorithm, AlgorithmRole, HashAlgorithmName};
use crate::error::SignatureError;
use crate::packaging::{
    encode_base64, signature_state, ArchiveError, PackageArchive, PrimarySignature,
    SignedAttributes, SignedPackageReader, SignerInfo,
};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Input and output locations for one operation.
#[derive(Debug, Clone)]
pub struct SigningOptions {
    pub input_path: PathBuf,
    /// Defaults to the input path.
    pub output_path: Option<PathBuf>,
    /// Whether an existing destination may be replaced.
    pub overwrite: bool,
}

impl SigningOptions {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: Some(output_path.into()),
            overwrite: false,
        }
    }

    /// Rewrites the input package. Requires `overwrite`, since the
    /// destination always exists.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: path.into(),
            output_path: None,
            overwrite: true,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn destination(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.input_path)
    }
}

/// Result of a successful signing operation.
#[derive(Debug, Clone)]
pub struct SignOutcome {
    pub destination: PathBuf,
    pub state: PackageSignatureState,
    /// Hex digest the new signature covers.
    pub signed_digest: String,
    pub signer_fingerprint: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub warnings: Vec<ChainWarning>,
}

/// Result of a successful removal.
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub destination: PathBuf,
    pub removed: RemovalAction,
    pub state: PackageSignatureState,
}

/// Signs packages and strips signatures.
#[derive(Clone)]
pub struct PackageSigner {
    validator: ChainValidator,
    timestamper: Option<Arc<dyn Timestamper>>,
}

impl PackageSigner {
    pub fn new(validator: ChainValidator) -> Self {
        Self {
            validator,
            timestamper: None,
        }
    }

    /// Timestamps every new signature with `timestamper`.
    pub fn with_timestamper(mut self, timestamper: Arc<dyn Timestamper>) -> Self {
        self.timestamper = Some(timestamper);
        self
    }

    pub fn validator(&self) -> &ChainValidator {
        &self.validator
    }

    /// Adds the signature described by `request`.
    pub async fn sign(
        &self,
        options: &SigningOptions,
        request: &SignPackageRequest,
    ) -> Result<SignOutcome, SignatureError> {
        let destination = options.destination().display().to_string();
        match self.sign_package(options, request).await {
            Ok(outcome) => {
                audit::log_package_signed(
                    &destination,
                    &outcome.signed_digest,
                    &outcome.signer_fingerprint,
                    &request.kind().to_string(),
                    outcome.timestamp.is_some(),
                );
                Ok(outcome)
            }
            Err(e) => {
                audit::log_package_sign_failed(&destination, e.code(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Removes the outermost signature: the countersignature when present,
    /// otherwise the primary.
    pub async fn remove_signature(
        &self,
        options: &SigningOptions,
    ) -> Result<RemovalOutcome, SignatureError> {
        let destination = options.destination().to_path_buf();
        ensure_destination_available(&destination, options.overwrite).await?;

        let mut package = read_package(&options.input_path).await?;
        let plan = plan_removal(signature_state(&package)?)?;

        match plan.action {
            RemovalAction::RemoveCountersignature => {
                let mut primary = package
                    .take_signature()
                    .ok_or(SignatureError::PackageNotSigned)?;
                primary.countersignature = None;
                package.set_signature(primary);
            }
            RemovalAction::RemovePrimary => {
                package.take_signature();
            }
        }

        commit(destination.clone(), package.to_bytes()?, options.overwrite).await?;

        let removed = match plan.action {
            RemovalAction::RemoveCountersignature => "repository countersignature",
            RemovalAction::RemovePrimary => "primary signature",
        };
        audit::log_signature_removed(&destination.display().to_string(), removed);

        Ok(RemovalOutcome {
            destination,
            removed: plan.action,
            state: plan.resulting_state,
        })
    }

    async fn sign_package(
        &self,
        options: &SigningOptions,
        request: &SignPackageRequest,
    ) -> Result<SignOutcome, SignatureError> {
        let destination = options.destination().to_path_buf();
        ensure_destination_available(&destination, options.overwrite).await?;

        validate_hash_algorithm(
            request.signature_hash_algorithm().as_str(),
            AlgorithmRole::Signature,
        )?;
        validate_hash_algorithm(
            request.timestamp_hash_algorithm().as_str(),
            AlgorithmRole::Timestamp,
        )?;

        let certificate = request.certificate();
        if !certificate.has_private_key() {
            return Err(SignatureError::MissingPrivateKey);
        }

        let chain = self.validator.validate(certificate, request.purpose()).await?;

        let mut package = read_package(&options.input_path).await?;
        let state = signature_state(&package)?;
        let new_state = plan_signature(state, request.kind())?;
        tracing::debug!("Signing {} package: {} -> {}", request.kind(), state, new_state);

        let signed_digest = match request.kind() {
            SignatureRequestKind::AuthorPrimary | SignatureRequestKind::RepositoryPrimary => {
                package.content_hash(request.signature_hash_algorithm())
            }
            SignatureRequestKind::RepositoryCountersignature => {
                let primary = package
                    .primary_signature()
                    .ok_or(SignatureError::PackageNotSigned)?;
                request
                    .signature_hash_algorithm()
                    .hex_digest(&primary.signer.signature_bytes()?)
            }
        };

        let (signer, timestamp) = self.create_signer_info(request, &signed_digest).await?;

        match request.kind() {
            SignatureRequestKind::RepositoryCountersignature => {
                let mut primary = package
                    .take_signature()
                    .ok_or(SignatureError::PackageNotSigned)?;
                primary.countersignature = Some(signer);
                package.set_signature(primary);
            }
            _ => package.set_signature(PrimarySignature::new(request.signature_type(), signer)),
        }

        commit(destination.clone(), package.to_bytes()?, options.overwrite).await?;

        Ok(SignOutcome {
            destination,
            state: new_state,
            signed_digest,
            signer_fingerprint: certificate.fingerprint().to_string(),
            timestamp,
            warnings: chain.warnings,
        })
    }

    async fn create_signer_info(
        &self,
        request: &SignPackageRequest,
        signed_digest: &str,
    ) -> Result<(SignerInfo, Option<DateTime<Utc>>), SignatureError> {
        let certificate = request.certificate();
        let hash_algorithm = request.signature_hash_algorithm();

        let attributes = SignedAttributes {
            signature_type: request.signature_type(),
            signed_digest: signed_digest.to_string(),
            signed_digest_algorithm: hash_algorithm,
            signing_time: Utc::now(),
            signer_fingerprint: certificate.fingerprint().to_string(),
            repository: request.repository_metadata().cloned(),
        };
        let attribute_bytes = serde_json::to_vec(&attributes).map_err(ArchiveError::from)?;

        let (signature_algorithm, signature) = {
            let key = certificate.acquire_private_key()?;
            (key.algorithm(), key.sign(&hash_algorithm.digest(&attribute_bytes)))
        };

        let (token, timestamp) = match &self.timestamper {
            Some(timestamper) => {
                let (token, time) = self
                    .timestamp_signature(
                        timestamper.as_ref(),
                        certificate,
                        &signature,
                        request.timestamp_hash_algorithm(),
                    )
                    .await?;
                (Some(token), Some(time))
            }
            None => (None, None),
        };

        let signer = SignerInfo {
            certificate: encode_base64(certificate.certificate_der()),
            chain: certificate
                .additional_certificates()
                .iter()
                .map(|c| encode_base64(c))
                .collect(),
            signature_algorithm,
            hash_algorithm,
            signed_attributes: encode_base64(&attribute_bytes),
            signature: encode_base64(&signature),
            timestamp: token,
        };
        Ok((signer, timestamp))
    }

    async fn timestamp_signature(
        &self,
        timestamper: &dyn Timestamper,
        certificate: &SigningCertificate,
        signature: &[u8],
        hash_algorithm: HashAlgorithmName,
    ) -> Result<(TimestampToken, DateTime<Utc>), SignatureError> {
        let request = TimestampRequest::new(signature, hash_algorithm);
        let token = timestamper.timestamp(&request).await?;
        let info = token.verify_for(signature, Some(&request))?;

        let authority = token.authority_certificate()?;
        self.validator
            .validate_at(&authority, CertificatePurpose::Timestamping, info.gen_time)
            .await
            .map_err(|e| TimestampError::UntrustedAuthority(e.to_string()))?;

        if !certificate.info().is_valid_at(info.gen_time) {
            return Err(TimestampError::OutsideCertificateValidity(info.gen_time).into());
        }

        Ok((token, info.gen_time))
    }
}

impl std::fmt::Debug for PackageSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageSigner")
            .field("validator", &self.validator)
            .field("timestamper", &self.timestamper.is_some())
            .finish()
    }
}

/// Reads a package, reporting a missing file as [`SignatureError::PackageNotFound`].
pub(crate) async fn read_package(path: &Path) -> Result<PackageArchive, SignatureError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SignatureError::PackageNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    Ok(PackageArchive::from_bytes(&bytes)?)
}

async fn ensure_destination_available(
    destination: &Path,
    overwrite: bool,
) -> Result<(), SignatureError> {
    if !overwrite && tokio::fs::try_exists(destination).await? {
        return Err(SignatureError::DestinationAlreadyExists {
            path: destination.to_path_buf(),
        });
    }
    Ok(())
}

/// Writes `bytes` next to `destination` and renames it into place.
///
/// Runs on the blocking pool and finishes even if the caller stops waiting.
async fn commit(
    destination: PathBuf,
    bytes: Vec<u8>,
    overwrite: bool,
) -> Result<(), SignatureError> {
    tokio::task::spawn_blocking(move || write_atomically(&destination, &bytes, overwrite))
        .await
        .map_err(|e| SignatureError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn write_atomically(
    destination: &Path,
    bytes: &[u8],
    overwrite: bool,
) -> Result<(), SignatureError> {
    let directory = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(directory)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    if overwrite {
        temp.persist(destination).map_err(|e| e.error)?;
    } else {
        temp.persist_noclobber(destination).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                SignatureError::DestinationAlreadyExists {
                    path: destination.to_path_buf(),
                }
            } else {
                SignatureError::Io(e.error)
            }
        })?;
    }
    tracing::debug!("Committed {} bytes to {}", bytes.len(), destination.display());
    Ok(())
}
