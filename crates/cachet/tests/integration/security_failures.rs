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

//! Security failure integration tests.
//!
//! These tests verify that signing and verification correctly reject:
//! - Expired, not-yet-valid and untrusted certificates
//! - Tampered packages and signature documents
//! - Untrusted or misbehaving timestamp authorities
//! - Unsafe destinations
//!
//! and that a rejected operation never leaves output behind.

use crate::fixtures::{leaf, write_package, LeafOptions, Pki, Validity, EXPIRED, NOT_YET_VALID};
use async_trait::async_trait;
use cachet::packaging::{PackageArchive, SignedPackageReader};
use cachet::policy::ClientPolicy;
use cachet::security::{
    PackageSigner, PackageVerifier, SignPackageRequest, SigningOptions, TimestampError,
    TimestampRequest, TimestampToken, Timestamper, VerifierSettings,
};
use cachet::{DiagnosticCode, SignatureError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn only_entry(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

/// Test that an expired signing certificate fails and writes nothing.
#[tokio::test]
async fn test_expired_certificate_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let output = dir.path().join("widget.signed.pkg");
    let pki = Pki::new("Widget Author");
    let expired = leaf(
        LeafOptions::code_signing("Expired Author").validity(EXPIRED),
        &pki.intermediate,
    );

    let request = SignPackageRequest::author(
        expired.signing_certificate(&[&pki.intermediate]),
        "SHA256",
        "SHA256",
    )
    .unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::new(&input, &output), &request)
        .await
        .unwrap_err();

    match err {
        SignatureError::CertificateExpired { subject, .. } => {
            assert!(subject.contains("Expired Author"));
        }
        e => panic!("Expected CertificateExpired error, got {:?}", e),
    }
    assert!(!output.exists());
    assert_eq!(only_entry(dir.path()), vec!["widget.pkg".to_string()]);
}

/// Test that a certificate whose validity starts in the future is rejected.
#[tokio::test]
async fn test_not_yet_valid_certificate_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");
    let future = leaf(
        LeafOptions::code_signing("Future Author").validity(NOT_YET_VALID),
        &pki.intermediate,
    );

    let request = SignPackageRequest::author(
        future.signing_certificate(&[&pki.intermediate]),
        "SHA256",
        "SHA256",
    )
    .unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::CertificateNotYetValid);
    assert!(PackageArchive::read(&input).unwrap().primary_signature().is_none());
}

/// Test that a certificate from an unknown root is rejected.
#[tokio::test]
async fn test_untrusted_root_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");
    let stranger = Pki::new("Someone Else");

    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    let err = PackageSigner::new(stranger.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::ChainValidationFailed);
}

/// Test that a missing intermediate breaks the chain.
#[tokio::test]
async fn test_missing_intermediate_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let request =
        SignPackageRequest::author(pki.signer.signing_certificate(&[]), "SHA256", "SHA256")
            .unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::ChainValidationFailed);
}

/// Test that a timestamping certificate cannot sign packages.
#[tokio::test]
async fn test_wrong_extended_key_usage_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let request =
        SignPackageRequest::author(pki.tsa.signing_certificate(&[]), "SHA256", "SHA256").unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::ChainValidationFailed);
}

/// Test that the overwrite check happens before any certificate work.
#[tokio::test]
async fn test_existing_destination_checked_first() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let output = dir.path().join("existing.pkg");
    std::fs::write(&output, b"keep me").unwrap();
    let pki = Pki::new("Widget Author");
    let expired = leaf(
        LeafOptions::code_signing("Expired Author").validity(EXPIRED),
        &pki.intermediate,
    );

    let request = SignPackageRequest::author(
        expired.signing_certificate(&[&pki.intermediate]),
        "SHA256",
        "SHA256",
    )
    .unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::new(&input, &output), &request)
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::DestinationAlreadyExists);
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

    let err = PackageSigner::new(pki.validator())
        .sign(
            &SigningOptions::in_place(&input).with_overwrite(false),
            &request,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::DestinationAlreadyExists);
}

/// Test that a missing input package is reported as such.
#[tokio::test]
async fn test_missing_package() {
    let dir = TempDir::new().unwrap();
    let pki = Pki::new("Widget Author");
    let missing = dir.path().join("missing.pkg");

    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::new(&missing, dir.path().join("out.pkg")), &request)
        .await
        .unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::PackageNotFound);

    let err = PackageVerifier::new(pki.validator(), VerifierSettings::default())
        .verify(&missing)
        .await
        .unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::PackageNotFound);
}

/// Test that a certificate without its private key cannot sign.
#[tokio::test]
async fn test_public_only_certificate_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let request =
        SignPackageRequest::author(pki.signing_certificate().public_only(), "SHA256", "SHA256")
            .unwrap();
    let err = PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::MissingPrivateKey);
}

/// Test that unsupported hash algorithms are rejected when building requests.
#[test]
fn test_unsupported_algorithm_rejected() {
    let pki = Pki::new("Widget Author");
    for (signature, timestamp) in [("SHA1", "SHA256"), ("SHA256", "MD5")] {
        let err = SignPackageRequest::author(pki.signing_certificate(), signature, timestamp)
            .unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::UnsupportedAlgorithm);
    }
}

/// Test that tampered content is rejected even under the Accept policy.
#[tokio::test]
async fn test_tampered_package_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap();

    let mut package = PackageArchive::read(&input).unwrap();
    package
        .add_entry("lib/net8.0/Injected.dll", b"payload".to_vec())
        .unwrap();
    package.write(&input).unwrap();

    for policy in [ClientPolicy::Accept, ClientPolicy::Require] {
        let err = PackageVerifier::new(pki.validator(), VerifierSettings { policy })
            .verify(&input)
            .await
            .unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::IntegrityCheckFailed);
    }
}

/// Test that a forged signature value is rejected.
#[tokio::test]
async fn test_invalid_signature_value_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    PackageSigner::new(pki.validator())
        .sign(&SigningOptions::in_place(&input), &request)
        .await
        .unwrap();

    let mut package = PackageArchive::read(&input).unwrap();
    let mut primary = package.take_signature().unwrap();
    primary.signer.signature = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        [0xABu8; 64],
    );
    package.set_signature(primary);
    package.write(&input).unwrap();

    let err = PackageVerifier::new(pki.validator(), VerifierSettings::default())
        .verify(&input)
        .await
        .unwrap_err();
    match err {
        SignatureError::IntegrityCheckFailed(reason) => {
            assert!(reason.contains("signature value"));
        }
        e => panic!("Expected IntegrityCheckFailed error, got {:?}", e),
    }
}

/// Test that a timestamp from an untrusted authority fails signing.
#[tokio::test]
async fn test_untrusted_timestamp_authority_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let output = dir.path().join("widget.signed.pkg");
    let pki = Pki::new("Widget Author");
    let rogue = Pki::new("Rogue");

    let signer =
        PackageSigner::new(pki.validator()).with_timestamper(Arc::new(rogue.timestamp_authority()));
    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    let err = signer
        .sign(&SigningOptions::new(&input, &output), &request)
        .await
        .unwrap_err();

    match err {
        SignatureError::Timestamp(TimestampError::UntrustedAuthority(_)) => {}
        e => panic!("Expected UntrustedAuthority error, got {:?}", e),
    }
    assert!(!output.exists());
}

/// Test that a timestamp before the signer's validity window fails signing.
#[tokio::test]
async fn test_timestamp_outside_signer_validity_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");
    let late_signer = leaf(
        LeafOptions::code_signing("Late Author").validity(Validity { from: 2010, to: 2090 }),
        &pki.intermediate,
    );
    let before_validity: DateTime<Utc> = "2005-06-01T00:00:00Z".parse().unwrap();

    let err = PackageSigner::new(pki.validator())
        .with_timestamper(Arc::new(
            pki.timestamp_authority().with_fixed_time(before_validity),
        ))
        .sign(
            &SigningOptions::in_place(&input),
            &SignPackageRequest::author(
                late_signer.signing_certificate(&[&pki.intermediate]),
                "SHA256",
                "SHA256",
            )
            .unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::TimestampFailed);
    match err {
        SignatureError::Timestamp(TimestampError::OutsideCertificateValidity(time)) => {
            assert_eq!(time, before_validity);
        }
        e => panic!("Expected OutsideCertificateValidity error, got {:?}", e),
    }
}

/// Replays a fixed token regardless of the request.
struct ReplayingTimestamper(TimestampToken);

#[async_trait]
impl Timestamper for ReplayingTimestamper {
    async fn timestamp(
        &self,
        _request: &TimestampRequest,
    ) -> Result<TimestampToken, TimestampError> {
        Ok(self.0.clone())
    }
}

/// Test that a replayed timestamp token is rejected.
#[tokio::test]
async fn test_replayed_timestamp_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let pki = Pki::new("Widget Author");

    let stale_request = TimestampRequest::new(
        b"some other signature",
        cachet::crypto::HashAlgorithmName::Sha256,
    );
    let token = pki
        .timestamp_authority()
        .timestamp(&stale_request)
        .await
        .unwrap();

    let err = PackageSigner::new(pki.validator())
        .with_timestamper(Arc::new(ReplayingTimestamper(token)))
        .sign(
            &SigningOptions::in_place(&input),
            &SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap(),
        )
        .await
        .unwrap_err();

    match err {
        SignatureError::Timestamp(TimestampError::ImprintMismatch) => {}
        e => panic!("Expected ImprintMismatch error, got {:?}", e),
    }
}

/// Never answers.
struct StalledTimestamper;

#[async_trait]
impl Timestamper for StalledTimestamper {
    async fn timestamp(
        &self,
        _request: &TimestampRequest,
    ) -> Result<TimestampToken, TimestampError> {
        std::future::pending().await
    }
}

/// Test that dropping an in-flight signing operation leaves no output.
#[tokio::test]
async fn test_cancelled_signing_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let input = write_package(dir.path(), "widget.pkg");
    let output = dir.path().join("widget.signed.pkg");
    let pki = Pki::new("Widget Author");

    let signer = PackageSigner::new(pki.validator()).with_timestamper(Arc::new(StalledTimestamper));
    let request =
        SignPackageRequest::author(pki.signing_certificate(), "SHA256", "SHA256").unwrap();
    let options = SigningOptions::new(&input, &output);

    let result =
        tokio::time::timeout(Duration::from_millis(200), signer.sign(&options, &request)).await;

    assert!(result.is_err(), "signing should still be waiting on the timestamp");
    assert!(!output.exists());
    assert_eq!(only_entry(dir.path()), vec!["widget.pkg".to_string()]);
}
