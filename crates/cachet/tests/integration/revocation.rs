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

//! Chain validation with certificate revocation lists.

use crate::fixtures::{crl, leaf, LeafOptions, Pki};
use cachet::certificates::{
    CertificatePurpose, ChainValidator, ChainWarning, RevocationMode, StaticRevocationSource,
};
use cachet::DiagnosticCode;
use std::sync::Arc;
use tracing_test::traced_test;

fn validator_with(pki: &Pki, source: StaticRevocationSource) -> ChainValidator {
    pki.validator().with_revocation_source(Arc::new(source))
}

/// Test that a revoked leaf fails chain validation.
#[tokio::test]
async fn test_revoked_leaf_rejected() {
    let pki = Pki::new("Widget Author");
    let revoked = leaf(LeafOptions::code_signing("Revoked Author").serial(0x66), &pki.intermediate);
    let source = StaticRevocationSource::new()
        .with_crl(crl(&pki.intermediate, &[0x66], 2089))
        .unwrap()
        .with_crl(crl(&pki.root, &[], 2089))
        .unwrap();

    let err = validator_with(&pki, source)
        .validate(
            &revoked.signing_certificate(&[&pki.intermediate]),
            CertificatePurpose::AuthorSigning,
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), DiagnosticCode::ChainValidationFailed);
    assert!(err.to_string().contains("revoked"));
}

/// Test that a revoked intermediate fails every leaf below it.
#[tokio::test]
async fn test_revoked_intermediate_rejected() {
    let pki = Pki::new("Widget Author");
    let source = StaticRevocationSource::new()
        .with_crl(crl(&pki.intermediate, &[], 2089))
        .unwrap()
        .with_crl(crl(&pki.root, &[2], 2089))
        .unwrap();

    let err = validator_with(&pki, source)
        .validate(&pki.signing_certificate(), CertificatePurpose::AuthorSigning)
        .await
        .unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::ChainValidationFailed);
}

/// Test that clean CRLs produce a warning-free result.
#[tokio::test]
async fn test_clean_crls_pass() {
    let pki = Pki::new("Widget Author");
    let source = StaticRevocationSource::new()
        .with_crl(crl(&pki.intermediate, &[0x77], 2089))
        .unwrap()
        .with_crl(crl(&pki.root, &[], 2089))
        .unwrap();

    let validator = validator_with(&pki, source);
    assert_eq!(validator.config().revocation_mode, RevocationMode::Online);

    let result = validator
        .validate(&pki.signing_certificate(), CertificatePurpose::AuthorSigning)
        .await
        .unwrap();
    assert_eq!(result.chain.len(), 3);
    assert!(result.warnings.is_empty());
}

/// Test that unavailable revocation data warns instead of failing.
#[tokio::test]
#[traced_test]
async fn test_missing_crl_warns() {
    let pki = Pki::new("Widget Author");
    let source = StaticRevocationSource::new()
        .with_crl(crl(&pki.root, &[], 2089))
        .unwrap();

    let result = validator_with(&pki, source)
        .validate(&pki.signing_certificate(), CertificatePurpose::AuthorSigning)
        .await
        .unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert!(matches!(
        &result.warnings[0],
        ChainWarning::RevocationUnavailable { subject, .. } if subject.contains("Widget Author")
    ));
    assert!(logs_contain("revocation status"));
}

/// Test that a CRL past its next update is reported as stale.
#[tokio::test]
async fn test_stale_crl_warns() {
    let pki = Pki::new("Widget Author");
    let source = StaticRevocationSource::new()
        .with_crl(crl(&pki.intermediate, &[], 2021))
        .unwrap()
        .with_crl(crl(&pki.root, &[], 2089))
        .unwrap();

    let result = validator_with(&pki, source)
        .validate(&pki.signing_certificate(), CertificatePurpose::AuthorSigning)
        .await
        .unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert!(matches!(
        result.warnings[0],
        ChainWarning::RevocationStale { .. }
    ));
}

/// Test that a CRL signed by the wrong key is treated as unavailable.
#[tokio::test]
async fn test_forged_crl_is_not_trusted() {
    let pki = Pki::new("Widget Author");
    let impostor = Pki::new("Widget Author");
    let source = StaticRevocationSource::new()
        .with_crl(crl(&impostor.intermediate, &[], 2089))
        .unwrap()
        .with_crl(crl(&pki.root, &[], 2089))
        .unwrap();

    let result = validator_with(&pki, source)
        .validate(&pki.signing_certificate(), CertificatePurpose::AuthorSigning)
        .await
        .unwrap();
    assert!(matches!(
        result.warnings[..],
        [ChainWarning::RevocationUnavailable { .. }]
    ));
}
