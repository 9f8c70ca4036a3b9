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

//! Package signing, signature removal and verification.
//!
//! This module provides:
//! - [`SignPackageRequest`] for author and repository signatures
//! - The signature placement rules ([`plan_signature`], [`plan_removal`])
//! - [`PackageSigner`] for adding and removing signatures
//! - [`PackageVerifier`] for applying the client policy to signed content
//! - Timestamp authorities and security audit logging

pub mod audit;
mod package_signer;
mod placement;
mod request;
mod timestamp;
mod verification;

pub use package_signer::{PackageSigner, RemovalOutcome, SignOutcome, SigningOptions};
pub use placement::{
    plan_removal, plan_signature, PackageSignatureState, RemovalAction, RemovalPlan,
    SignatureRequestKind,
};
pub use request::{SignPackageRequest, SignaturePlacement};
#[cfg(feature = "http-timestamper")]
pub use timestamp::HttpTimestamper;
pub use timestamp::{
    LocalTimestampAuthority, TimestampError, TimestampInfo, TimestampRequest, TimestampToken,
    Timestamper,
};
pub use verification::{
    PackageVerifier, SignatureRole, VerificationOutcome, VerificationWarning, VerifiedSignature,
    VerifierSettings,
};
