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

//! X.509 certificates, trust anchors and chain validation.

mod chain;
mod info;
mod revocation;
mod signing_certificate;
mod trust_store;

pub use chain::{
    CertificatePurpose, ChainValidationResult, ChainValidator, ChainValidatorConfig, ChainWarning,
};
pub use info::{CertificateInfo, ExtendedKeyUsageFlags};
pub use revocation::{
    check_crl, RevocationError, RevocationMode, RevocationSource, RevocationStatus,
    StaticRevocationSource,
};
pub use signing_certificate::{KeyHandleGuard, SigningCertificate};
pub use trust_store::TrustStore;
