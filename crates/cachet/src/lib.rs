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

//! # Cachet
//!
//! Package signing, repository countersigning and client trust policy.
//!
//! A producer signs a package archive with an X.509 certificate. A repository
//! may then countersign the author's signature, or sign an unsigned package
//! itself. Consumers verify the result against a trust store and a layered
//! client policy that decides whether unsigned content is still acceptable.
//!
//! ## Key Features
//!
//! - Author and repository signatures with a single optional repository
//!   countersignature
//! - Certificate chain building with validity, extended key usage and CRL
//!   revocation checks
//! - Optional trusted timestamps that keep signatures valid after the signing
//!   certificate expires
//! - Atomic output: failures and cancellation never leave partial files
//! - `Accept`/`Require` client policy resolved across TOML settings scopes
//!
//! ## Example
//!
//! ```rust,no_run
//! use cachet::certificates::{ChainValidator, SigningCertificate, TrustStore};
//! use cachet::security::{PackageSigner, SignPackageRequest, SigningOptions};
//!
//! # async fn run(cert_pem: &str, key_pem: &str, root_der: &[u8]) -> Result<(), cachet::SignatureError> {
//! let certificate = SigningCertificate::from_pem(cert_pem, Some(key_pem))?;
//! let trust = TrustStore::new().with_root_der(root_der)?;
//! let signer = PackageSigner::new(ChainValidator::new(trust));
//!
//! let request = SignPackageRequest::author(certificate, "SHA256", "SHA256")?;
//! let options = SigningOptions::new("widget.pkg", "widget.signed.pkg");
//! let outcome = signer.sign(&options, &request).await?;
//! println!("signed: {}", outcome.state);
//! # Ok(())
//! # }
//! ```

pub mod certificates;
pub mod crypto;
pub mod error;
pub mod packaging;
pub mod policy;
pub mod security;

pub use error::{DiagnosticCode, SignatureError};
