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

//! Cryptographic utilities for package signing.
//!
//! This module provides:
//! - Hash algorithm validation against the signing profile
//! - Ed25519 and ECDSA P-256 signing and verification
//! - Certificate fingerprint computation

mod hash_algorithm;
mod signing;

pub use hash_algorithm::{
    validate_hash_algorithm, validate_hash_algorithm_for, AlgorithmRole, HashAlgorithmName,
    SigningProfile,
};
pub use signing::{
    compute_certificate_fingerprint, verify_signature, PrivateKeyHandle, SignatureAlgorithm,
    SigningError,
};
