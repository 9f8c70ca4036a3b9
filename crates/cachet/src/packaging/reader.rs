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

//! Read-only access to a package's embedded signatures.

use super::archive::ArchiveError;
use super::signature::{PrimarySignature, SignatureType};
use crate::error::SignatureError;
use crate::security::PackageSignatureState;

/// What the signing core needs to know about an archive.
pub trait SignedPackageReader {
    fn is_signed(&self) -> bool;

    fn primary_signature(&self) -> Option<&PrimarySignature>;
}

/// Derives the signature state of a package.
///
/// A repository primary carrying a countersignature cannot be produced by
/// this crate and is reported as a malformed package.
pub fn signature_state<R>(reader: &R) -> Result<PackageSignatureState, SignatureError>
where
    R: SignedPackageReader + ?Sized,
{
    let Some(primary) = reader.primary_signature() else {
        return Ok(PackageSignatureState::Unsigned);
    };

    match (primary.signature_type, primary.has_repository_countersignature()) {
        (SignatureType::Author, false) => Ok(PackageSignatureState::AuthorSigned),
        (SignatureType::Author, true) => Ok(PackageSignatureState::RepositoryCountersigned),
        (SignatureType::Repository, false) => Ok(PackageSignatureState::RepositoryPrimarySigned),
        (SignatureType::Repository, true) => Err(SignatureError::InvalidPackage(
            ArchiveError::Malformed(
                "repository primary signature carries a countersignature".to_string(),
            ),
        )),
    }
}
