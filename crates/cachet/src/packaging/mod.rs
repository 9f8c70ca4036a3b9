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

//! Package archives and their embedded signature documents.

mod archive;
mod reader;
mod signature;

pub use archive::{ArchiveError, PackageArchive, SIGNATURE_ENTRY};
pub use reader::{signature_state, SignedPackageReader};
pub(crate) use signature::encode as encode_base64;
pub use signature::{
    PrimarySignature, RepositoryMetadata, SignatureType, SignedAttributes, SignerInfo,
    SIGNATURE_FORMAT_VERSION,
};
