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

//! Package archives.
//!
//! A package is a gzip-compressed tar file. The entry named
//! [`SIGNATURE_ENTRY`] is reserved for the embedded signature document and is
//! excluded from the content hash; every other regular file is payload.

use super::reader::SignedPackageReader;
use super::signature::PrimarySignature;
use crate::crypto::HashAlgorithmName;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tar::{Archive, Builder, EntryType, Header};
use thiserror::Error;

/// Reserved archive entry holding the signature document.
pub const SIGNATURE_ENTRY: &str = ".signature.json";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read or write package archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed package archive: {0}")]
    Malformed(String),

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("The entry name '{0}' is reserved")]
    ReservedEntry(String),

    #[error("Invalid signature document: {0}")]
    InvalidSignatureDocument(#[from] serde_json::Error),
}

/// An in-memory package: payload entries plus an optional signature.
#[derive(Debug, Clone, Default)]
pub struct PackageArchive {
    entries: BTreeMap<String, Vec<u8>>,
    signature: Option<PrimarySignature>,
}

impl PackageArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a payload file.
    pub fn add_entry(
        &mut self,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<(), ArchiveError> {
        let path = normalize_entry_path(&path.into())?;
        if path == SIGNATURE_ENTRY {
            return Err(ArchiveError::ReservedEntry(path));
        }
        if self.entries.contains_key(&path) {
            return Err(ArchiveError::DuplicateEntry(path));
        }
        self.entries.insert(path, data.into());
        Ok(())
    }

    /// Reads a package from disk.
    pub fn read(path: &Path) -> Result<Self, ArchiveError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a package from its tar.gz bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let mut package = Self::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            match entry.header().entry_type() {
                EntryType::Regular => {}
                EntryType::Directory => continue,
                other => {
                    return Err(ArchiveError::Malformed(format!(
                        "unsupported entry type {:?}",
                        other
                    )))
                }
            }

            let path = normalize_entry_path(&entry.path()?.to_string_lossy())?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            if path == SIGNATURE_ENTRY {
                if package.signature.is_some() {
                    return Err(ArchiveError::DuplicateEntry(path));
                }
                package.signature = Some(serde_json::from_slice(&data)?);
            } else if package.entries.insert(path.clone(), data).is_some() {
                return Err(ArchiveError::DuplicateEntry(path));
            }
        }

        Ok(package)
    }

    /// Serializes to tar.gz. Output is deterministic for equal contents.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        for (path, data) in &self.entries {
            append_file(&mut builder, path, data)?;
        }
        if let Some(signature) = &self.signature {
            let document = serde_json::to_vec_pretty(signature)?;
            append_file(&mut builder, SIGNATURE_ENTRY, &document)?;
        }

        let encoder = builder.into_inner()?;
        Ok(encoder.finish()?)
    }

    /// Writes the package to `path`, replacing any existing file.
    ///
    /// Signing goes through the atomic commit in the signer instead.
    pub fn write(&self, path: &Path) -> Result<(), ArchiveError> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Payload entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d.as_slice()))
    }

    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Digest over every payload entry, excluding the signature.
    ///
    /// Each entry contributes its path and contents, both length-prefixed, in
    /// path order.
    pub fn content_hash(&self, algorithm: HashAlgorithmName) -> String {
        let mut buffer = Vec::new();
        for (path, data) in &self.entries {
            buffer.extend_from_slice(&(path.len() as u64).to_be_bytes());
            buffer.extend_from_slice(path.as_bytes());
            buffer.extend_from_slice(&(data.len() as u64).to_be_bytes());
            buffer.extend_from_slice(data);
        }
        algorithm.hex_digest(&buffer)
    }

    pub fn signature(&self) -> Option<&PrimarySignature> {
        self.signature.as_ref()
    }

    pub fn set_signature(&mut self, signature: PrimarySignature) {
        self.signature = Some(signature);
    }

    pub fn take_signature(&mut self) -> Option<PrimarySignature> {
        self.signature.take()
    }
}

impl SignedPackageReader for PackageArchive {
    fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    fn primary_signature(&self) -> Option<&PrimarySignature> {
        self.signature.as_ref()
    }
}

fn append_file<W: std::io::Write>(
    builder: &mut Builder<W>,
    path: &str,
    data: &[u8],
) -> Result<(), ArchiveError> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

fn normalize_entry_path(path: &str) -> Result<String, ArchiveError> {
    let normalized = path.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    if normalized.is_empty()
        || normalized.starts_with('/')
        || normalized.split('/').any(|segment| segment == "..")
    {
        return Err(ArchiveError::Malformed(format!("invalid entry path '{path}'")));
    }
    Ok(normalized.to_string())
}
