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

//! Command implementations and the arguments they share.

use anyhow::{anyhow, Context};
use cachet::certificates::{ChainValidator, StaticRevocationSource, TrustStore};
use cachet::policy::PolicyError;
use cachet::security::SigningOptions;
use cachet::SignatureError;
use clap::Args;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod policy;
pub mod remove;
pub mod sign;
pub mod verify;

pub type CommandResult = Result<(), CommandError>;

/// Failure of a command, split by exit status.
#[derive(Debug)]
pub enum CommandError {
    /// Signing, removal or verification failed with a diagnostic code.
    Failed(SignatureError),
    /// Bad arguments, unreadable inputs or broken settings.
    Config(anyhow::Error),
}

impl CommandError {
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Failed(_) => 1,
            Self::Config(_) => 2,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "error[{}]: {}", e.code(), e),
            Self::Config(e) => write!(f, "error: {:#}", e),
        }
    }
}

impl From<SignatureError> for CommandError {
    fn from(e: SignatureError) -> Self {
        Self::Failed(e)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        Self::Config(e)
    }
}

impl From<PolicyError> for CommandError {
    fn from(e: PolicyError) -> Self {
        Self::Config(e.into())
    }
}

/// Trusted roots and revocation data.
#[derive(Args, Debug, Clone, Default)]
pub struct TrustArgs {
    /// PEM file of trusted root certificates (repeatable)
    #[arg(long = "trust-root", value_name = "PEM")]
    pub trust_roots: Vec<PathBuf>,

    /// Also trust the platform's root certificates
    #[arg(long)]
    pub system_roots: bool,

    /// CRL file in DER or PEM form; enables revocation checking (repeatable)
    #[arg(long = "crl", value_name = "FILE")]
    pub crls: Vec<PathBuf>,
}

impl TrustArgs {
    pub fn trust_store(&self) -> anyhow::Result<TrustStore> {
        let mut store = self.base_store()?;
        for path in &self.trust_roots {
            let bundle = read_text(path)?;
            let added = store
                .add_pem_bundle(&bundle)
                .with_context(|| format!("Invalid trust root file {}", path.display()))?;
            if added == 0 {
                return Err(anyhow!("No certificates found in {}", path.display()));
            }
        }

        if store.is_empty() {
            return Err(anyhow!(
                "No trusted roots configured. Pass --trust-root or --system-roots"
            ));
        }
        tracing::debug!("Loaded {} trusted roots", store.len());
        Ok(store)
    }

    /// Chain validator over the configured roots. Revocation is checked only
    /// when CRLs were supplied.
    pub fn validator(&self) -> anyhow::Result<ChainValidator> {
        let validator = ChainValidator::new(self.trust_store()?);
        if self.crls.is_empty() {
            return Ok(validator);
        }

        let mut source = StaticRevocationSource::new();
        for path in &self.crls {
            for der in read_crls(path)? {
                source
                    .add_crl(der)
                    .with_context(|| format!("Invalid CRL file {}", path.display()))?;
            }
        }
        Ok(validator.with_revocation_source(Arc::new(source)))
    }

    #[cfg(feature = "system-roots")]
    fn base_store(&self) -> anyhow::Result<TrustStore> {
        Ok(if self.system_roots {
            TrustStore::from_system()
        } else {
            TrustStore::new()
        })
    }

    #[cfg(not(feature = "system-roots"))]
    fn base_store(&self) -> anyhow::Result<TrustStore> {
        if self.system_roots {
            return Err(anyhow!(
                "--system-roots is unavailable: cachetctl was built without the system-roots feature"
            ));
        }
        Ok(TrustStore::new())
    }
}

/// Where the rewritten package goes.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the result here instead of rewriting the input package
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Replace an existing destination, including the input itself
    #[arg(long)]
    pub overwrite: bool,
}

impl OutputArgs {
    pub fn signing_options(&self, package: &Path) -> SigningOptions {
        match &self.output {
            Some(output) => SigningOptions::new(package, output),
            None => SigningOptions::in_place(package),
        }
        .with_overwrite(self.overwrite)
    }
}

pub fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_crls(path: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if !bytes.starts_with(b"-----BEGIN") {
        return Ok(vec![bytes]);
    }

    let blocks = pem::parse_many(&bytes)
        .with_context(|| format!("Invalid PEM in {}", path.display()))?;
    let crls: Vec<Vec<u8>> = blocks
        .into_iter()
        .filter(|block| block.tag() == "X509 CRL")
        .map(|block| block.into_contents())
        .collect();
    if crls.is_empty() {
        return Err(anyhow!("No X509 CRL blocks found in {}", path.display()));
    }
    Ok(crls)
}
