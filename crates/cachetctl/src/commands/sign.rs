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

//! `sign` and `repo-sign`.

use super::{read_text, CommandResult, OutputArgs, TrustArgs};
use cachet::certificates::SigningCertificate;
use cachet::packaging::{signature_state, PackageArchive};
use cachet::security::{
    PackageSigner, SignOutcome, SignPackageRequest, SignaturePlacement, SigningOptions,
};
use clap::Args;
use std::path::{Path, PathBuf};
use url::Url;

/// Arguments common to author and repository signing.
#[derive(Args, Debug)]
pub struct SignerArgs {
    /// Package to sign
    pub package: PathBuf,

    /// PEM signing certificate; further certificates in the file are embedded
    /// as the chain
    #[arg(long, value_name = "PEM")]
    pub certificate: PathBuf,

    /// PKCS#8 PEM private key for the certificate
    #[arg(long, value_name = "PEM")]
    pub key: PathBuf,

    /// Hash algorithm for the signature
    #[arg(long, default_value = "SHA256")]
    pub hash_algorithm: String,

    /// Hash algorithm for the timestamp request
    #[arg(long, default_value = "SHA256")]
    pub timestamp_hash_algorithm: String,

    /// Timestamp authority URL; signatures are untimestamped without it
    #[arg(long, value_name = "URL")]
    pub timestamper: Option<Url>,

    /// Timestamp request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timestamp_timeout: u64,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub trust: TrustArgs,
}

impl SignerArgs {
    fn load_certificate(&self) -> Result<SigningCertificate, super::CommandError> {
        let certificate = read_text(&self.certificate)?;
        let key = read_text(&self.key)?;
        Ok(SigningCertificate::from_pem(&certificate, Some(&key))?)
    }

    fn options(&self) -> SigningOptions {
        self.output.signing_options(&self.package)
    }

    fn signer(&self) -> Result<PackageSigner, super::CommandError> {
        let signer = PackageSigner::new(self.trust.validator()?);
        match &self.timestamper {
            Some(url) => self.with_timestamper(signer, url.clone()),
            None => {
                self.warn_if_no_timestamper();
                Ok(signer)
            }
        }
    }

    /// Untimestamped signatures stop verifying once the certificate expires.
    fn warn_if_no_timestamper(&self) {
        if self.timestamper.is_none() {
            tracing::warn!(
                "No --timestamper given; the signature on {} will not be timestamped and \
                 becomes invalid when the signing certificate expires",
                self.package.display()
            );
        }
    }

    #[cfg(feature = "http-timestamper")]
    fn with_timestamper(
        &self,
        signer: PackageSigner,
        url: Url,
    ) -> Result<PackageSigner, super::CommandError> {
        let timeout = std::time::Duration::from_secs(self.timestamp_timeout);
        let timestamper = cachet::security::HttpTimestamper::with_timeout(url, timeout)
            .map_err(cachet::SignatureError::from)?;
        Ok(signer.with_timestamper(std::sync::Arc::new(timestamper)))
    }

    #[cfg(not(feature = "http-timestamper"))]
    fn with_timestamper(
        &self,
        _signer: PackageSigner,
        _url: Url,
    ) -> Result<PackageSigner, super::CommandError> {
        Err(anyhow::anyhow!(
            "--timestamper is unavailable: cachetctl was built without the http-timestamper feature"
        )
        .into())
    }
}

#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct RepoSignArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// Absolute http(s) URL of the repository service index
    #[arg(long, value_name = "URL")]
    pub service_index: String,

    /// Package owner recorded in the signature (repeatable)
    #[arg(long = "owner", value_name = "NAME")]
    pub owners: Vec<String>,
}

pub async fn run_author(args: SignArgs) -> CommandResult {
    let args = args.signer;
    let request = SignPackageRequest::author(
        args.load_certificate()?,
        &args.hash_algorithm,
        &args.timestamp_hash_algorithm,
    )?;

    let outcome = args.signer()?.sign(&args.options(), &request).await?;
    report(&outcome);
    Ok(())
}

pub async fn run_repository(args: RepoSignArgs) -> CommandResult {
    let placement = placement_for(&args.signer.package);
    tracing::debug!("Repository signature placement: {:?}", placement);

    let signer_args = &args.signer;
    let request = SignPackageRequest::repository(
        signer_args.load_certificate()?,
        &signer_args.hash_algorithm,
        &signer_args.timestamp_hash_algorithm,
        placement,
        &args.service_index,
        &args.owners,
    )?;

    let outcome = signer_args
        .signer()?
        .sign(&signer_args.options(), &request)
        .await?;
    report(&outcome);
    Ok(())
}

/// Countersigns when the package carries an author signature, otherwise adds
/// a repository primary. Unreadable packages fall back to a primary so the
/// signer reports their errors after its destination check.
fn placement_for(package: &Path) -> SignaturePlacement {
    PackageArchive::read(package)
        .ok()
        .and_then(|archive| signature_state(&archive).ok())
        .map(SignaturePlacement::for_state)
        .unwrap_or(SignaturePlacement::Primary)
}

fn report(outcome: &SignOutcome) {
    println!("Signed {}", outcome.destination.display());
    println!("  state:       {}", outcome.state);
    println!("  digest:      {}", outcome.signed_digest);
    println!("  fingerprint: {}", outcome.signer_fingerprint);
    if let Some(timestamp) = outcome.timestamp {
        println!("  timestamp:   {}", timestamp.to_rfc3339());
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
}
