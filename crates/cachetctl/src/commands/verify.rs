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

//! `verify`.

use super::{CommandResult, TrustArgs};
use anyhow::Context;
use cachet::policy::{ClientPolicy, ClientPolicyProvider, SettingsHierarchy};
use cachet::security::{PackageVerifier, VerificationOutcome, VerifierSettings};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Package to verify
    pub package: PathBuf,

    /// Signature validation mode; overrides the settings files
    #[arg(long, value_name = "MODE")]
    pub policy: Option<ClientPolicy>,

    /// Directory from which settings files are discovered
    #[arg(long, value_name = "DIR")]
    pub settings_dir: Option<PathBuf>,

    #[command(flatten)]
    pub trust: TrustArgs,
}

impl VerifyArgs {
    fn settings(&self) -> anyhow::Result<VerifierSettings> {
        if let Some(policy) = self.policy {
            return Ok(VerifierSettings { policy });
        }

        let start = match &self.settings_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to resolve the working directory")?,
        };
        let provider = ClientPolicyProvider::new(SettingsHierarchy::discover(&start));
        Ok(VerifierSettings::from_provider(&provider))
    }
}

pub async fn run(args: VerifyArgs) -> CommandResult {
    let verifier = PackageVerifier::new(args.trust.validator()?, args.settings()?);
    let outcome = verifier.verify(&args.package).await?;
    report(&args.package, &outcome);
    Ok(())
}

fn report(package: &std::path::Path, outcome: &VerificationOutcome) {
    println!(
        "Verified {} ({}, policy {})",
        package.display(),
        outcome.state,
        outcome.policy
    );
    if let Some(hash) = &outcome.content_hash {
        println!("  content hash: {hash}");
    }
    for signature in &outcome.signatures {
        println!(
            "  {:?} {} signature by {} [{}]{}",
            signature.role,
            signature.signature_type,
            signature.signer_subject,
            signature.signer_fingerprint,
            if signature.trusted { "" } else { " (untrusted)" }
        );
        match signature.timestamp {
            Some(timestamp) => println!("    timestamped {}", timestamp.to_rfc3339()),
            None => println!("    signed {}", signature.signing_time.to_rfc3339()),
        }
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
}
