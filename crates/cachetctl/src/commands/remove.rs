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

//! `remove-signature`.

use super::{CommandResult, OutputArgs};
use cachet::certificates::{ChainValidator, TrustStore};
use cachet::security::{PackageSigner, RemovalAction};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Signed package
    pub package: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(args: RemoveArgs) -> CommandResult {
    // Removal never consults trust, so no roots are needed
    let signer = PackageSigner::new(ChainValidator::new(TrustStore::new()));
    let outcome = signer
        .remove_signature(&args.output.signing_options(&args.package))
        .await?;

    let removed = match outcome.removed {
        RemovalAction::RemoveCountersignature => "repository countersignature",
        RemovalAction::RemovePrimary => "primary signature",
    };
    println!(
        "Removed {} from {} (now {})",
        removed,
        outcome.destination.display(),
        outcome.state
    );
    Ok(())
}
