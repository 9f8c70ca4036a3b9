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

//! cachetctl - sign, countersign and verify cachet packages.
//!
//! Exit status is 0 on success, 1 when signing, removal or verification fails
//! with a diagnostic code, and 2 for usage or configuration errors.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::policy::PolicyCommands;
use commands::remove::RemoveArgs;
use commands::sign::{RepoSignArgs, SignArgs};
use commands::verify::VerifyArgs;

/// cachetctl - package signing and trust verification
#[derive(Parser)]
#[command(name = "cachetctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an author primary signature
    Sign(SignArgs),

    /// Add a repository signature, or countersign an author signature
    RepoSign(RepoSignArgs),

    /// Remove the outermost signature
    RemoveSignature(RemoveArgs),

    /// Verify a package against trusted roots and the client policy
    Verify(VerifyArgs),

    /// Inspect or change the client signature validation mode
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Sign(args) => commands::sign::run_author(args).await,
        Commands::RepoSign(args) => commands::sign::run_repository(args).await,
        Commands::RemoveSignature(args) => commands::remove::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
        Commands::Policy { command } => commands::policy::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_status())
        }
    }
}
