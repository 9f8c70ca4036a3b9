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

//! `policy get|set|delete`.

use super::CommandResult;
use anyhow::Context;
use cachet::policy::{
    ClientPolicy, ClientPolicyProvider, SettingsHierarchy, TomlFileScope,
    SIGNATURE_VALIDATION_MODE_KEY,
};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Which settings files a policy command reads and writes.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Use only this settings file
    #[arg(long, value_name = "PATH", conflicts_with = "settings_dir")]
    pub settings_file: Option<PathBuf>,

    /// Directory from which settings files are discovered
    #[arg(long, value_name = "DIR")]
    pub settings_dir: Option<PathBuf>,
}

impl ScopeArgs {
    fn provider(&self) -> anyhow::Result<ClientPolicyProvider> {
        if let Some(file) = &self.settings_file {
            return Ok(ClientPolicyProvider::new(vec![Box::new(TomlFileScope::new(
                file,
            ))]));
        }

        let start = match &self.settings_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to resolve the working directory")?,
        };
        Ok(ClientPolicyProvider::new(SettingsHierarchy::discover(&start)))
    }
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Print the effective signature validation mode
    Get {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Store a signature validation mode in the nearest writable settings file
    Set {
        /// accept or require
        mode: ClientPolicy,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Remove the nearest writable definition of the validation mode
    Delete {
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

pub fn run(command: PolicyCommands) -> CommandResult {
    match command {
        PolicyCommands::Get { scope } => {
            println!("{}", scope.provider()?.load());
        }
        PolicyCommands::Set { mode, scope } => {
            let provider = scope.provider()?;
            provider.save(mode)?;
            println!("{SIGNATURE_VALIDATION_MODE_KEY} = {mode}");
        }
        PolicyCommands::Delete { scope } => {
            let provider = scope.provider()?;
            if provider.delete()? {
                println!("Removed {SIGNATURE_VALIDATION_MODE_KEY}; now {}", provider.load());
            } else {
                println!("No writable settings file defines {SIGNATURE_VALIDATION_MODE_KEY}");
            }
        }
    }
    Ok(())
}
