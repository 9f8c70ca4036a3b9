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

//! Client trust policy and the settings it is stored in.
//!
//! The policy decides whether unsigned packages are acceptable. It is read
//! from an explicit, ordered list of [`SettingsScope`]s; there is no global
//! settings object.

mod client_policy;
mod provider;
mod settings;

pub use client_policy::{ClientPolicy, ParseClientPolicyError};
pub use provider::{ClientPolicyProvider, SIGNATURE_VALIDATION_MODE_KEY};
pub use settings::{
    MemoryScope, SettingsHierarchy, SettingsScope, TomlFileScope, SETTINGS_FILE_NAME,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("No writable settings scope is available")]
    NoWritableScope,

    #[error("Settings scope {scope} is read-only")]
    ReadOnlyScope { scope: String },

    #[error("Failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write settings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Settings scope {scope} has an invalid layout: {reason}")]
    InvalidLayout { scope: String, reason: String },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}
