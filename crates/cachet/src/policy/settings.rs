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

//! Layered settings scopes.
//!
//! A hierarchy is an ordered list of scopes, nearest first. Each scope is an
//! independent key/value store under a `[config]` table and may be read-only.

use super::PolicyError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file looked up in a directory and its ancestors.
pub const SETTINGS_FILE_NAME: &str = "cachet.toml";

const CONFIG_TABLE: &str = "config";

/// One layer of configuration.
pub trait SettingsScope: Send + Sync {
    /// Human-readable location, for diagnostics.
    fn name(&self) -> String;

    fn is_writable(&self) -> bool;

    /// The value of `key` if this scope defines it. Non-string values are
    /// returned in their serialized form.
    fn get(&self, key: &str) -> Result<Option<String>, PolicyError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PolicyError>;

    /// Removes `key`, returning whether it was present.
    fn remove(&self, key: &str) -> Result<bool, PolicyError>;
}

/// A TOML settings file.
///
/// A missing file reads as empty and is created on the first write.
#[derive(Debug, Clone)]
pub struct TomlFileScope {
    path: PathBuf,
    writable: bool,
}

impl TomlFileScope {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writable: true,
        }
    }

    /// A scope that can be read but never modified, such as a machine-wide
    /// file.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writable: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<toml::Table, PolicyError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(PolicyError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        content
            .parse::<toml::Table>()
            .map_err(|source| PolicyError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), PolicyError> {
        let content = toml::to_string_pretty(table)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PolicyError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, content).map_err(|source| PolicyError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn ensure_writable(&self) -> Result<(), PolicyError> {
        if self.writable {
            Ok(())
        } else {
            Err(PolicyError::ReadOnlyScope { scope: self.name() })
        }
    }
}

impl SettingsScope for TomlFileScope {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn get(&self, key: &str) -> Result<Option<String>, PolicyError> {
        let table = self.read_table()?;
        Ok(table
            .get(CONFIG_TABLE)
            .and_then(|config| config.as_table())
            .and_then(|config| config.get(key))
            .map(|value| match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            }))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PolicyError> {
        self.ensure_writable()?;
        let mut table = self.read_table()?;
        let config = table
            .entry(CONFIG_TABLE)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let Some(config) = config.as_table_mut() else {
            return Err(PolicyError::InvalidLayout {
                scope: self.name(),
                reason: format!("'{CONFIG_TABLE}' is not a table"),
            });
        };
        config.insert(key.to_string(), toml::Value::String(value.to_string()));
        self.write_table(&table)
    }

    fn remove(&self, key: &str) -> Result<bool, PolicyError> {
        self.ensure_writable()?;
        let mut table = self.read_table()?;
        let removed = table
            .get_mut(CONFIG_TABLE)
            .and_then(|config| config.as_table_mut())
            .and_then(|config| config.remove(key))
            .is_some();
        if removed {
            self.write_table(&table)?;
        }
        Ok(removed)
    }
}

/// An in-memory scope.
#[derive(Debug, Default)]
pub struct MemoryScope {
    name: String,
    writable: bool,
    values: RwLock<HashMap<String, String>>,
}

impl MemoryScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            writable: true,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn read_only(name: impl Into<String>) -> Self {
        Self {
            writable: false,
            ..Self::new(name)
        }
    }

    /// Seeds a value regardless of writability.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.write().insert(key.into(), value.into());
        self
    }
}

impl SettingsScope for MemoryScope {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn get(&self, key: &str) -> Result<Option<String>, PolicyError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PolicyError> {
        if !self.writable {
            return Err(PolicyError::ReadOnlyScope { scope: self.name() });
        }
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, PolicyError> {
        if !self.writable {
            return Err(PolicyError::ReadOnlyScope { scope: self.name() });
        }
        Ok(self.values.write().remove(key).is_some())
    }
}

/// Builds the ordered scope list for a working directory.
pub struct SettingsHierarchy;

impl SettingsHierarchy {
    /// `cachet.toml` in `start_dir` and each of its ancestors, nearest first,
    /// followed by the user's `cachet/cachet.toml` in the platform config
    /// directory.
    pub fn discover(start_dir: &Path) -> Vec<Box<dyn SettingsScope>> {
        let mut scopes: Vec<Box<dyn SettingsScope>> = start_dir
            .ancestors()
            .map(|dir| dir.join(SETTINGS_FILE_NAME))
            .filter(|path| path.is_file())
            .map(|path| Box::new(TomlFileScope::new(path)) as Box<dyn SettingsScope>)
            .collect();

        if let Some(user) = Self::user_settings_path() {
            if !scopes.iter().any(|s| s.name() == user.display().to_string()) {
                scopes.push(Box::new(TomlFileScope::new(user)));
            }
        }

        tracing::debug!(
            "Discovered {} settings scopes from {}",
            scopes.len(),
            start_dir.display()
        );
        scopes
    }

    pub fn user_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cachet").join(SETTINGS_FILE_NAME))
    }
}
