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

//! Client policy resolution over settings files.

use cachet::policy::{
    ClientPolicy, ClientPolicyProvider, MemoryScope, PolicyError, SettingsScope, TomlFileScope,
    SETTINGS_FILE_NAME, SIGNATURE_VALIDATION_MODE_KEY,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Project, solution and user files, nearest first.
struct Layers {
    _dir: TempDir,
    project: PathBuf,
    solution: PathBuf,
    user: PathBuf,
}

impl Layers {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let solution_dir = dir.path().join("solution");
        let project_dir = solution_dir.join("project");
        let user_dir = dir.path().join("home");
        fs::create_dir_all(&project_dir).unwrap();
        fs::create_dir_all(&user_dir).unwrap();
        Self {
            project: project_dir.join(SETTINGS_FILE_NAME),
            solution: solution_dir.join(SETTINGS_FILE_NAME),
            user: user_dir.join(SETTINGS_FILE_NAME),
            _dir: dir,
        }
    }

    fn provider(&self) -> ClientPolicyProvider {
        ClientPolicyProvider::new(vec![
            Box::new(TomlFileScope::new(&self.project)),
            Box::new(TomlFileScope::new(&self.solution)),
            Box::new(TomlFileScope::new(&self.user)),
        ])
    }
}

fn write_mode(path: &Path, value: &str) {
    fs::write(
        path,
        format!("[config]\n{SIGNATURE_VALIDATION_MODE_KEY} = \"{value}\"\n"),
    )
    .unwrap();
}

/// Test that an empty hierarchy resolves to Accept.
#[test]
fn test_no_settings_resolves_accept() {
    let layers = Layers::new();
    assert_eq!(layers.provider().load(), ClientPolicy::Accept);
}

/// Test that the nearest definition wins over farther ones.
#[test]
fn test_nearest_scope_wins() {
    let layers = Layers::new();
    write_mode(&layers.user, "require");
    write_mode(&layers.solution, "accept");
    assert_eq!(layers.provider().load(), ClientPolicy::Accept);

    write_mode(&layers.project, "Require");
    assert_eq!(layers.provider().load(), ClientPolicy::Require);
}

/// Test that stored values are matched without regard to case.
#[test]
fn test_values_are_case_insensitive() {
    let layers = Layers::new();
    for value in ["require", "REQUIRE", "ReQuIrE"] {
        write_mode(&layers.user, value);
        assert_eq!(layers.provider().load(), ClientPolicy::Require, "{value}");
    }
}

/// Test that an unrecognized nearest value resolves to Accept.
#[test]
fn test_unparseable_value_resolves_accept() {
    let layers = Layers::new();
    write_mode(&layers.user, "require");
    write_mode(&layers.project, "strict");
    assert_eq!(layers.provider().load(), ClientPolicy::Accept);
}

/// Test that an empty nearest value stops resolution and resolves to Accept.
#[test]
fn test_empty_nearest_value_resolves_accept() {
    let layers = Layers::new();
    write_mode(&layers.user, "require");
    write_mode(&layers.project, "");
    assert_eq!(layers.provider().load(), ClientPolicy::Accept);
}

/// Test that a non-string nearest value resolves to Accept.
#[test]
fn test_non_string_nearest_value_resolves_accept() {
    let layers = Layers::new();
    write_mode(&layers.user, "require");
    fs::write(
        &layers.project,
        format!("[config]\n{SIGNATURE_VALIDATION_MODE_KEY} = 1\n"),
    )
    .unwrap();
    assert_eq!(layers.provider().load(), ClientPolicy::Accept);

    let provider = layers.provider();
    assert!(provider.delete().unwrap());
    assert_eq!(provider.load(), ClientPolicy::Require);
}

/// Test that save writes the canonical spelling to the nearest writable scope only.
#[test]
fn test_save_writes_nearest_scope() {
    let layers = Layers::new();
    write_mode(&layers.user, "accept");
    let provider = layers.provider();

    provider.save(ClientPolicy::Require).unwrap();

    let project = fs::read_to_string(&layers.project).unwrap();
    assert!(project.contains("signatureValidationMode = \"Require\""));
    assert!(!layers.solution.exists());
    assert!(fs::read_to_string(&layers.user).unwrap().contains("\"accept\""));
    assert_eq!(provider.load(), ClientPolicy::Require);
}

/// Test that read-only scopes are skipped when saving.
#[test]
fn test_save_skips_read_only_scopes() {
    let layers = Layers::new();
    let provider = ClientPolicyProvider::new(vec![
        Box::new(TomlFileScope::read_only(&layers.project)),
        Box::new(TomlFileScope::new(&layers.user)),
    ]);

    provider.save(ClientPolicy::Require).unwrap();
    assert!(!layers.project.exists());
    assert!(layers.user.exists());

    let locked =
        ClientPolicyProvider::new(vec![Box::new(TomlFileScope::read_only(&layers.project))]);
    assert!(matches!(
        locked.save(ClientPolicy::Accept),
        Err(PolicyError::NoWritableScope)
    ));
}

/// Test that delete exposes the next definition, then the default.
#[test]
fn test_delete_falls_back_through_layers() {
    let layers = Layers::new();
    write_mode(&layers.project, "require");
    write_mode(&layers.user, "require");
    let provider = layers.provider();
    assert_eq!(provider.load(), ClientPolicy::Require);

    assert!(provider.delete().unwrap());
    assert_eq!(provider.load(), ClientPolicy::Require);

    assert!(provider.delete().unwrap());
    assert_eq!(provider.load(), ClientPolicy::Accept);

    assert!(!provider.delete().unwrap());
}

/// Test that delete leaves read-only definitions in effect.
#[test]
fn test_delete_leaves_read_only_definitions() {
    let layers = Layers::new();
    write_mode(&layers.solution, "require");
    let provider = ClientPolicyProvider::new(vec![
        Box::new(MemoryScope::new("session")),
        Box::new(TomlFileScope::read_only(&layers.solution)),
    ]);

    assert!(!provider.delete().unwrap());
    assert_eq!(provider.load(), ClientPolicy::Require);
}

/// Test that cached values survive external edits until reload.
#[test]
fn test_reload_observes_external_changes() {
    let layers = Layers::new();
    write_mode(&layers.user, "accept");
    let provider = layers.provider();
    assert_eq!(provider.load(), ClientPolicy::Accept);

    layers.provider().save(ClientPolicy::Require).unwrap();
    assert_eq!(provider.load(), ClientPolicy::Accept);

    provider.reload();
    assert_eq!(provider.load(), ClientPolicy::Require);
}

/// Test that scopes can be mixed freely.
#[test]
fn test_memory_scope_over_file_scope() {
    let layers = Layers::new();
    write_mode(&layers.user, "require");
    let session = MemoryScope::new("session").with_value(SIGNATURE_VALIDATION_MODE_KEY, "Accept");
    assert_eq!(session.name(), "session");

    let provider = ClientPolicyProvider::new(vec![
        Box::new(session),
        Box::new(TomlFileScope::new(&layers.user)),
    ]);
    assert_eq!(provider.load(), ClientPolicy::Accept);
}
