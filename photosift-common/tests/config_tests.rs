//! Tests for bootstrap configuration and source folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate PHOTOSIFT_SOURCE are marked with #[serial].

use photosift_common::config::{resolve_source_folder, TomlConfig, SOURCE_FOLDER_ENV};
use photosift_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
source_folder = "/srv/photos"

[engine]
preload_range = 4
undo_capacity = 20
background = false

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.source_folder, Some(PathBuf::from("/srv/photos")));
    assert_eq!(config.engine.preload_range, 4);
    assert_eq!(config.engine.undo_capacity, Some(20));
    assert!(!config.engine.background);
    assert!(config.engine.auto_score);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TomlConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(SOURCE_FOLDER_ENV, "/tmp/from-env");
    let config = TomlConfig {
        source_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let folder = resolve_source_folder(Some(Path::new("/tmp/from-cli")), &config);
    assert_eq!(folder, PathBuf::from("/tmp/from-cli"));

    env::remove_var(SOURCE_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(SOURCE_FOLDER_ENV, "/tmp/from-env");
    let config = TomlConfig {
        source_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    assert_eq!(resolve_source_folder(None, &config), PathBuf::from("/tmp/from-env"));

    env::remove_var(SOURCE_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_current_directory_fallback() {
    env::remove_var(SOURCE_FOLDER_ENV);

    let config = TomlConfig {
        source_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    assert_eq!(resolve_source_folder(None, &config), PathBuf::from("/tmp/from-toml"));

    let empty = TomlConfig::default();
    assert_eq!(resolve_source_folder(None, &empty), PathBuf::from("."));
}
