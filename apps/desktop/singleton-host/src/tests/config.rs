// Unit tests for host configuration loading

use crate::config::{CONFIG_FILE_NAME, HostConfig};

use server_core::LOCAL_SERVER_NAME;
use server_core::error::config::ConfigError;

use std::fs;
use std::path::PathBuf;

/// **VALUE**: Verifies that a missing config file is not an error.
///
/// **WHY THIS MATTERS**: First launch has no config file at all.
///
/// **BUG THIS CATCHES**: Would catch `load()` failing with a read error on a fresh install.
#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = HostConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

    assert_eq!(config, HostConfig::default());
    assert_eq!(config.server.name, LOCAL_SERVER_NAME);
    assert!(config.settings_dir.ends_with("singleton-host"));
}

/// **VALUE**: Verifies that a partial TOML file overrides only what it names.
///
/// **WHY THIS MATTERS**: Users typically set one or two keys.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on the server section
/// or one of its fields.
#[test]
fn given_partial_toml_when_loaded_then_merges_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        "settings_dir = \"/srv/host\"\n\n[server]\nname = \"custom\"\nwrite_timeout_ms = 250\n",
    )
    .unwrap();

    let config = HostConfig::load(&path).unwrap();

    assert_eq!(config.settings_dir, PathBuf::from("/srv/host"));
    assert_eq!(config.server.name, "custom");
    assert_eq!(config.server.write_timeout_ms, 250);
    assert!(config.server.reclaim_stale_endpoint);
    assert_eq!(config.log_dir, HostConfig::default().log_dir);
}

/// **VALUE**: Verifies that a corrupt file is reported, not silently replaced.
///
/// **WHY THIS MATTERS**: Falling back to defaults would bind a different channel name
/// than the user configured.
///
/// **BUG THIS CATCHES**: Would catch parse failures swallowed into defaults.
#[test]
fn given_invalid_toml_when_loaded_then_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[server\nname = ").unwrap();

    let result = HostConfig::load(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies that the server section is validated on load.
///
/// **WHY THIS MATTERS**: An empty channel name can never be bound.
///
/// **BUG THIS CATCHES**: Would catch `load()` skipping validation.
#[test]
fn given_empty_channel_name_when_loaded_then_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[server]\nname = \"\"\n").unwrap();

    match HostConfig::load(&path) {
        Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "name"),
        other => panic!("Expected validation error, got {other:?}"),
    }
}
