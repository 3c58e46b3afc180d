// Unit tests for server configuration

use crate::LOCAL_SERVER_NAME;
use crate::config::ServerConfig;
use crate::error::config::ConfigError;

use std::time::Duration;

/// **VALUE**: Verifies the defaults every primary and secondary instance agree on.
///
/// **WHY THIS MATTERS**: Both sides must resolve the same channel name without any config.
///
/// **BUG THIS CATCHES**: Would catch a default name drifting from the well-known constant.
#[test]
fn given_default_config_when_inspected_then_uses_well_known_name() {
    let config = ServerConfig::default();

    assert_eq!(config.name, LOCAL_SERVER_NAME);
    assert_eq!(config.name, "telegram_local_server");
    assert!(config.reclaim_stale_endpoint);
    assert_eq!(config.write_timeout(), Duration::from_secs(1));
    assert_eq!(config.read_buffer_size, 64 * 1024);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies that partial documents fill in defaults.
///
/// **WHY THIS MATTERS**: Host config files usually only override the channel name.
///
/// **BUG THIS CATCHES**: Would catch missing `#[serde(default)]` on a field.
#[test]
fn given_partial_json_when_deserialized_then_missing_fields_use_defaults() {
    let config: ServerConfig = serde_json::from_str(r#"{"name":"other"}"#).unwrap();

    assert_eq!(config, ServerConfig::with_name("other"));
}

/// **VALUE**: Verifies validation of each field.
///
/// **WHY THIS MATTERS**: A zero timeout would fail every broadcast, an empty name would
/// never resolve to an endpoint.
///
/// **BUG THIS CATCHES**: Would catch validation naming the wrong field or accepting zeros.
#[test]
fn given_invalid_values_when_validated_then_names_offending_field() {
    let cases = [
        (ServerConfig::with_name("  "), "name"),
        (
            ServerConfig {
                write_timeout_ms: 0,
                ..ServerConfig::default()
            },
            "write_timeout_ms",
        ),
        (
            ServerConfig {
                read_buffer_size: 0,
                ..ServerConfig::default()
            },
            "read_buffer_size",
        ),
    ];

    for (config, expected) in cases {
        match config.validate() {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected validation error for {expected}, got {other:?}"),
        }
    }
}
