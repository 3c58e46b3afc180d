// Unit tests for the proxy.settings file

use crate::settings::file::{
    SETTINGS_FILE_NAME, SETTINGS_VERSION, decode_settings, encode_settings, load, save,
};
use crate::settings::{ProxyMode, ProxySettings};

use server_core::error::settings::SettingsError;
use server_core::proxy::codec::STREAM_VERSION;
use server_core::proxy::{ProxyConfig, ProxyKind};

fn sample_settings() -> ProxySettings {
    let socks = ProxyConfig::new(ProxyKind::Socks5, "proxy.example", 1080, "u", "p").unwrap();
    let http = ProxyConfig::new(ProxyKind::Http, "прокси.рф", 3128, "", "").unwrap();
    ProxySettings {
        list: vec![socks, http.clone()],
        selected: Some(http),
        mode: ProxyMode::Enabled,
        use_proxy_for_calls: true,
    }
}

/// **VALUE**: Verifies the file header and the empty-selection marker.
///
/// **WHY THIS MATTERS**: The header is how future versions recognize old files.
///
/// **BUG THIS CATCHES**: Would catch header fields reordered, or "no selection" written as
/// a None-kind record instead of a zero-length blob.
#[test]
fn given_default_settings_when_encoded_then_header_and_empty_selection() {
    let bytes = encode_settings(&ProxySettings::default());

    let mut expected = Vec::new();
    expected.extend_from_slice(&SETTINGS_VERSION.to_be_bytes());
    expected.extend_from_slice(&STREAM_VERSION.to_be_bytes());
    expected.extend_from_slice(&ProxyMode::System.tag().to_be_bytes());
    expected.extend_from_slice(&0i32.to_be_bytes());
    expected.extend_from_slice(&0u32.to_be_bytes());
    expected.extend_from_slice(&0u32.to_be_bytes());
    assert_eq!(bytes, expected);
}

/// **VALUE**: Verifies that saved settings load back identically, non-ASCII hosts included.
///
/// **WHY THIS MATTERS**: A proxy applied by a secondary instance must survive a restart.
///
/// **BUG THIS CATCHES**: Would catch the selected proxy lost, the calls flag dropped, or
/// UTF-16 strings mangled.
#[test]
fn given_saved_settings_when_loaded_then_identical() {
    let dir = tempfile::tempdir().unwrap();
    let settings = sample_settings();

    save(dir.path(), &settings).unwrap();
    let loaded = load(dir.path()).unwrap();

    assert_eq!(loaded, settings);
    assert!(dir.path().join(SETTINGS_FILE_NAME).exists());
    assert!(
        !dir.path().join(format!("{SETTINGS_FILE_NAME}.tmp")).exists(),
        "Temp file must be renamed away"
    );
}

/// **VALUE**: Verifies that a missing file means empty settings.
///
/// **WHY THIS MATTERS**: First launch has nothing saved.
///
/// **BUG THIS CATCHES**: Would catch a NotFound read error failing startup.
#[test]
fn given_missing_file_when_loaded_then_default_settings() {
    let dir = tempfile::tempdir().unwrap();

    assert_eq!(load(dir.path()).unwrap(), ProxySettings::default());
}

/// **VALUE**: Verifies that damaged files are rejected instead of half-loaded.
///
/// **WHY THIS MATTERS**: A partially decoded list could select the wrong proxy.
///
/// **BUG THIS CATCHES**: Would catch truncation, trailing bytes, unknown versions or unknown
/// proxy kinds being accepted (or panicking on an out-of-bounds slice).
#[test]
fn given_damaged_bytes_when_decoded_then_format_error() {
    let valid = encode_settings(&sample_settings());

    let mut trailing = valid.clone();
    trailing.push(0);

    let mut future_version = valid.clone();
    future_version[..4].copy_from_slice(&(SETTINGS_VERSION + 1).to_be_bytes());

    let mut wrong_stream = valid.clone();
    wrong_stream[4..8].copy_from_slice(&16i32.to_be_bytes());

    // First list entry starts after 20 header bytes and its 4-byte blob length
    let mut unknown_kind = valid.clone();
    unknown_kind[24..28].copy_from_slice(&9i32.to_be_bytes());

    let mut bad_mode = valid.clone();
    bad_mode[8..12].copy_from_slice(&7i32.to_be_bytes());

    let cases: [(&str, Vec<u8>); 7] = [
        ("empty", Vec::new()),
        ("truncated", valid[..valid.len() - 3].to_vec()),
        ("trailing", trailing),
        ("future version", future_version),
        ("wrong stream version", wrong_stream),
        ("unknown kind", unknown_kind),
        ("bad mode", bad_mode),
    ];

    for (name, bytes) in cases {
        assert!(
            matches!(decode_settings(&bytes), Err(SettingsError::Format { .. })),
            "case {name}"
        );
    }
}

/// **VALUE**: Verifies that an unreadable settings path is a read error.
///
/// **WHY THIS MATTERS**: Startup must not treat an I/O failure as "no settings".
///
/// **BUG THIS CATCHES**: Would catch every read error being mapped to defaults.
#[test]
fn given_settings_path_is_directory_when_loaded_then_read_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(SETTINGS_FILE_NAME)).unwrap();

    assert!(matches!(load(dir.path()), Err(SettingsError::Read { .. })));
}

/// **VALUE**: Verifies the model update behind `set_proxy`.
///
/// **WHY THIS MATTERS**: This is what "apply a proxy" means for the host.
///
/// **BUG THIS CATCHES**: Would catch the list being replaced instead of appended, or the
/// mode left unchanged.
#[test]
fn given_disabled_settings_when_proxy_applied_then_appended_selected_and_active() {
    let mut settings = ProxySettings {
        mode: ProxyMode::Disabled,
        ..sample_settings()
    };
    let proxy = ProxyConfig::new(ProxyKind::Socks5, "new.example", 9050, "", "").unwrap();
    assert!(settings.active().is_none());

    settings.apply(proxy.clone());
    settings.apply(proxy.clone());

    assert_eq!(settings.list.len(), 4, "No deduplication");
    assert_eq!(settings.selected.as_ref(), Some(&proxy));
    assert_eq!(settings.mode, ProxyMode::Enabled);
    assert!(settings.use_proxy_for_calls);
    assert_eq!(settings.active(), Some(&proxy));
}
