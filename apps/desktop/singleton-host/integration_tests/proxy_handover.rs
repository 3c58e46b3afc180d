use singleton_host::settings::file::load;
use singleton_host::settings::state::SettingsState;
use singleton_host::settings::{ProxyMode, ProxySettings};

use server_core::client::LocalClient;
use server_core::config::ServerConfig;
use server_core::proxy::{ProxyConfig, ProxyKind};
use server_core::server::start_local_server;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Poll until the settings file names a selected proxy.
async fn wait_for_persisted(settings_dir: &Path) -> Option<ProxySettings> {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if let Ok(settings) = load(settings_dir) {
            if settings.selected.is_some() {
                return Some(settings);
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

/// **VALUE**: Verifies the whole handover: a secondary instance forwards a proxy link and
/// the primary persists it.
///
/// **WHY THIS MATTERS**: This is the user-visible feature: opening a proxy link while the
/// app is already running must configure the running app and survive a restart.
///
/// **BUG THIS CATCHES**: Would catch a break anywhere between socket, dispatcher, settings
/// actor and settings file.
#[tokio::test]
async fn given_primary_when_secondary_forwards_proxy_then_selected_and_persisted() {
    // GIVEN: A primary with file-backed settings
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("host.sock");
    let settings_dir = dir.path().join("settings");
    let config = ServerConfig::with_name(socket.to_string_lossy().into_owned());
    let state = SettingsState::new(settings_dir.clone(), ProxySettings::default());
    let mut handle = start_local_server(&config, Arc::new(state.clone()))
        .await
        .expect("Primary should start");

    // AND: A second launch finds the channel taken
    let second = start_local_server(&config, Arc::new(state.clone())).await;
    assert!(second.err().is_some_and(|e| e.is_already_running()));

    // WHEN: The secondary forwards a proxy
    let mut client = LocalClient::connect(&config.name).await.unwrap();
    client
        .set_proxy(
            "",
            json!({"protocol": "socks5", "host": "proxy.example", "port": 1080, "user": "u", "password": "p"}),
        )
        .await
        .unwrap();

    // THEN: It is on disk, selected and enabled
    let expected = ProxyConfig::new(ProxyKind::Socks5, "proxy.example", 1080, "u", "p").unwrap();
    let persisted = wait_for_persisted(&settings_dir)
        .await
        .expect("Proxy should be persisted");
    assert_eq!(persisted.list, vec![expected.clone()]);
    assert_eq!(persisted.selected, Some(expected));
    assert_eq!(persisted.mode, ProxyMode::Enabled);
    assert!(persisted.use_proxy_for_calls);

    // AND: Memory matches the file
    assert_eq!(state.snapshot().await, persisted);

    handle.stop();
}
