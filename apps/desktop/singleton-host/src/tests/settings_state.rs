// Unit tests for the settings actor

use crate::settings::file::{SETTINGS_FILE_NAME, load};
use crate::settings::state::SettingsState;
use crate::settings::{ProxyMode, ProxySettings};

use server_core::proxy::{ProxyConfig, ProxyKind};
use server_core::settings::ProxySettingsStore;

/// **VALUE**: Verifies that applying a proxy updates memory and disk.
///
/// **WHY THIS MATTERS**: The server reports success to nobody; the settings file is the
/// only lasting trace of a forwarded proxy.
///
/// **BUG THIS CATCHES**: Would catch `apply_proxy()` resolving before the actor ran, or the
/// actor updating memory without saving.
#[tokio::test]
async fn given_state_when_proxy_applied_then_memory_and_file_updated() {
    // GIVEN: Empty settings in a temp directory
    let dir = tempfile::tempdir().unwrap();
    let state = SettingsState::new(dir.path().to_path_buf(), ProxySettings::default());
    let proxy = ProxyConfig::new(ProxyKind::Socks5, "proxy.example", 1080, "u", "p").unwrap();

    // WHEN: Applying through the store seam
    state.apply_proxy(proxy.clone()).await.unwrap();

    // THEN: Memory reflects it
    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.list, vec![proxy.clone()]);
    assert_eq!(snapshot.selected, Some(proxy));
    assert_eq!(snapshot.mode, ProxyMode::Enabled);
    assert!(snapshot.use_proxy_for_calls);

    // AND: The file holds the same settings
    assert_eq!(load(dir.path()).unwrap(), snapshot);
}

/// **VALUE**: Verifies that concurrent applies are serialized.
///
/// **WHY THIS MATTERS**: The actor is the only writer; interleaved updates must not lose
/// list entries.
///
/// **BUG THIS CATCHES**: Would catch read-modify-write races between callers.
#[tokio::test]
async fn given_many_concurrent_applies_when_done_then_every_proxy_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let state = SettingsState::new(dir.path().to_path_buf(), ProxySettings::default());

    let tasks: Vec<_> = (1..=20u16)
        .map(|port| {
            let state = state.clone();
            tokio::spawn(async move {
                let proxy = ProxyConfig::new(ProxyKind::Http, "h", i64::from(port), "", "").unwrap();
                state.apply_proxy(proxy).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.list.len(), 20);
    assert_eq!(load(dir.path()).unwrap().list.len(), 20);
}

/// **VALUE**: Verifies that a failed save keeps the in-memory update.
///
/// **WHY THIS MATTERS**: The user still gets the proxy for this session even if the disk
/// is read-only.
///
/// **BUG THIS CATCHES**: Would catch persistence errors rolling back or failing the apply.
#[tokio::test]
async fn given_unwritable_settings_dir_when_proxy_applied_then_memory_still_updated() {
    // GIVEN: A settings "directory" that is actually a file
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let state = SettingsState::new(blocked.clone(), ProxySettings::default());
    let proxy = ProxyConfig::new(ProxyKind::Http, "h", 80, "", "").unwrap();

    // WHEN: Applying
    let result = state.apply_proxy(proxy.clone()).await;

    // THEN: Applied in memory, nothing written
    assert!(result.is_ok());
    assert_eq!(state.snapshot().await.selected, Some(proxy));
    assert!(!blocked.join(SETTINGS_FILE_NAME).exists());
}

/// **VALUE**: Verifies that each apply resolves only after its own save has landed.
///
/// **WHY THIS MATTERS**: The file is written on the blocking pool; callers (and the process
/// exiting right after a handover) rely on the settings being on disk once the apply returns.
///
/// **BUG THIS CATCHES**: Would catch the save being handed off without being awaited, which
/// lets `apply_proxy()` return while the file still holds the previous settings.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_sequential_applies_when_each_returns_then_file_already_holds_it() {
    let dir = tempfile::tempdir().unwrap();
    let state = SettingsState::new(dir.path().to_path_buf(), ProxySettings::default());

    for port in 1..=10u16 {
        let proxy = ProxyConfig::new(ProxyKind::Socks5, "h", i64::from(port), "", "").unwrap();

        state.apply_proxy(proxy.clone()).await.unwrap();

        let persisted = load(dir.path()).unwrap();
        assert_eq!(persisted.list.len(), usize::from(port));
        assert_eq!(persisted.selected, Some(proxy));
    }
}
