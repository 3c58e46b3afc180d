//! Test helpers for local server integration tests.
//!
//! - A socket path per test under a private temp directory
//! - An in-memory settings store that records applied proxies
//! - Polling helpers, since the server works asynchronously

use server_core::config::ServerConfig;
use server_core::error::settings::SettingsError;
use server_core::proxy::ProxyConfig;
use server_core::server::{LocalServerHandle, start_local_server};
use server_core::settings::ProxySettingsStore;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

/// Upper bound for anything a test waits on.
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const SOCKET_FILE_NAME: &str = "telegram.sock";

/// Settings store that keeps every applied proxy in memory.
#[derive(Default)]
pub struct MemoryStore {
    applied: Mutex<Vec<ProxyConfig>>,
}

impl MemoryStore {
    pub fn applied(&self) -> Vec<ProxyConfig> {
        self.applied.lock().unwrap().clone()
    }
}

impl ProxySettingsStore for MemoryStore {
    async fn apply_proxy(&self, proxy: ProxyConfig) -> Result<(), SettingsError> {
        self.applied.lock().unwrap().push(proxy);
        Ok(())
    }
}

/// A running server bound inside its own temp directory.
pub struct TestServer {
    pub handle: LocalServerHandle,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
    // Keeps the socket directory alive for the duration of the test.
    pub dir: TempDir,
}

impl TestServer {
    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join(SOCKET_FILE_NAME)
    }
}

/// Server config pointing at a socket inside `dir`.
pub fn socket_config(dir: &TempDir) -> ServerConfig {
    let path = dir.path().join(SOCKET_FILE_NAME);
    ServerConfig::with_name(path.to_string_lossy().into_owned())
}

/// Test helper: start a server on a fresh socket.
pub async fn start_test_server() -> TestServer {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = socket_config(&dir);
    let store = Arc::new(MemoryStore::default());
    let handle = start_local_server(&config, Arc::clone(&store))
        .await
        .expect("Failed to start local server");

    TestServer {
        handle,
        store,
        config,
        dir,
    }
}

/// Test helper: wait until the server reports `expected` connections.
pub async fn wait_for_connections(handle: &LocalServerHandle, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if handle.connection_count().await.ok() == Some(expected) {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    false
}

/// Test helper: wait until the store has recorded `expected` proxies.
pub async fn wait_for_applied(store: &MemoryStore, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if store.applied().len() >= expected {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    false
}
