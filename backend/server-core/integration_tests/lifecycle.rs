use crate::helpers::{MemoryStore, socket_config, start_test_server, wait_for_connections};

use server_core::client::LocalClient;
use server_core::config::ServerConfig;
use server_core::error::BindReason;
use server_core::error::server::LocalServerError;
use server_core::server::{ServerState, start_local_server};

use std::sync::Arc;

use tokio::task::JoinSet;

const CONTENDERS: usize = 8;
const RACE_ROUNDS: usize = 25;

/// **VALUE**: Verifies that a freshly started server is listening on its socket.
///
/// **WHY THIS MATTERS**: Secondary instances find the primary by connecting to this path.
///
/// **BUG THIS CATCHES**: Would catch a server that reports success without binding, or
/// binds somewhere other than the configured path.
#[tokio::test]
async fn given_free_name_when_started_then_listening_and_accepts_clients() {
    // GIVEN: A server on a fresh socket
    let server = start_test_server().await;

    // THEN: It reports Listening and the socket exists
    assert_eq!(server.handle.state(), ServerState::Listening);
    assert!(server.socket_path().exists());
    assert_eq!(
        server.handle.endpoint().to_string(),
        server.socket_path().display().to_string()
    );

    // AND: A client can connect and gets registered
    let _client = LocalClient::connect(&server.config.name)
        .await
        .expect("Client should connect");
    assert!(wait_for_connections(&server.handle, 1).await);
}

/// **VALUE**: Verifies that a second primary on the same name is refused as "already running".
///
/// **WHY THIS MATTERS**: This is the whole point of the single-instance channel: the second
/// launch must learn that it is secondary instead of stealing the socket.
///
/// **BUG THIS CATCHES**: Would catch a stale-socket reclaim that deletes a live primary's
/// socket, or a bind error reported as a generic IO fault.
#[tokio::test]
async fn given_running_primary_when_second_server_starts_then_already_running() {
    // GIVEN: A running primary
    let server = start_test_server().await;

    // WHEN: A second server tries the same name
    let result = start_local_server(&server.config, Arc::new(MemoryStore::default())).await;

    // THEN: AlreadyRunning, and the primary is unaffected
    let error = result.err().expect("Second bind must fail");
    assert!(error.is_already_running(), "got {error}");
    assert!(server.socket_path().exists());
    assert_eq!(server.handle.state(), ServerState::Listening);
    assert!(LocalClient::connect(&server.config.name).await.is_ok());
}

/// **VALUE**: Verifies that a socket file left by a crashed primary is reclaimed.
///
/// **WHY THIS MATTERS**: After a crash, the next launch must become primary instead of
/// believing a dead instance is still running.
///
/// **BUG THIS CATCHES**: Would catch a leftover socket file treated as a live primary.
#[tokio::test]
async fn given_stale_socket_file_when_started_then_reclaims_it() {
    // GIVEN: A socket file nobody listens on
    let dir = tempfile::tempdir().unwrap();
    let config = socket_config(&dir);
    drop(std::os::unix::net::UnixListener::bind(&config.name).unwrap());
    assert!(std::path::Path::new(&config.name).exists());

    // WHEN: Starting with reclaim enabled (the default)
    let handle = start_local_server(&config, Arc::new(MemoryStore::default()))
        .await
        .expect("Stale socket should be reclaimed");

    // THEN: Listening and reachable
    assert_eq!(handle.state(), ServerState::Listening);
    assert!(LocalClient::connect(&config.name).await.is_ok());
}

/// **VALUE**: Verifies that reclaiming can be turned off.
///
/// **WHY THIS MATTERS**: Hosts that manage the socket themselves need the distinct reason.
///
/// **BUG THIS CATCHES**: Would catch a stale socket deleted despite the setting, or reported
/// as AlreadyRunning.
#[tokio::test]
async fn given_stale_socket_and_reclaim_disabled_when_started_then_stale_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        reclaim_stale_endpoint: false,
        ..socket_config(&dir)
    };
    drop(std::os::unix::net::UnixListener::bind(&config.name).unwrap());

    let error = start_local_server(&config, Arc::new(MemoryStore::default()))
        .await
        .err()
        .expect("Bind must fail");

    assert_eq!(error.bind_reason(), Some(BindReason::StaleEndpoint));
    assert!(!error.is_already_running());
    assert!(std::path::Path::new(&config.name).exists());
}

/// **VALUE**: Verifies that an unusable name fails with InvalidName.
///
/// **WHY THIS MATTERS**: Config mistakes must be distinguishable from another running primary.
///
/// **BUG THIS CATCHES**: Would catch empty names silently mapping to the temp directory itself.
#[tokio::test]
async fn given_invalid_name_when_started_then_invalid_name() {
    for name in ["", "   ", "nested/name"] {
        let error = start_local_server(
            &ServerConfig::with_name(name),
            Arc::new(MemoryStore::default()),
        )
        .await
        .err()
        .expect("Bind must fail");

        assert_eq!(error.bind_reason(), Some(BindReason::InvalidName), "name {name:?}");
    }
}

/// **VALUE**: Verifies the full stop contract.
///
/// **WHY THIS MATTERS**: After stop the name must be free for a new primary, and nothing may
/// be broadcast on a closed server.
///
/// **BUG THIS CATCHES**: Would catch a socket file left behind, a listener that keeps
/// accepting, or broadcasts that still go out after stop.
#[tokio::test]
async fn given_listening_server_when_stopped_then_idle_and_name_is_free() {
    // GIVEN: A listening server with one client
    let mut server = start_test_server().await;
    let _client = LocalClient::connect(&server.config.name).await.unwrap();
    assert!(wait_for_connections(&server.handle, 1).await);

    // WHEN: Stopping twice
    server.handle.stop();
    server.handle.stop();

    // THEN: Idle, socket gone, broadcast refused, connect refused
    assert_eq!(server.handle.state(), ServerState::Idle);
    assert!(!server.socket_path().exists());
    assert!(matches!(
        server.handle.notify_new_service_message("late").await,
        Err(LocalServerError::NotListening { .. })
    ));
    assert!(matches!(
        LocalClient::connect(&server.config.name).await,
        Err(LocalServerError::Connect { .. })
    ));

    // AND: A new primary can take the name
    let restarted = start_local_server(&server.config, Arc::new(MemoryStore::default()))
        .await
        .expect("Name should be free after stop");
    assert_eq!(restarted.state(), ServerState::Listening);
}

/// **VALUE**: Verifies that dropping the handle behaves like stop.
///
/// **WHY THIS MATTERS**: Hosts that exit early never call stop explicitly.
///
/// **BUG THIS CATCHES**: Would catch a socket file leaked when the handle is dropped.
#[tokio::test]
async fn given_listening_server_when_handle_dropped_then_socket_removed() {
    let server = start_test_server().await;
    let path = server.socket_path();

    drop(server.handle);

    assert!(!path.exists());
}

/// **VALUE**: Verifies that an invalid config is refused before anything is bound.
///
/// **WHY THIS MATTERS**: A zero read buffer drops every client on its first read and a zero
/// write timeout fails every broadcast, so the server would look alive while doing nothing.
///
/// **BUG THIS CATCHES**: Would catch `start_local_server` skipping `ServerConfig::validate()`,
/// or validating only after the socket file already exists.
#[tokio::test]
async fn given_zero_buffer_or_timeout_when_started_then_config_error_and_no_socket() {
    let dir = tempfile::tempdir().unwrap();
    let configs = [
        ServerConfig {
            read_buffer_size: 0,
            ..socket_config(&dir)
        },
        ServerConfig {
            write_timeout_ms: 0,
            ..socket_config(&dir)
        },
    ];

    for config in configs {
        let error = start_local_server(&config, Arc::new(MemoryStore::default()))
            .await
            .err()
            .expect("Invalid config must be refused");

        assert!(
            matches!(error, LocalServerError::Config { .. }),
            "got {error}"
        );
        assert!(!error.is_already_running());
        assert!(!std::path::Path::new(&config.name).exists());
    }
}

/// **VALUE**: Verifies that launches racing over a stale socket elect exactly one primary.
///
/// **WHY THIS MATTERS**: After a crash the user often double-clicks; both launches see the
/// dead socket, and only one of them may take it over.
///
/// **BUG THIS CATCHES**: Would catch an unguarded probe-then-reclaim where a second launch
/// deletes the first one's fresh socket and rebinds, leaving two primaries.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_stale_socket_when_launches_race_then_exactly_one_becomes_primary() {
    for round in 0..RACE_ROUNDS {
        // GIVEN: A socket file nobody listens on
        let dir = tempfile::tempdir().unwrap();
        let config = socket_config(&dir);
        drop(std::os::unix::net::UnixListener::bind(&config.name).unwrap());

        // WHEN: Several launches start at once
        let mut launches = JoinSet::new();
        for _ in 0..CONTENDERS {
            let config = config.clone();
            launches.spawn(async move {
                start_local_server(&config, Arc::new(MemoryStore::default())).await
            });
        }

        let mut primaries = Vec::new();
        let mut secondaries = 0;
        while let Some(result) = launches.join_next().await {
            match result.expect("Launch task panicked") {
                Ok(handle) => primaries.push(handle),
                Err(error) => {
                    assert!(error.is_already_running(), "round {round}: got {error}");
                    secondaries += 1;
                }
            }
        }

        // THEN: One primary, everyone else secondary, and the primary is reachable
        assert_eq!(primaries.len(), 1, "round {round}");
        assert_eq!(secondaries, CONTENDERS - 1, "round {round}");
        assert!(LocalClient::connect(&config.name).await.is_ok());
    }
}

/// **VALUE**: Verifies that stopping a server never removes a socket another listener owns.
///
/// **WHY THIS MATTERS**: If an old handle outlives its socket (deleted and rebound by a newer
/// primary), its stop or drop must not unlink the newer primary's rendezvous point.
///
/// **BUG THIS CATCHES**: Would catch `stop()` removing whatever file sits at the path, which
/// makes the live primary unreachable and lets the next launch become a second primary.
#[tokio::test]
async fn given_socket_replaced_by_newer_listener_when_old_handle_stops_then_socket_survives() {
    // GIVEN: A server whose socket file was replaced by a newer primary
    let mut old = start_test_server().await;
    std::fs::remove_file(old.socket_path()).unwrap();
    let newer = start_local_server(&old.config, Arc::new(MemoryStore::default()))
        .await
        .expect("Path is free once the old socket is unlinked");

    // WHEN: The old handle stops, then is dropped
    old.handle.stop();
    let path = old.socket_path();
    let config = old.config.clone();
    drop(old.handle);

    // THEN: The newer primary's socket is still there and still answers
    assert!(path.exists());
    assert_eq!(newer.state(), ServerState::Listening);
    assert!(LocalClient::connect(&config.name).await.is_ok());

    // AND: The newer primary still cleans up after itself
    drop(newer);
    assert!(!path.exists());
}
