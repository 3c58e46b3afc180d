use crate::helpers::{start_test_server, wait_for_applied, wait_for_connections};

use server_core::client::LocalClient;
use server_core::proxy::{ProxyConfig, ProxyKind};

use std::time::Duration;

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// **VALUE**: Verifies the secondary-to-primary `set_proxy` path over a real socket.
///
/// **WHY THIS MATTERS**: A proxy link opened in a second launch must end up in the
/// primary's settings.
///
/// **BUG THIS CATCHES**: Would catch a server that accepts but never dispatches, decodes
/// params wrongly, or answers a command that must stay unanswered.
#[tokio::test]
async fn given_client_when_set_proxy_sent_then_store_applies_it_and_nothing_is_answered() {
    // GIVEN: A server and a connected client
    let server = start_test_server().await;
    let mut client = LocalClient::connect(&server.config.name).await.unwrap();

    // WHEN: The client forwards a proxy
    client
        .set_proxy(
            "1",
            json!({"protocol": "socks5", "host": "proxy.example", "port": 1080, "user": "u", "password": "p"}),
        )
        .await
        .expect("Send should succeed");

    // THEN: The store received exactly that proxy
    assert!(wait_for_applied(&server.store, 1).await);
    assert_eq!(
        server.store.applied(),
        vec![ProxyConfig::new(ProxyKind::Socks5, "proxy.example", 1080, "u", "p").unwrap()]
    );

    // AND: No response comes back
    let reply = tokio::time::timeout(Duration::from_millis(200), client.recv()).await;
    assert!(reply.is_err(), "set_proxy must not be answered");
}

/// **VALUE**: Verifies that garbage from a peer is survived.
///
/// **WHY THIS MATTERS**: Anything on the machine can connect to the socket.
///
/// **BUG THIS CATCHES**: Would catch a decode failure that kills the control task or drops
/// the connection that sent it.
#[tokio::test]
async fn given_malformed_delivery_when_followed_by_valid_command_then_valid_command_applies() {
    // GIVEN: A raw connection
    let server = start_test_server().await;
    let mut raw = UnixStream::connect(server.socket_path()).await.unwrap();
    assert!(wait_for_connections(&server.handle, 1).await);

    // WHEN: Garbage, then (as a separate delivery) a valid command
    raw.write_all(b"\xff{not json").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    raw.write_all(br#"{"jsonrpc":"2.0","id":"2","method":"set_proxy","params":{"host":"h","port":8080}}"#)
        .await
        .unwrap();

    // THEN: Only the valid command reached the store
    assert!(wait_for_applied(&server.store, 1).await);
    let applied = server.store.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].kind(), ProxyKind::Http);
    assert_eq!(applied[0].host(), "h");
    assert_eq!(server.handle.connection_count().await.unwrap(), 1);
}

/// **VALUE**: Verifies that commands without usable params never reach the store.
///
/// **WHY THIS MATTERS**: An empty `set_proxy` must not clear the user's proxy.
///
/// **BUG THIS CATCHES**: Would catch `{}` params or unknown methods being applied.
#[tokio::test]
async fn given_noop_commands_when_sent_then_store_is_untouched() {
    let server = start_test_server().await;
    let mut client = LocalClient::connect(&server.config.name).await.unwrap();

    client.set_proxy("1", json!({})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.set_proxy("2", json!({"host": "", "port": 1})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Marker: the control task handles deliveries in order
    client.set_proxy("3", json!({"host": "marker", "port": 1})).await.unwrap();

    assert!(wait_for_applied(&server.store, 1).await);
    let applied = server.store.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].host(), "marker");
}

/// **VALUE**: Verifies that data arriving after stop is not dispatched.
///
/// **WHY THIS MATTERS**: A stopped primary is shutting down; it must not mutate settings.
///
/// **BUG THIS CATCHES**: Would catch reader tasks that keep dispatching after stop.
#[tokio::test]
async fn given_stopped_server_when_connected_client_sends_then_nothing_applies() {
    let mut server = start_test_server().await;
    let mut client = LocalClient::connect(&server.config.name).await.unwrap();
    assert!(wait_for_connections(&server.handle, 1).await);

    server.handle.stop();
    // The peer may or may not see the close; either way nothing is applied.
    let _ = client.set_proxy("1", json!({"host": "h", "port": 1})).await;

    assert!(!wait_for_applied(&server.store, 1).await);
}
