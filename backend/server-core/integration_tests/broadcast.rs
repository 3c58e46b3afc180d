use crate::helpers::{WAIT_LIMIT, start_test_server, wait_for_connections};

use server_core::NEW_SERVICE_MESSAGE_METHOD;
use server_core::client::LocalClient;
use server_core::envelope::{Message, Notification};

use serde_json::json;

async fn expect_notification(client: &mut LocalClient) -> Notification {
    let message = tokio::time::timeout(WAIT_LIMIT, client.recv())
        .await
        .expect("Timed out waiting for notification")
        .expect("Read should succeed")
        .expect("Primary should not close the connection");
    match message {
        Message::Notification(notification) => notification,
        other => panic!("Expected notification, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a service message reaches a connected secondary instance.
///
/// **WHY THIS MATTERS**: This is how the primary tells the other instances something new
/// arrived.
///
/// **BUG THIS CATCHES**: Would catch a wrong method name, a missing `message` param, or a
/// notification that carries an `id`.
#[tokio::test]
async fn given_connected_client_when_service_message_broadcast_then_client_receives_it() {
    // GIVEN: One connected client
    let server = start_test_server().await;
    let mut client = LocalClient::connect(&server.config.name).await.unwrap();
    assert!(wait_for_connections(&server.handle, 1).await);

    // WHEN: Broadcasting
    let report = server
        .handle
        .notify_new_service_message("hello")
        .await
        .unwrap();

    // THEN: Delivered once, with the documented shape
    assert_eq!(report.delivered, 1);
    let notification = expect_notification(&mut client).await;
    assert_eq!(notification.method, NEW_SERVICE_MESSAGE_METHOD);
    assert_eq!(notification.params, json!({"message": "hello"}));
}

/// **VALUE**: Verifies fan-out after one client went away.
///
/// **WHY THIS MATTERS**: Secondary instances come and go; one closing must not affect
/// the others.
///
/// **BUG THIS CATCHES**: Would catch a broadcast that stops at a dead peer or still counts it.
#[tokio::test]
async fn given_three_clients_with_one_closed_when_broadcast_then_remaining_two_receive() {
    // GIVEN: Three clients, the middle one closes
    let server = start_test_server().await;
    let mut first = LocalClient::connect(&server.config.name).await.unwrap();
    let second = LocalClient::connect(&server.config.name).await.unwrap();
    let mut third = LocalClient::connect(&server.config.name).await.unwrap();
    assert!(wait_for_connections(&server.handle, 3).await);

    drop(second);
    assert!(wait_for_connections(&server.handle, 2).await);

    // WHEN: Broadcasting
    let report = server
        .handle
        .notify_new_service_message("update")
        .await
        .unwrap();

    // THEN: Both remaining clients got it, nobody failed
    assert_eq!(report.delivered, 2);
    assert!(report.failed.is_empty());
    for client in [&mut first, &mut third] {
        let notification = expect_notification(client).await;
        assert_eq!(notification.params["message"], "update");
    }
}

/// **VALUE**: Verifies that broadcasting with nobody connected succeeds.
///
/// **WHY THIS MATTERS**: The primary usually runs alone.
///
/// **BUG THIS CATCHES**: Would catch an empty registry treated as an error.
#[tokio::test]
async fn given_no_clients_when_broadcast_then_empty_report() {
    let server = start_test_server().await;

    let report = server
        .handle
        .broadcast(Notification::new("anything", json!(null)))
        .await
        .unwrap();

    assert_eq!(report, Default::default());
}
