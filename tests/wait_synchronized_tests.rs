//! Integration tests for the synchronization barrier.

mod support;

use tokio_test::assert_ok;

use termlink::app::WaitSynchronizedOptions;
use termlink::error::Error;
use termlink::testkit::{MockTransport, TransportCall};

use support::{open_connection, open_connection_for_application, ACCOUNT_ID};

async fn synchronize_replica(transport: &std::sync::Arc<MockTransport>, instance_index: u32) {
    transport
        .emit_connected(ACCOUNT_ID, instance_index, instance_index + 1)
        .await
        .unwrap();
    let synchronization_id = transport.last_synchronization_id().unwrap();
    transport
        .emit_order_synchronization_finished(ACCOUNT_ID, instance_index, &synchronization_id)
        .await
        .unwrap();
    transport
        .emit_deal_synchronization_finished(ACCOUNT_ID, instance_index, &synchronization_id)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn times_out_when_synchronization_never_finishes() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    let error = connection
        .wait_synchronized(WaitSynchronizedOptions {
            timeout_in_seconds: Some(1),
            interval_in_milliseconds: Some(10),
            ..WaitSynchronizedOptions::default()
        })
        .await
        .unwrap_err();

    match error {
        Error::Timeout(message) => assert!(message.contains(ACCOUNT_ID), "message: {message}"),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_polling_interval_still_respects_the_deadline() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    let error = connection
        .wait_synchronized(WaitSynchronizedOptions {
            timeout_in_seconds: Some(1),
            interval_in_milliseconds: Some(0),
            ..WaitSynchronizedOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Timeout(_)));
}

#[tokio::test(start_paused = true)]
async fn timeout_message_names_the_last_synchronization_id() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    transport.emit_connected(ACCOUNT_ID, 0, 1).await.unwrap();
    let synchronization_id = transport.last_synchronization_id().unwrap();

    let error = connection
        .wait_synchronized(WaitSynchronizedOptions {
            timeout_in_seconds: Some(1),
            interval_in_milliseconds: Some(100),
            ..WaitSynchronizedOptions::default()
        })
        .await
        .unwrap_err();

    match error {
        Error::Timeout(message) => {
            assert!(message.contains(&synchronization_id), "message: {message}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_message_falls_back_to_the_disconnected_id() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    transport.emit_connected(ACCOUNT_ID, 0, 1).await.unwrap();
    let synchronization_id = transport.last_synchronization_id().unwrap();
    transport.emit_disconnected(ACCOUNT_ID, 0).await.unwrap();

    let error = connection
        .wait_synchronized(WaitSynchronizedOptions {
            timeout_in_seconds: Some(1),
            interval_in_milliseconds: Some(100),
            ..WaitSynchronizedOptions::default()
        })
        .await
        .unwrap_err();

    match error {
        Error::Timeout(message) => {
            assert!(message.contains(&synchronization_id), "message: {message}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn delegates_the_server_side_wait_once_locally_synchronized() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    synchronize_replica(&transport, 0).await;
    assert_ok!(
        connection
            .wait_synchronized(WaitSynchronizedOptions::default())
            .await
    );

    let delegated = transport.calls().into_iter().find_map(|call| match call {
        TransportCall::WaitSynchronized {
            account_id,
            application_pattern,
            ..
        } => Some((account_id, application_pattern)),
        _ => None,
    });
    let (account_id, application_pattern) = delegated.expect("server-side wait not delegated");
    assert_eq!(account_id, ACCOUNT_ID);
    assert_eq!(application_pattern, "RPC");
}

#[tokio::test(start_paused = true)]
async fn copy_factory_accounts_use_the_wider_application_pattern() {
    let transport = MockTransport::new();
    let connection = open_connection_for_application(&transport, "CopyFactory");

    synchronize_replica(&transport, 0).await;
    assert_ok!(
        connection
            .wait_synchronized(WaitSynchronizedOptions::default())
            .await
    );

    assert!(transport.calls().iter().any(|call| matches!(
        call,
        TransportCall::WaitSynchronized { application_pattern, .. }
            if application_pattern == "CopyFactory.*|RPC"
    )));
}

#[tokio::test(start_paused = true)]
async fn explicit_application_pattern_wins() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    synchronize_replica(&transport, 0).await;
    assert_ok!(
        connection
            .wait_synchronized(WaitSynchronizedOptions {
                application_pattern: Some("MetaApi.*".to_string()),
                ..WaitSynchronizedOptions::default()
            })
            .await
    );

    assert!(transport.calls().iter().any(|call| matches!(
        call,
        TransportCall::WaitSynchronized { application_pattern, .. }
            if application_pattern == "MetaApi.*"
    )));
}

#[tokio::test(start_paused = true)]
async fn wait_scoped_to_an_unsynchronized_replica_times_out() {
    let transport = MockTransport::new();
    let connection = open_connection(&transport);

    synchronize_replica(&transport, 0).await;
    // Replica 0 finished, replica 3 never did.
    let error = connection
        .wait_synchronized(WaitSynchronizedOptions {
            instance_index: Some(3),
            timeout_in_seconds: Some(1),
            interval_in_milliseconds: Some(100),
            ..WaitSynchronizedOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Timeout(_)));
}
