//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use termlink::app::{ConnectionOptions, TerminalConnection};
use termlink::core::domain::AccountHandle;
use termlink::core::store::MemoryHistoryStorage;
use termlink::core::transport::TerminalTransport;
use termlink::testkit::MockTransport;

pub const ACCOUNT_ID: &str = "account-1";

pub fn open_connection(transport: &Arc<MockTransport>) -> Arc<TerminalConnection> {
    open_connection_for_application(transport, "MetaApi")
}

pub fn open_connection_for_application(
    transport: &Arc<MockTransport>,
    application: &str,
) -> Arc<TerminalConnection> {
    let (connection, _) = open_connection_with_storage(transport, application);
    connection
}

pub fn open_connection_with_storage(
    transport: &Arc<MockTransport>,
    application: &str,
) -> (Arc<TerminalConnection>, Arc<MemoryHistoryStorage>) {
    let account = AccountHandle::new(ACCOUNT_ID, application).unwrap();
    let storage = Arc::new(MemoryHistoryStorage::new());
    let shared: Arc<dyn TerminalTransport> = transport.clone();
    let connection = TerminalConnection::new(
        shared,
        account,
        storage.clone(),
        None,
        ConnectionOptions::default(),
    );
    (connection, storage)
}
