//! Registry of open connections, one per trading account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::app::config::ConnectionOptions;
use crate::app::connection::TerminalConnection;
use crate::core::domain::AccountHandle;
use crate::core::store::HistoryStorage;
use crate::core::transport::TerminalTransport;
use crate::error::Result;

/// Hands out [`TerminalConnection`]s and keeps at most one open per account.
pub struct ConnectionRegistry {
    transport: Arc<dyn TerminalTransport>,
    options: ConnectionOptions,
    connections: DashMap<String, Arc<TerminalConnection>>,
}

impl ConnectionRegistry {
    /// Create a registry over a shared transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::error::Error::Config) when the
    /// options are inconsistent.
    pub fn new(
        transport: Arc<dyn TerminalTransport>,
        options: ConnectionOptions,
    ) -> Result<Arc<Self>> {
        options.validate()?;
        Ok(Arc::new(Self {
            transport,
            options,
            connections: DashMap::new(),
        }))
    }

    /// Open (or return the already open) connection for the account. A new
    /// connection is initialized and its subscribe loop started in the
    /// background.
    pub async fn connect<S>(
        self: &Arc<Self>,
        account: AccountHandle,
        history_storage: Arc<S>,
        history_start_time: Option<DateTime<Utc>>,
    ) -> Result<Arc<TerminalConnection>>
    where
        S: HistoryStorage + 'static,
    {
        if let Some(existing) = self.connections.get(account.id()) {
            return Ok(existing.clone());
        }
        debug!(account_id = %account.id(), "opening connection");
        let connection = TerminalConnection::new(
            self.transport.clone(),
            account,
            history_storage,
            history_start_time,
            self.options.clone(),
        );
        connection.attach_registry(Arc::downgrade(self));
        connection.initialize().await?;
        self.connections
            .insert(connection.account().id().to_string(), connection.clone());

        let subscriber = connection.clone();
        tokio::spawn(async move {
            subscriber.subscribe().await;
        });
        Ok(connection)
    }

    /// Forget the account's connection. Called by
    /// [`TerminalConnection::close`]; dropping the entry does not close an
    /// open connection.
    pub fn remove(&self, account_id: &str) {
        self.connections.remove(account_id);
    }

    /// The open connection for the account, if any.
    #[must_use]
    pub fn connection(&self, account_id: &str) -> Option<Arc<TerminalConnection>> {
        self.connections
            .get(account_id)
            .map(|connection| connection.clone())
    }

    /// Number of open connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
