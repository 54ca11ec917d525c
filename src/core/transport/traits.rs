//! Transport abstraction over the terminal streaming service.
//!
//! The synchronization core never talks to a socket directly; everything goes
//! through [`TerminalTransport`]. Implementations own the wire protocol,
//! serialize frame delivery, and invoke the registered listeners in packet
//! order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::domain::{
    AccountInformation, Deal, Order, Position, TradeRequest, TradeResponse,
};
use crate::core::transport::{ReconnectListener, SynchronizationListener};
use crate::error::Result;

/// Outbound interface of the terminal streaming service.
///
/// One transport is shared by every connection; calls are keyed by account id.
/// All methods suspend until the server acknowledges the request or the call
/// fails with [`Error::Transport`](crate::error::Error::Transport).
#[async_trait]
pub trait TerminalTransport: Send + Sync {
    /// Ask the server to start streaming events for the account.
    async fn subscribe(&self, account_id: &str) -> Result<()>;

    /// Stop streaming events for the account.
    async fn unsubscribe(&self, account_id: &str) -> Result<()>;

    /// Force the transport to re-establish its connection for the account.
    async fn reconnect(&self, account_id: &str) -> Result<()>;

    /// Request a state synchronization for one replica, replaying history
    /// from the given starting points.
    async fn synchronize(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
        starting_history_order_time: DateTime<Utc>,
        starting_deal_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Wait server-side until applications matching the pattern have
    /// synchronized, bounded by the given timeout.
    async fn wait_synchronized(
        &self,
        account_id: &str,
        instance_index: Option<u32>,
        application_pattern: &str,
        timeout_in_seconds: f64,
    ) -> Result<()>;

    async fn subscribe_to_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()>;

    async fn unsubscribe_from_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()>;

    /// Execute a trade command.
    ///
    /// # Errors
    ///
    /// Non-success results surface as [`Error::Trade`](crate::error::Error::Trade)
    /// and are passed through to the caller unchanged.
    async fn trade(&self, account_id: &str, request: TradeRequest) -> Result<TradeResponse>;

    async fn get_account_information(&self, account_id: &str) -> Result<AccountInformation>;

    async fn get_positions(&self, account_id: &str) -> Result<Vec<Position>>;

    async fn get_position(&self, account_id: &str, position_id: &str) -> Result<Position>;

    async fn get_orders(&self, account_id: &str) -> Result<Vec<Order>>;

    async fn get_order(&self, account_id: &str, order_id: &str) -> Result<Order>;

    async fn get_history_orders_by_ticket(
        &self,
        account_id: &str,
        ticket: &str,
    ) -> Result<Vec<Order>>;

    async fn get_history_orders_by_position(
        &self,
        account_id: &str,
        position_id: &str,
    ) -> Result<Vec<Order>>;

    async fn get_history_orders_by_time_range(
        &self,
        account_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Order>>;

    async fn get_deals_by_ticket(&self, account_id: &str, ticket: &str) -> Result<Vec<Deal>>;

    async fn get_deals_by_position(
        &self,
        account_id: &str,
        position_id: &str,
    ) -> Result<Vec<Deal>>;

    async fn get_deals_by_time_range(
        &self,
        account_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Deal>>;

    /// Wipe server-side history for the account, optionally scoped to one
    /// application.
    async fn remove_history(&self, account_id: &str, application: Option<&str>) -> Result<()>;

    /// Wipe all server-side state recorded for the calling application.
    async fn remove_application(&self, account_id: &str) -> Result<()>;

    /// Report measured uptime statistics, keyed by window name.
    async fn save_uptime(&self, account_id: &str, uptime: HashMap<String, f64>) -> Result<()>;

    /// Register a listener for ordered synchronization events of the account.
    fn add_synchronization_listener(
        &self,
        account_id: &str,
        listener: Arc<dyn SynchronizationListener>,
    );

    /// Remove a previously registered listener (matched by identity).
    fn remove_synchronization_listener(
        &self,
        account_id: &str,
        listener: &Arc<dyn SynchronizationListener>,
    );

    /// Register a listener for transport-level reconnects.
    fn add_reconnect_listener(&self, listener: Arc<dyn ReconnectListener>);

    /// Remove a previously registered reconnect listener (matched by identity).
    fn remove_reconnect_listener(&self, listener: &Arc<dyn ReconnectListener>);
}
