//! Connection facade: one object per trading account that keeps the local
//! replica synchronized and exposes the trading and query surface.
//!
//! The facade aggregates the terminal state, history storage and health
//! monitor, registers them (and itself) as synchronization listeners with the
//! transport, and owns two retrying tasks: the per-replica synchronize loop
//! driven by `on_connected`, and the subscribe loop driven by reconnects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::app::config::ConnectionOptions;
use crate::app::registry::ConnectionRegistry;
use crate::app::subscribe::SubscribeRetryState;
use crate::app::sync::{random_synchronization_id, InstanceSyncState, SyncStateMap};
use crate::core::cache::TerminalState;
use crate::core::domain::{
    AccountHandle, AccountInformation, Deal, MarketTradeOptions, Order, PendingTradeOptions,
    Position, SymbolSpecification, TradeRequest, TradeResponse,
};
use crate::core::service::{ConnectionHealthMonitor, HealthSource};
use crate::core::store::HistoryStorage;
use crate::core::transport::{ReconnectListener, SynchronizationListener, TerminalTransport};
use crate::error::{Error, Result};

/// Options of one `wait_synchronized` call. Unset fields fall back to the
/// connection's [`ConnectionOptions`] defaults.
#[derive(Debug, Clone, Default)]
pub struct WaitSynchronizedOptions {
    /// Restrict the wait to one replica.
    pub instance_index: Option<u32>,
    /// Wait for a specific synchronization id instead of the latest.
    pub synchronization_id: Option<String>,
    pub timeout_in_seconds: Option<u64>,
    pub interval_in_milliseconds: Option<u64>,
    /// Server-side application pattern; derived from the account's
    /// application tag when unset.
    pub application_pattern: Option<String>,
}

/// A consumer's connection to one trading account.
pub struct TerminalConnection {
    account: AccountHandle,
    transport: Arc<dyn TerminalTransport>,
    options: ConnectionOptions,
    history_start_time: Option<DateTime<Utc>>,
    terminal_state: Arc<TerminalState>,
    history_storage: Arc<dyn HistoryStorage>,
    storage_listener: Arc<dyn SynchronizationListener>,
    health_monitor: Arc<ConnectionHealthMonitor>,
    sync_states: SyncStateMap,
    subscribe_retry: SubscribeRetryState,
    subscriptions: DashSet<String>,
    registry: Mutex<Option<Weak<ConnectionRegistry>>>,
    closed: AtomicBool,
    self_ref: Weak<TerminalConnection>,
}

impl TerminalConnection {
    /// Build a connection bound to the transport and register its listeners.
    ///
    /// The health monitor starts sampling immediately; call
    /// [`initialize`](Self::initialize) before use and
    /// [`close`](Self::close) when done.
    pub fn new<S>(
        transport: Arc<dyn TerminalTransport>,
        account: AccountHandle,
        history_storage: Arc<S>,
        history_start_time: Option<DateTime<Utc>>,
        options: ConnectionOptions,
    ) -> Arc<Self>
    where
        S: HistoryStorage + 'static,
    {
        let terminal_state = Arc::new(TerminalState::new());
        let storage_listener: Arc<dyn SynchronizationListener> = history_storage.clone();
        let connection = Arc::new_cyclic(|self_ref: &Weak<Self>| {
            let health_source: Weak<dyn HealthSource> = self_ref.clone();
            Self {
                account,
                transport: transport.clone(),
                options,
                history_start_time,
                terminal_state: terminal_state.clone(),
                history_storage,
                storage_listener,
                health_monitor: Arc::new(ConnectionHealthMonitor::new(health_source)),
                sync_states: SyncStateMap::new(),
                subscribe_retry: SubscribeRetryState::new(),
                subscriptions: DashSet::new(),
                registry: Mutex::new(None),
                closed: AtomicBool::new(false),
                self_ref: self_ref.clone(),
            }
        });

        let account_id = connection.account.id();
        transport.add_synchronization_listener(account_id, connection.clone());
        transport.add_synchronization_listener(account_id, connection.terminal_state.clone());
        transport.add_synchronization_listener(account_id, connection.storage_listener.clone());
        transport.add_synchronization_listener(account_id, connection.health_monitor.clone());
        transport.add_reconnect_listener(connection.clone());
        connection.health_monitor.start();
        connection
    }

    pub(crate) fn attach_registry(&self, registry: Weak<ConnectionRegistry>) {
        *self.registry.lock() = Some(registry);
    }

    #[must_use]
    pub fn account(&self) -> &AccountHandle {
        &self.account
    }

    #[must_use]
    pub fn terminal_state(&self) -> &Arc<TerminalState> {
        &self.terminal_state
    }

    #[must_use]
    pub fn history_storage(&self) -> &Arc<dyn HistoryStorage> {
        &self.history_storage
    }

    #[must_use]
    pub fn health_monitor(&self) -> &Arc<ConnectionHealthMonitor> {
        &self.health_monitor
    }

    #[must_use]
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// True while the subscribe retry loop is running.
    #[must_use]
    pub fn is_subscribing(&self) -> bool {
        self.subscribe_retry.is_subscribing()
    }

    /// True when any replica reached a synchronized state.
    #[must_use]
    pub fn synchronized(&self) -> bool {
        self.sync_states.any_synchronized()
    }

    /// True when orders and deals both finished synchronizing, for the given
    /// replica (or any) and the given synchronization id (or the latest).
    #[must_use]
    pub fn is_synchronized(
        &self,
        instance_index: Option<u32>,
        synchronization_id: Option<&str>,
    ) -> bool {
        self.sync_states
            .is_synchronized(instance_index, synchronization_id)
    }

    /// Prepare the connection's history storage.
    pub async fn initialize(&self) -> Result<()> {
        self.history_storage.initialize().await
    }

    /// Subscribe loop: ask the server to stream the account, retrying with
    /// exponential backoff until a connection event or `close` stops it.
    ///
    /// Only one loop runs at a time; a second call returns immediately.
    pub async fn subscribe(&self) {
        if !self.subscribe_retry.begin() {
            return;
        }
        self.subscribe_retry.request_retry();
        let mut delay = self.options.subscribe_retry_interval();
        let cap = self.options.subscribe_retry_cap();
        while self.subscribe_retry.should_retry() && !self.closed() {
            if let Err(error) = self.transport.subscribe(self.account.id()).await {
                debug!(
                    account_id = %self.account.id(),
                    error = %error,
                    "subscribe attempt failed, will retry"
                );
            }
            if !self.subscribe_retry.wait(delay).await {
                break;
            }
            delay = (delay * 2).min(cap);
        }
        self.subscribe_retry.end();
    }

    /// Record the symbol and ask the terminal to stream its market data.
    pub async fn subscribe_to_market_data(&self, symbol: &str, instance_index: u32) -> Result<()> {
        self.subscriptions.insert(symbol.to_string());
        self.transport
            .subscribe_to_market_data(self.account.id(), instance_index, symbol)
            .await
    }

    /// Ask the terminal to stop streaming the symbol's market data.
    pub async fn unsubscribe_from_market_data(
        &self,
        symbol: &str,
        instance_index: u32,
    ) -> Result<()> {
        self.subscriptions.insert(symbol.to_string());
        self.transport
            .unsubscribe_from_market_data(self.account.id(), instance_index, symbol)
            .await
    }

    /// Symbols with a recorded market-data subscription.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.subscriptions
            .iter()
            .map(|symbol| symbol.key().clone())
            .collect()
    }

    /// Block until the local replica reports synchronized, then wait
    /// server-side for the matching applications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] naming the account and the relevant
    /// synchronization id when the deadline passes first.
    pub async fn wait_synchronized(&self, options: WaitSynchronizedOptions) -> Result<()> {
        let timeout = Duration::from_secs(
            options
                .timeout_in_seconds
                .unwrap_or(self.options.wait_synchronized_timeout_in_seconds),
        );
        let interval = Duration::from_millis(
            options
                .interval_in_milliseconds
                .unwrap_or(self.options.wait_synchronized_interval_in_milliseconds),
        );
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.is_synchronized(options.instance_index, options.synchronization_id.as_deref())
            {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                let synchronization_id = options
                    .synchronization_id
                    .clone()
                    .or_else(|| {
                        self.sync_states
                            .relevant_synchronization_id(options.instance_index)
                    })
                    .unwrap_or_else(|| "none".to_string());
                return Err(Error::Timeout(format!(
                    "waiting for account {} to synchronize, synchronization id {}",
                    self.account.id(),
                    synchronization_id
                )));
            }
            tokio::time::sleep(interval).await;
        }

        let application_pattern = options.application_pattern.unwrap_or_else(|| {
            if self.account.application() == "CopyFactory" {
                "CopyFactory.*|RPC".to_string()
            } else {
                "RPC".to_string()
            }
        });
        let time_left = deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .as_secs_f64();
        self.transport
            .wait_synchronized(
                self.account.id(),
                options.instance_index,
                &application_pattern,
                time_left,
            )
            .await
    }

    /// Send a synchronize request for one replica, resuming history from the
    /// latest recorded timestamps.
    async fn synchronize(&self, instance_index: u32) -> Result<()> {
        let history_start = self.history_start_time.unwrap_or(DateTime::UNIX_EPOCH);
        let starting_history_order_time = self
            .history_storage
            .last_history_order_time(instance_index)
            .await?
            .max(history_start);
        let starting_deal_time = self
            .history_storage
            .last_deal_time(instance_index)
            .await?
            .max(history_start);
        let synchronization_id = random_synchronization_id();
        self.sync_states.with_state(instance_index, |state| {
            state.last_synchronization_id = Some(synchronization_id.clone());
        });
        debug!(
            account_id = %self.account.id(),
            instance_index,
            synchronization_id = %synchronization_id,
            "requesting synchronization"
        );
        self.transport
            .synchronize(
                self.account.id(),
                instance_index,
                &synchronization_id,
                starting_history_order_time,
                starting_deal_time,
            )
            .await
    }

    async fn synchronize_and_restore_subscriptions(&self, instance_index: u32) -> Result<()> {
        self.synchronize(instance_index).await?;
        for symbol in self.subscribed_symbols() {
            self.transport
                .subscribe_to_market_data(self.account.id(), instance_index, &symbol)
                .await?;
        }
        Ok(())
    }

    /// Retry loop of one synchronization attempt. The `key` token keeps the
    /// loop honest: if a newer attempt (or a disconnect) replaces the token,
    /// this loop abandons itself without touching the state.
    async fn ensure_synchronized(&self, instance_index: u32, key: &str) {
        let initial = self.options.synchronization_retry_interval_in_seconds;
        let cap = self.options.synchronization_retry_cap_in_seconds;
        loop {
            match self.synchronize_and_restore_subscriptions(instance_index).await {
                Ok(()) => {
                    self.sync_states.with_state(instance_index, |state| {
                        state.synchronized = true;
                        state.retry_interval_in_seconds = initial;
                    });
                    info!(
                        account_id = %self.account.id(),
                        instance_index,
                        "synchronization request accepted"
                    );
                    return;
                }
                Err(error) => {
                    warn!(
                        account_id = %self.account.id(),
                        instance_index,
                        error = %error,
                        "synchronization attempt failed"
                    );
                    let delay = self.sync_states.with_state(instance_index, |state| {
                        if state.should_synchronize.as_deref() == Some(key) {
                            let delay = state.retry_interval_in_seconds;
                            state.retry_interval_in_seconds = (delay * 2).min(cap);
                            Some(delay)
                        } else {
                            None
                        }
                    });
                    let Some(delay) = delay else {
                        return;
                    };
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    let abandoned = self
                        .sync_states
                        .read_state(instance_index, |state| {
                            state.should_synchronize.as_deref() != Some(key)
                        })
                        .unwrap_or(true);
                    if abandoned {
                        return;
                    }
                }
            }
        }
    }

    /// Execute a validated trade command.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for malformed requests, [`Error::Trade`] when the
    /// terminal rejects the command, [`Error::Transport`] on delivery failure.
    pub async fn trade(&self, request: TradeRequest) -> Result<TradeResponse> {
        request.validate()?;
        self.transport.trade(self.account.id(), request).await
    }

    pub async fn create_market_buy_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::MarketBuy {
            symbol: symbol.into(),
            volume,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn create_market_sell_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::MarketSell {
            symbol: symbol.into(),
            volume,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn create_limit_buy_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::BuyLimit {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn create_limit_sell_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::SellLimit {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn create_stop_buy_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::BuyStop {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn create_stop_sell_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::SellStop {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_stop_limit_buy_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_limit_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::BuyStopLimit {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_limit_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_stop_limit_sell_order(
        &self,
        symbol: impl Into<String>,
        volume: Decimal,
        open_price: Decimal,
        stop_limit_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        options: PendingTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::SellStopLimit {
            symbol: symbol.into(),
            volume,
            open_price,
            stop_limit_price,
            stop_loss,
            take_profit,
            options,
        })
        .await
    }

    pub async fn modify_position(
        &self,
        position_id: impl Into<String>,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::ModifyPosition {
            position_id: position_id.into(),
            stop_loss,
            take_profit,
        })
        .await
    }

    pub async fn close_position_partially(
        &self,
        position_id: impl Into<String>,
        volume: Decimal,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::PartialClosePosition {
            position_id: position_id.into(),
            volume,
            options,
        })
        .await
    }

    pub async fn close_position(
        &self,
        position_id: impl Into<String>,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::ClosePosition {
            position_id: position_id.into(),
            options,
        })
        .await
    }

    pub async fn close_by(
        &self,
        position_id: impl Into<String>,
        close_by_position_id: impl Into<String>,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::CloseBy {
            position_id: position_id.into(),
            close_by_position_id: close_by_position_id.into(),
            options,
        })
        .await
    }

    pub async fn close_positions_by_symbol(
        &self,
        symbol: impl Into<String>,
        options: MarketTradeOptions,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::ClosePositionsBySymbol {
            symbol: symbol.into(),
            options,
        })
        .await
    }

    pub async fn modify_order(
        &self,
        order_id: impl Into<String>,
        open_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<TradeResponse> {
        self.trade(TradeRequest::ModifyOrder {
            order_id: order_id.into(),
            open_price,
            stop_loss,
            take_profit,
        })
        .await
    }

    pub async fn cancel_order(&self, order_id: impl Into<String>) -> Result<TradeResponse> {
        self.trade(TradeRequest::CancelOrder {
            order_id: order_id.into(),
        })
        .await
    }

    pub async fn account_information(&self) -> Result<AccountInformation> {
        self.transport
            .get_account_information(self.account.id())
            .await
    }

    pub async fn positions(&self) -> Result<Vec<Position>> {
        self.transport.get_positions(self.account.id()).await
    }

    pub async fn position(&self, position_id: &str) -> Result<Position> {
        self.transport
            .get_position(self.account.id(), position_id)
            .await
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.transport.get_orders(self.account.id()).await
    }

    pub async fn order(&self, order_id: &str) -> Result<Order> {
        self.transport.get_order(self.account.id(), order_id).await
    }

    pub async fn history_orders_by_ticket(&self, ticket: &str) -> Result<Vec<Order>> {
        self.transport
            .get_history_orders_by_ticket(self.account.id(), ticket)
            .await
    }

    pub async fn history_orders_by_position(&self, position_id: &str) -> Result<Vec<Order>> {
        self.transport
            .get_history_orders_by_position(self.account.id(), position_id)
            .await
    }

    pub async fn history_orders_by_time_range(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Order>> {
        self.transport
            .get_history_orders_by_time_range(self.account.id(), start_time, end_time, offset, limit)
            .await
    }

    pub async fn deals_by_ticket(&self, ticket: &str) -> Result<Vec<Deal>> {
        self.transport
            .get_deals_by_ticket(self.account.id(), ticket)
            .await
    }

    pub async fn deals_by_position(&self, position_id: &str) -> Result<Vec<Deal>> {
        self.transport
            .get_deals_by_position(self.account.id(), position_id)
            .await
    }

    pub async fn deals_by_time_range(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Deal>> {
        self.transport
            .get_deals_by_time_range(self.account.id(), start_time, end_time, offset, limit)
            .await
    }

    /// Clear local history storage, then the server-side history.
    pub async fn remove_history(&self, application: Option<&str>) -> Result<()> {
        self.history_storage.clear().await?;
        self.transport
            .remove_history(self.account.id(), application)
            .await
    }

    /// Clear local history storage, then all server-side application state.
    pub async fn remove_application(&self) -> Result<()> {
        self.history_storage.clear().await?;
        self.transport.remove_application(self.account.id()).await
    }

    /// Report uptime statistics to the server.
    pub async fn save_uptime(&self, uptime: HashMap<String, f64>) -> Result<()> {
        self.transport.save_uptime(self.account.id(), uptime).await
    }

    /// Close the connection: stop retry loops, unsubscribe, detach listeners
    /// and monitoring. Idempotent; in-flight transport calls are not aborted.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(account_id = %self.account.id(), "closing connection");
        self.subscribe_retry.stop_retrying();
        let unsubscribed = self.transport.unsubscribe(self.account.id()).await;
        if let Err(error) = &unsubscribed {
            warn!(
                account_id = %self.account.id(),
                error = %error,
                "unsubscribe failed during close"
            );
        }

        let account_id = self.account.id();
        let terminal_listener: Arc<dyn SynchronizationListener> = self.terminal_state.clone();
        let health_listener: Arc<dyn SynchronizationListener> = self.health_monitor.clone();
        self.transport
            .remove_synchronization_listener(account_id, &terminal_listener);
        self.transport
            .remove_synchronization_listener(account_id, &self.storage_listener);
        self.transport
            .remove_synchronization_listener(account_id, &health_listener);
        if let Some(this) = self.self_ref.upgrade() {
            let own_listener: Arc<dyn SynchronizationListener> = this.clone();
            let reconnect_listener: Arc<dyn ReconnectListener> = this;
            self.transport
                .remove_synchronization_listener(account_id, &own_listener);
            self.transport.remove_reconnect_listener(&reconnect_listener);
        }

        if let Some(registry) = self.registry.lock().take() {
            if let Some(registry) = registry.upgrade() {
                registry.remove(account_id);
            }
        }
        self.health_monitor.stop();
        unsubscribed
    }
}

#[async_trait]
impl SynchronizationListener for TerminalConnection {
    /// A replica connected: claim a fresh synchronization token and drive the
    /// synchronize loop to completion, then drop states of replicas that no
    /// longer exist.
    async fn on_connected(&self, instance_index: u32, replicas: u32) -> Result<()> {
        self.subscribe_retry.stop_retrying();
        let key = random_synchronization_id();
        let initial = self.options.synchronization_retry_interval_in_seconds;
        self.sync_states.with_state(instance_index, |state| {
            state.should_synchronize = Some(key.clone());
            state.retry_interval_in_seconds = initial;
            state.synchronized = false;
        });
        self.ensure_synchronized(instance_index, &key).await;
        self.sync_states.retain_below(replicas);
        Ok(())
    }

    async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        debug!(
            account_id = %self.account.id(),
            instance_index,
            "replica disconnected"
        );
        self.sync_states
            .with_state(instance_index, InstanceSyncState::record_disconnect);
        Ok(())
    }

    async fn on_deal_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        self.sync_states.with_state(instance_index, |state| {
            state.deals_synchronized.insert(synchronization_id.to_string());
        });
        Ok(())
    }

    async fn on_order_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        self.sync_states.with_state(instance_index, |state| {
            state
                .orders_synchronized
                .insert(synchronization_id.to_string());
        });
        Ok(())
    }
}

#[async_trait]
impl ReconnectListener for TerminalConnection {
    async fn on_reconnected(&self) -> Result<()> {
        debug!(account_id = %self.account.id(), "transport reconnected");
        self.subscribe_retry.cancel_wait();
        if let Some(connection) = self.self_ref.upgrade() {
            tokio::spawn(async move {
                connection.subscribe().await;
            });
        }
        Ok(())
    }
}

impl HealthSource for TerminalConnection {
    fn connected(&self) -> bool {
        self.terminal_state.connected()
    }

    fn connected_to_broker(&self) -> bool {
        self.terminal_state.connected_to_broker()
    }

    fn synchronized(&self) -> bool {
        self.sync_states.any_synchronized()
    }

    fn subscribed_symbols(&self) -> Vec<String> {
        TerminalConnection::subscribed_symbols(self)
    }

    fn specification(&self, symbol: &str) -> Option<SymbolSpecification> {
        self.terminal_state.specification(symbol)
    }
}
