//! Scripted [`TerminalTransport`] implementation for tests.
//!
//! Each fallible call pops the next result from its queue (defaulting to
//! success when exhausted, except data queries which need scripted payloads)
//! and records itself for assertions. Listener events are fired through the
//! `emit_*` helpers, which dispatch to the registered listeners exactly like
//! a real transport delivering ordered frames.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::core::domain::{
    AccountInformation, Deal, Order, Position, SymbolPrice, TradeRequest, TradeResponse,
};
use crate::core::transport::{ReconnectListener, SynchronizationListener, TerminalTransport};
use crate::error::{Error, Result};

/// One recorded transport invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Subscribe {
        account_id: String,
    },
    Unsubscribe {
        account_id: String,
    },
    Reconnect {
        account_id: String,
    },
    Synchronize {
        account_id: String,
        instance_index: u32,
        synchronization_id: String,
        starting_history_order_time: DateTime<Utc>,
        starting_deal_time: DateTime<Utc>,
    },
    WaitSynchronized {
        account_id: String,
        instance_index: Option<u32>,
        application_pattern: String,
    },
    SubscribeToMarketData {
        account_id: String,
        instance_index: u32,
        symbol: String,
    },
    UnsubscribeFromMarketData {
        account_id: String,
        instance_index: u32,
        symbol: String,
    },
    Trade {
        account_id: String,
        request: TradeRequest,
    },
    RemoveHistory {
        account_id: String,
        application: Option<String>,
    },
    RemoveApplication {
        account_id: String,
    },
    SaveUptime {
        account_id: String,
        uptime: HashMap<String, f64>,
    },
}

/// Scripted mock of the terminal transport.
#[derive(Default)]
pub struct MockTransport {
    sync_listeners: RwLock<HashMap<String, Vec<Arc<dyn SynchronizationListener>>>>,
    reconnect_listeners: RwLock<Vec<Arc<dyn ReconnectListener>>>,
    subscribe_results: Mutex<VecDeque<Result<()>>>,
    synchronize_results: Mutex<VecDeque<Result<()>>>,
    wait_synchronized_results: Mutex<VecDeque<Result<()>>>,
    trade_results: Mutex<VecDeque<Result<TradeResponse>>>,
    account_information_results: Mutex<VecDeque<Result<AccountInformation>>>,
    positions_results: Mutex<VecDeque<Result<Vec<Position>>>>,
    orders_results: Mutex<VecDeque<Result<Vec<Order>>>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_subscribe_result(&self, result: Result<()>) {
        self.subscribe_results.lock().push_back(result);
    }

    pub fn push_synchronize_result(&self, result: Result<()>) {
        self.synchronize_results.lock().push_back(result);
    }

    pub fn push_wait_synchronized_result(&self, result: Result<()>) {
        self.wait_synchronized_results.lock().push_back(result);
    }

    pub fn push_trade_result(&self, result: Result<TradeResponse>) {
        self.trade_results.lock().push_back(result);
    }

    pub fn push_account_information_result(&self, result: Result<AccountInformation>) {
        self.account_information_results.lock().push_back(result);
    }

    pub fn push_positions_result(&self, result: Result<Vec<Position>>) {
        self.positions_results.lock().push_back(result);
    }

    pub fn push_orders_result(&self, result: Result<Vec<Order>>) {
        self.orders_results.lock().push_back(result);
    }

    /// Every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Number of `subscribe` calls recorded for the account.
    #[must_use]
    pub fn subscribe_count(&self, account_id: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| {
                matches!(call, TransportCall::Subscribe { account_id: id } if id == account_id)
            })
            .count()
    }

    /// All recorded `synchronize` calls.
    #[must_use]
    pub fn synchronize_calls(&self) -> Vec<TransportCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, TransportCall::Synchronize { .. }))
            .cloned()
            .collect()
    }

    /// Synchronization id of the most recent `synchronize` call.
    #[must_use]
    pub fn last_synchronization_id(&self) -> Option<String> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            TransportCall::Synchronize {
                synchronization_id, ..
            } => Some(synchronization_id.clone()),
            _ => None,
        })
    }

    /// Number of synchronization listeners registered for the account.
    #[must_use]
    pub fn sync_listener_count(&self, account_id: &str) -> usize {
        self.sync_listeners
            .read()
            .get(account_id)
            .map_or(0, Vec::len)
    }

    /// Number of registered reconnect listeners.
    #[must_use]
    pub fn reconnect_listener_count(&self) -> usize {
        self.reconnect_listeners.read().len()
    }

    fn listeners_for(&self, account_id: &str) -> Vec<Arc<dyn SynchronizationListener>> {
        self.sync_listeners
            .read()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }

    /// Deliver `on_connected` to the account's listeners.
    pub async fn emit_connected(
        &self,
        account_id: &str,
        instance_index: u32,
        replicas: u32,
    ) -> Result<()> {
        for listener in self.listeners_for(account_id) {
            listener.on_connected(instance_index, replicas).await?;
        }
        Ok(())
    }

    /// Deliver `on_disconnected` to the account's listeners.
    pub async fn emit_disconnected(&self, account_id: &str, instance_index: u32) -> Result<()> {
        for listener in self.listeners_for(account_id) {
            listener.on_disconnected(instance_index).await?;
        }
        Ok(())
    }

    /// Deliver `on_order_synchronization_finished` to the account's listeners.
    pub async fn emit_order_synchronization_finished(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        for listener in self.listeners_for(account_id) {
            listener
                .on_order_synchronization_finished(instance_index, synchronization_id)
                .await?;
        }
        Ok(())
    }

    /// Deliver `on_deal_synchronization_finished` to the account's listeners.
    pub async fn emit_deal_synchronization_finished(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        for listener in self.listeners_for(account_id) {
            listener
                .on_deal_synchronization_finished(instance_index, synchronization_id)
                .await?;
        }
        Ok(())
    }

    /// Deliver `on_symbol_price_updated` to the account's listeners.
    pub async fn emit_symbol_price_updated(
        &self,
        account_id: &str,
        instance_index: u32,
        price: SymbolPrice,
    ) -> Result<()> {
        for listener in self.listeners_for(account_id) {
            listener
                .on_symbol_price_updated(instance_index, price.clone())
                .await?;
        }
        Ok(())
    }

    /// Deliver `on_reconnected` to the registered reconnect listeners.
    pub async fn emit_reconnected(&self) -> Result<()> {
        let listeners = self.reconnect_listeners.read().clone();
        for listener in listeners {
            listener.on_reconnected().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TerminalTransport for MockTransport {
    async fn subscribe(&self, account_id: &str) -> Result<()> {
        self.record(TransportCall::Subscribe {
            account_id: account_id.to_string(),
        });
        self.subscribe_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn unsubscribe(&self, account_id: &str) -> Result<()> {
        self.record(TransportCall::Unsubscribe {
            account_id: account_id.to_string(),
        });
        Ok(())
    }

    async fn reconnect(&self, account_id: &str) -> Result<()> {
        self.record(TransportCall::Reconnect {
            account_id: account_id.to_string(),
        });
        Ok(())
    }

    async fn synchronize(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
        starting_history_order_time: DateTime<Utc>,
        starting_deal_time: DateTime<Utc>,
    ) -> Result<()> {
        self.record(TransportCall::Synchronize {
            account_id: account_id.to_string(),
            instance_index,
            synchronization_id: synchronization_id.to_string(),
            starting_history_order_time,
            starting_deal_time,
        });
        self.synchronize_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn wait_synchronized(
        &self,
        account_id: &str,
        instance_index: Option<u32>,
        application_pattern: &str,
        _timeout_in_seconds: f64,
    ) -> Result<()> {
        self.record(TransportCall::WaitSynchronized {
            account_id: account_id.to_string(),
            instance_index,
            application_pattern: application_pattern.to_string(),
        });
        self.wait_synchronized_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn subscribe_to_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()> {
        self.record(TransportCall::SubscribeToMarketData {
            account_id: account_id.to_string(),
            instance_index,
            symbol: symbol.to_string(),
        });
        Ok(())
    }

    async fn unsubscribe_from_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()> {
        self.record(TransportCall::UnsubscribeFromMarketData {
            account_id: account_id.to_string(),
            instance_index,
            symbol: symbol.to_string(),
        });
        Ok(())
    }

    async fn trade(&self, account_id: &str, request: TradeRequest) -> Result<TradeResponse> {
        self.record(TransportCall::Trade {
            account_id: account_id.to_string(),
            request,
        });
        self.trade_results.lock().pop_front().unwrap_or_else(|| {
            Ok(TradeResponse {
                numeric_code: 10009,
                string_code: "TRADE_RETCODE_DONE".to_string(),
                message: "Request completed".to_string(),
                order_id: Some("1".to_string()),
                position_id: None,
            })
        })
    }

    async fn get_account_information(&self, _account_id: &str) -> Result<AccountInformation> {
        self.account_information_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport("no scripted accountInformation response")))
    }

    async fn get_positions(&self, _account_id: &str) -> Result<Vec<Position>> {
        self.positions_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport("no scripted positions response")))
    }

    async fn get_position(&self, _account_id: &str, _position_id: &str) -> Result<Position> {
        Err(Error::transport("no scripted position response"))
    }

    async fn get_orders(&self, _account_id: &str) -> Result<Vec<Order>> {
        self.orders_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport("no scripted orders response")))
    }

    async fn get_order(&self, _account_id: &str, _order_id: &str) -> Result<Order> {
        Err(Error::transport("no scripted order response"))
    }

    async fn get_history_orders_by_ticket(
        &self,
        _account_id: &str,
        _ticket: &str,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_history_orders_by_position(
        &self,
        _account_id: &str,
        _position_id: &str,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_history_orders_by_time_range(
        &self,
        _account_id: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_ticket(&self, _account_id: &str, _ticket: &str) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_position(
        &self,
        _account_id: &str,
        _position_id: &str,
    ) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_time_range(
        &self,
        _account_id: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn remove_history(&self, account_id: &str, application: Option<&str>) -> Result<()> {
        self.record(TransportCall::RemoveHistory {
            account_id: account_id.to_string(),
            application: application.map(str::to_string),
        });
        Ok(())
    }

    async fn remove_application(&self, account_id: &str) -> Result<()> {
        self.record(TransportCall::RemoveApplication {
            account_id: account_id.to_string(),
        });
        Ok(())
    }

    async fn save_uptime(&self, account_id: &str, uptime: HashMap<String, f64>) -> Result<()> {
        self.record(TransportCall::SaveUptime {
            account_id: account_id.to_string(),
            uptime,
        });
        Ok(())
    }

    fn add_synchronization_listener(
        &self,
        account_id: &str,
        listener: Arc<dyn SynchronizationListener>,
    ) {
        self.sync_listeners
            .write()
            .entry(account_id.to_string())
            .or_default()
            .push(listener);
    }

    fn remove_synchronization_listener(
        &self,
        account_id: &str,
        listener: &Arc<dyn SynchronizationListener>,
    ) {
        if let Some(listeners) = self.sync_listeners.write().get_mut(account_id) {
            listeners.retain(|registered| !Arc::ptr_eq(registered, listener));
        }
    }

    fn add_reconnect_listener(&self, listener: Arc<dyn ReconnectListener>) {
        self.reconnect_listeners.write().push(listener);
    }

    fn remove_reconnect_listener(&self, listener: &Arc<dyn ReconnectListener>) {
        self.reconnect_listeners
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }
}
