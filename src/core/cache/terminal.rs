//! In-memory replica of the terminal state for one account.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::domain::{
    AccountInformation, Order, Position, SymbolPrice, SymbolSpecification,
};
use crate::core::transport::SynchronizationListener;
use crate::error::Result;

/// Thread-safe replica of account state, updated exclusively by ordered
/// events from the transport. Consumers read snapshots; they never mutate.
#[derive(Default)]
pub struct TerminalState {
    connected: RwLock<HashMap<u32, bool>>,
    connected_to_broker: RwLock<HashMap<u32, bool>>,
    account_information: RwLock<Option<AccountInformation>>,
    positions: RwLock<HashMap<String, Position>>,
    orders: RwLock<HashMap<String, Order>>,
    specifications: RwLock<HashMap<String, SymbolSpecification>>,
    prices: RwLock<HashMap<String, SymbolPrice>>,
}

impl TerminalState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any replica has an established server-side connection.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connected.read().values().any(|connected| *connected)
    }

    /// True if any replica reports an established broker connection.
    #[must_use]
    pub fn connected_to_broker(&self) -> bool {
        self.connected_to_broker
            .read()
            .values()
            .any(|connected| *connected)
    }

    #[must_use]
    pub fn account_information(&self) -> Option<AccountInformation> {
        self.account_information.read().clone()
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.positions.read().values().cloned().collect()
    }

    #[must_use]
    pub fn position(&self, position_id: &str) -> Option<Position> {
        self.positions.read().get(position_id).cloned()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().values().cloned().collect()
    }

    #[must_use]
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.read().get(order_id).cloned()
    }

    #[must_use]
    pub fn specification(&self, symbol: &str) -> Option<SymbolSpecification> {
        self.specifications.read().get(symbol).cloned()
    }

    #[must_use]
    pub fn price(&self, symbol: &str) -> Option<SymbolPrice> {
        self.prices.read().get(symbol).cloned()
    }
}

#[async_trait]
impl SynchronizationListener for TerminalState {
    async fn on_connected(&self, instance_index: u32, _replicas: u32) -> Result<()> {
        self.connected.write().insert(instance_index, true);
        Ok(())
    }

    async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        self.connected.write().insert(instance_index, false);
        self.connected_to_broker.write().insert(instance_index, false);
        Ok(())
    }

    async fn on_broker_connection_status_changed(
        &self,
        instance_index: u32,
        connected: bool,
    ) -> Result<()> {
        self.connected_to_broker
            .write()
            .insert(instance_index, connected);
        Ok(())
    }

    async fn on_synchronization_started(&self, _instance_index: u32) -> Result<()> {
        // The server replays full position and order lists after a session
        // start; stale entries must not survive into the new session.
        self.positions.write().clear();
        self.orders.write().clear();
        Ok(())
    }

    async fn on_account_information_updated(
        &self,
        _instance_index: u32,
        account_information: AccountInformation,
    ) -> Result<()> {
        *self.account_information.write() = Some(account_information);
        Ok(())
    }

    async fn on_positions_replaced(
        &self,
        _instance_index: u32,
        positions: Vec<Position>,
    ) -> Result<()> {
        let mut replica = self.positions.write();
        replica.clear();
        for position in positions {
            replica.insert(position.id.clone(), position);
        }
        Ok(())
    }

    async fn on_position_updated(&self, _instance_index: u32, position: Position) -> Result<()> {
        self.positions.write().insert(position.id.clone(), position);
        Ok(())
    }

    async fn on_position_removed(&self, _instance_index: u32, position_id: &str) -> Result<()> {
        self.positions.write().remove(position_id);
        Ok(())
    }

    async fn on_orders_replaced(&self, _instance_index: u32, orders: Vec<Order>) -> Result<()> {
        let mut replica = self.orders.write();
        replica.clear();
        for order in orders {
            replica.insert(order.id.clone(), order);
        }
        Ok(())
    }

    async fn on_order_updated(&self, _instance_index: u32, order: Order) -> Result<()> {
        self.orders.write().insert(order.id.clone(), order);
        Ok(())
    }

    async fn on_order_completed(&self, _instance_index: u32, order_id: &str) -> Result<()> {
        self.orders.write().remove(order_id);
        Ok(())
    }

    async fn on_symbol_specification_updated(
        &self,
        _instance_index: u32,
        specification: SymbolSpecification,
    ) -> Result<()> {
        self.specifications
            .write()
            .insert(specification.symbol.clone(), specification);
        Ok(())
    }

    async fn on_symbol_price_updated(&self, _instance_index: u32, price: SymbolPrice) -> Result<()> {
        let mut positions = self.positions.write();
        for position in positions.values_mut() {
            if position.symbol == price.symbol {
                position.current_price = Some(match position.position_type {
                    crate::core::domain::PositionType::Buy => price.bid,
                    crate::core::domain::PositionType::Sell => price.ask,
                });
            }
        }
        drop(positions);
        self.prices.write().insert(price.symbol.clone(), price);
        Ok(())
    }
}
