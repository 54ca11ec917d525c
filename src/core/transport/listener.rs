//! Listener seams through which the transport feeds the local replica.
//!
//! The synchronization listener is the single dispatch point for ordered
//! frames: every hook has a default no-op so implementors only override what
//! they consume. The terminal state, history storage, health monitor and the
//! connection facade all implement it, each picking up its own slice of the
//! stream.

use async_trait::async_trait;

use crate::core::domain::{
    AccountInformation, Deal, Order, Position, SymbolPrice, SymbolSpecification,
};
use crate::error::Result;

/// Receives ordered synchronization events for one account.
#[async_trait]
pub trait SynchronizationListener: Send + Sync {
    /// A terminal replica established its server-side connection.
    async fn on_connected(&self, instance_index: u32, replicas: u32) -> Result<()> {
        let _ = (instance_index, replicas);
        Ok(())
    }

    /// A terminal replica lost its server-side connection.
    async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        let _ = instance_index;
        Ok(())
    }

    /// The terminal's connection to the broker changed state.
    async fn on_broker_connection_status_changed(
        &self,
        instance_index: u32,
        connected: bool,
    ) -> Result<()> {
        let _ = (instance_index, connected);
        Ok(())
    }

    /// A new synchronization session began for the replica.
    async fn on_synchronization_started(&self, instance_index: u32) -> Result<()> {
        let _ = instance_index;
        Ok(())
    }

    async fn on_account_information_updated(
        &self,
        instance_index: u32,
        account_information: AccountInformation,
    ) -> Result<()> {
        let _ = (instance_index, account_information);
        Ok(())
    }

    async fn on_positions_replaced(
        &self,
        instance_index: u32,
        positions: Vec<Position>,
    ) -> Result<()> {
        let _ = (instance_index, positions);
        Ok(())
    }

    async fn on_position_updated(&self, instance_index: u32, position: Position) -> Result<()> {
        let _ = (instance_index, position);
        Ok(())
    }

    async fn on_position_removed(&self, instance_index: u32, position_id: &str) -> Result<()> {
        let _ = (instance_index, position_id);
        Ok(())
    }

    async fn on_orders_replaced(&self, instance_index: u32, orders: Vec<Order>) -> Result<()> {
        let _ = (instance_index, orders);
        Ok(())
    }

    async fn on_order_updated(&self, instance_index: u32, order: Order) -> Result<()> {
        let _ = (instance_index, order);
        Ok(())
    }

    async fn on_order_completed(&self, instance_index: u32, order_id: &str) -> Result<()> {
        let _ = (instance_index, order_id);
        Ok(())
    }

    async fn on_history_order_added(&self, instance_index: u32, order: Order) -> Result<()> {
        let _ = (instance_index, order);
        Ok(())
    }

    async fn on_deal_added(&self, instance_index: u32, deal: Deal) -> Result<()> {
        let _ = (instance_index, deal);
        Ok(())
    }

    /// Deal history reconciliation finished for the given synchronization id.
    async fn on_deal_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        let _ = (instance_index, synchronization_id);
        Ok(())
    }

    /// Order history reconciliation finished for the given synchronization id.
    async fn on_order_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: &str,
    ) -> Result<()> {
        let _ = (instance_index, synchronization_id);
        Ok(())
    }

    async fn on_symbol_specification_updated(
        &self,
        instance_index: u32,
        specification: SymbolSpecification,
    ) -> Result<()> {
        let _ = (instance_index, specification);
        Ok(())
    }

    async fn on_symbol_price_updated(&self, instance_index: u32, price: SymbolPrice) -> Result<()> {
        let _ = (instance_index, price);
        Ok(())
    }
}

/// Notified when the transport re-establishes its underlying connection.
#[async_trait]
pub trait ReconnectListener: Send + Sync {
    async fn on_reconnected(&self) -> Result<()>;
}
