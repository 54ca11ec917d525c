//! Append-only record of deals and history orders.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::core::domain::{Deal, Order};
use crate::core::transport::SynchronizationListener;
use crate::error::Result;

/// Storage for the trading history replica of one account.
///
/// Implementations subscribe to the synchronization stream (the trait extends
/// [`SynchronizationListener`]) and ingest `on_deal_added` /
/// `on_history_order_added` events. Last-timestamp queries drive the starting
/// points of incremental synchronization and default to epoch zero.
#[async_trait]
pub trait HistoryStorage: SynchronizationListener {
    /// Prepare the storage; may load previously recorded state.
    async fn initialize(&self) -> Result<()>;

    /// Timestamp of the latest history order recorded for the replica.
    async fn last_history_order_time(&self, instance_index: u32) -> Result<DateTime<Utc>>;

    /// Timestamp of the latest deal recorded for the replica.
    async fn last_deal_time(&self, instance_index: u32) -> Result<DateTime<Utc>>;

    /// Wipe all recorded history.
    async fn clear(&self) -> Result<()>;
}

/// Keeps the history replica purely in memory.
#[derive(Default)]
pub struct MemoryHistoryStorage {
    deals: RwLock<Vec<Deal>>,
    history_orders: RwLock<Vec<Order>>,
    last_deal_time: RwLock<HashMap<u32, DateTime<Utc>>>,
    last_history_order_time: RwLock<HashMap<u32, DateTime<Utc>>>,
}

impl MemoryHistoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded deals, ordered by time then id.
    #[must_use]
    pub fn deals(&self) -> Vec<Deal> {
        self.deals.read().clone()
    }

    /// Snapshot of recorded history orders, ordered by completion time then id.
    #[must_use]
    pub fn history_orders(&self) -> Vec<Order> {
        self.history_orders.read().clone()
    }
}

#[async_trait]
impl HistoryStorage for MemoryHistoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn last_history_order_time(&self, instance_index: u32) -> Result<DateTime<Utc>> {
        Ok(self
            .last_history_order_time
            .read()
            .get(&instance_index)
            .copied()
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn last_deal_time(&self, instance_index: u32) -> Result<DateTime<Utc>> {
        Ok(self
            .last_deal_time
            .read()
            .get(&instance_index)
            .copied()
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn clear(&self) -> Result<()> {
        self.deals.write().clear();
        self.history_orders.write().clear();
        self.last_deal_time.write().clear();
        self.last_history_order_time.write().clear();
        Ok(())
    }
}

#[async_trait]
impl SynchronizationListener for MemoryHistoryStorage {
    async fn on_deal_added(&self, instance_index: u32, deal: Deal) -> Result<()> {
        {
            let mut deals = self.deals.write();
            let duplicate = deals.iter().any(|existing| {
                existing.id == deal.id
                    && existing.deal_type == deal.deal_type
                    && existing.time == deal.time
            });
            if duplicate {
                return Ok(());
            }
            let position = deals
                .partition_point(|existing| (existing.time, &existing.id) <= (deal.time, &deal.id));
            deals.insert(position, deal.clone());
        }
        let mut last = self.last_deal_time.write();
        let entry = last.entry(instance_index).or_insert(DateTime::UNIX_EPOCH);
        *entry = (*entry).max(deal.time);
        Ok(())
    }

    async fn on_history_order_added(&self, instance_index: u32, order: Order) -> Result<()> {
        let history_time = order.history_time();
        {
            let mut orders = self.history_orders.write();
            let duplicate = orders.iter().any(|existing| {
                existing.id == order.id
                    && existing.order_type == order.order_type
                    && existing.state == order.state
                    && existing.done_time == order.done_time
            });
            if duplicate {
                return Ok(());
            }
            let position = orders.partition_point(|existing| {
                (existing.history_time(), &existing.id) <= (history_time, &order.id)
            });
            orders.insert(position, order);
        }
        let mut last = self.last_history_order_time.write();
        let entry = last.entry(instance_index).or_insert(DateTime::UNIX_EPOCH);
        *entry = (*entry).max(history_time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{DealType, OrderState, OrderType};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn deal(id: &str, time: DateTime<Utc>) -> Deal {
        Deal {
            id: id.to_string(),
            deal_type: DealType::Buy,
            entry_type: None,
            symbol: Some("EURUSD".to_string()),
            magic: None,
            time,
            volume: Some(dec!(0.1)),
            price: Some(dec!(1.1)),
            commission: None,
            swap: None,
            profit: dec!(2.5),
            position_id: None,
            order_id: None,
            comment: None,
            client_id: None,
        }
    }

    fn history_order(id: &str, done_time: DateTime<Utc>) -> Order {
        Order {
            id: id.to_string(),
            order_type: OrderType::Buy,
            state: OrderState::Filled,
            symbol: "EURUSD".to_string(),
            magic: None,
            time: done_time - chrono::Duration::seconds(5),
            done_time: Some(done_time),
            open_price: None,
            current_price: None,
            stop_loss: None,
            take_profit: None,
            volume: dec!(0.1),
            current_volume: dec!(0),
            position_id: None,
            comment: None,
            client_id: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn last_times_default_to_epoch() {
        let storage = MemoryHistoryStorage::new();
        assert_eq!(
            storage.last_deal_time(0).await.unwrap(),
            DateTime::UNIX_EPOCH
        );
        assert_eq!(
            storage.last_history_order_time(0).await.unwrap(),
            DateTime::UNIX_EPOCH
        );
    }

    #[tokio::test]
    async fn tracks_last_times_per_instance() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("1", at(100))).await.unwrap();
        storage.on_deal_added(0, deal("2", at(50))).await.unwrap();
        storage.on_deal_added(1, deal("3", at(300))).await.unwrap();

        assert_eq!(storage.last_deal_time(0).await.unwrap(), at(100));
        assert_eq!(storage.last_deal_time(1).await.unwrap(), at(300));

        storage
            .on_history_order_added(0, history_order("10", at(200)))
            .await
            .unwrap();
        assert_eq!(storage.last_history_order_time(0).await.unwrap(), at(200));
        assert_eq!(
            storage.last_history_order_time(1).await.unwrap(),
            DateTime::UNIX_EPOCH
        );
    }

    #[tokio::test]
    async fn deduplicates_and_keeps_time_order() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("2", at(200))).await.unwrap();
        storage.on_deal_added(0, deal("1", at(100))).await.unwrap();
        storage.on_deal_added(0, deal("2", at(200))).await.unwrap();

        let deals = storage.deals();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].id, "1");
        assert_eq!(deals[1].id, "2");
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("1", at(100))).await.unwrap();
        storage
            .on_history_order_added(0, history_order("10", at(200)))
            .await
            .unwrap();

        storage.clear().await.unwrap();
        assert!(storage.deals().is_empty());
        assert!(storage.history_orders().is_empty());
        assert_eq!(
            storage.last_deal_time(0).await.unwrap(),
            DateTime::UNIX_EPOCH
        );
    }
}
