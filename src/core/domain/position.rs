//! Open position replica type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionType {
    #[serde(rename = "POSITION_TYPE_BUY")]
    Buy,
    #[serde(rename = "POSITION_TYPE_SELL")]
    Sell,
}

/// An open position as reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    #[serde(rename = "type")]
    pub position_type: PositionType,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<u64>,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    pub open_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tick_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    pub volume: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    pub profit: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}
