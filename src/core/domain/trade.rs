//! Typed trade request surface.
//!
//! Trade commands travel to the terminal as a single tagged payload
//! discriminated by `actionType`. Modeling them as a sum type keeps
//! impossible combinations (a pending expiration on a market close, say)
//! unrepresentable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum combined length of `comment` and `client_id` accepted by the
/// terminal.
const MAX_COMMENT_CLIENT_ID_LEN: usize = 26;

/// Order filling policy for market-style executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillingMode {
    #[serde(rename = "ORDER_FILLING_FOK")]
    FillOrKill,
    #[serde(rename = "ORDER_FILLING_IOC")]
    ImmediateOrCancel,
}

/// Pending order expiration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationType {
    #[serde(rename = "ORDER_TIME_GTC")]
    GoodTillCancel,
    #[serde(rename = "ORDER_TIME_DAY")]
    Day,
    #[serde(rename = "ORDER_TIME_SPECIFIED")]
    Specified,
    #[serde(rename = "ORDER_TIME_SPECIFIED_DAY")]
    SpecifiedDay,
}

/// Expiration settings for pending orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationOptions {
    #[serde(rename = "type")]
    pub expiration_type: ExpirationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Options shared by every trade action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<u64>,
}

impl TradeOptions {
    /// Check the terminal's length constraint on the comment/client-id pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the combined length exceeds 26.
    pub fn validate(&self) -> Result<()> {
        let combined = self.comment.as_deref().unwrap_or_default().len()
            + self.client_id.as_deref().unwrap_or_default().len();
        if combined > MAX_COMMENT_CLIENT_ID_LEN {
            return Err(Error::Validation(format!(
                "comment and clientId together must not exceed \
                 {MAX_COMMENT_CLIENT_ID_LEN} characters, got {combined}"
            )));
        }
        Ok(())
    }
}

/// Options for market-style executions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTradeOptions {
    #[serde(flatten)]
    pub common: TradeOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filling_modes: Option<Vec<FillingMode>>,
}

/// Options for pending order placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTradeOptions {
    #[serde(flatten)]
    pub common: TradeOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationOptions>,
}

/// A trade command, discriminated on the wire by `actionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "actionType")]
pub enum TradeRequest {
    #[serde(rename = "ORDER_TYPE_BUY", rename_all = "camelCase")]
    MarketBuy {
        symbol: String,
        volume: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL", rename_all = "camelCase")]
    MarketSell {
        symbol: String,
        volume: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_LIMIT", rename_all = "camelCase")]
    BuyLimit {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_LIMIT", rename_all = "camelCase")]
    SellLimit {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_STOP", rename_all = "camelCase")]
    BuyStop {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_STOP", rename_all = "camelCase")]
    SellStop {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_STOP_LIMIT", rename_all = "camelCase")]
    BuyStopLimit {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        stop_limit_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_STOP_LIMIT", rename_all = "camelCase")]
    SellStopLimit {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        stop_limit_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "POSITION_MODIFY", rename_all = "camelCase")]
    ModifyPosition {
        position_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
    },
    #[serde(rename = "POSITION_PARTIAL", rename_all = "camelCase")]
    PartialClosePosition {
        position_id: String,
        volume: Decimal,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITION_CLOSE_ID", rename_all = "camelCase")]
    ClosePosition {
        position_id: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITION_CLOSE_BY", rename_all = "camelCase")]
    CloseBy {
        position_id: String,
        close_by_position_id: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITIONS_CLOSE_SYMBOL", rename_all = "camelCase")]
    ClosePositionsBySymbol {
        symbol: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_MODIFY", rename_all = "camelCase")]
    ModifyOrder {
        order_id: String,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
    },
    #[serde(rename = "ORDER_CANCEL", rename_all = "camelCase")]
    CancelOrder { order_id: String },
}

impl TradeRequest {
    /// Validate the request's common options, when the action carries any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on constraint violations.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::MarketBuy { options, .. }
            | Self::MarketSell { options, .. }
            | Self::PartialClosePosition { options, .. }
            | Self::ClosePosition { options, .. }
            | Self::CloseBy { options, .. }
            | Self::ClosePositionsBySymbol { options, .. } => options.common.validate(),
            Self::BuyLimit { options, .. }
            | Self::SellLimit { options, .. }
            | Self::BuyStop { options, .. }
            | Self::SellStop { options, .. }
            | Self::BuyStopLimit { options, .. }
            | Self::SellStopLimit { options, .. } => options.common.validate(),
            Self::ModifyPosition { .. } | Self::ModifyOrder { .. } | Self::CancelOrder { .. } => {
                Ok(())
            }
        }
    }
}

/// Result of a trade command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub numeric_code: i64,
    pub string_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_buy_serializes_with_action_type_tag() {
        let request = TradeRequest::MarketBuy {
            symbol: "EURUSD".to_string(),
            volume: dec!(0.1),
            stop_loss: Some(dec!(1.05)),
            take_profit: None,
            options: MarketTradeOptions {
                common: TradeOptions {
                    comment: Some("hedge".to_string()),
                    ..TradeOptions::default()
                },
                filling_modes: Some(vec![FillingMode::FillOrKill]),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["actionType"], "ORDER_TYPE_BUY");
        assert_eq!(value["symbol"], "EURUSD");
        assert_eq!(value["stopLoss"], serde_json::json!("1.05"));
        assert_eq!(value["comment"], "hedge");
        assert_eq!(value["fillingModes"][0], "ORDER_FILLING_FOK");
        assert!(value.get("takeProfit").is_none());
    }

    #[test]
    fn stop_limit_carries_both_prices() {
        let request = TradeRequest::SellStopLimit {
            symbol: "GBPUSD".to_string(),
            volume: dec!(1),
            open_price: dec!(1.22),
            stop_limit_price: dec!(1.225),
            stop_loss: None,
            take_profit: None,
            options: PendingTradeOptions::default(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["actionType"], "ORDER_TYPE_SELL_STOP_LIMIT");
        assert_eq!(value["openPrice"], serde_json::json!("1.22"));
        assert_eq!(value["stopLimitPrice"], serde_json::json!("1.225"));
    }

    #[test]
    fn cancel_order_deserializes_from_tagged_payload() {
        let request: TradeRequest = serde_json::from_value(serde_json::json!({
            "actionType": "ORDER_CANCEL",
            "orderId": "46870472",
        }))
        .unwrap();
        assert_eq!(
            request,
            TradeRequest::CancelOrder {
                order_id: "46870472".to_string()
            }
        );
    }

    #[test]
    fn comment_client_id_length_limit_is_enforced() {
        let options = TradeOptions {
            comment: Some("a".repeat(20)),
            client_id: Some("b".repeat(7)),
            ..TradeOptions::default()
        };
        assert!(options.validate().is_err());

        let options = TradeOptions {
            comment: Some("a".repeat(20)),
            client_id: Some("b".repeat(6)),
            ..TradeOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_reaches_nested_options() {
        let request = TradeRequest::ClosePosition {
            position_id: "46214692".to_string(),
            options: MarketTradeOptions {
                common: TradeOptions {
                    comment: Some("x".repeat(30)),
                    ..TradeOptions::default()
                },
                filling_modes: None,
            },
        };
        assert!(request.validate().is_err());
    }
}
