//! Symbol specifications and streamed price quotes.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One interval of a trading-session schedule, in broker-local time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSessionInterval {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl QuoteSessionInterval {
    /// True if the given broker-local time of day falls inside the interval.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.from <= time && time <= self.to
    }
}

/// Static symbol metadata reported by the terminal.
///
/// Only the fields the synchronization core reads are modeled; the quote
/// session schedule is keyed by upper-case weekday name as on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSpecification {
    pub symbol: String,
    pub min_volume: Decimal,
    pub max_volume: Decimal,
    pub volume_step: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<Decimal>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub quote_sessions: HashMap<String, Vec<QuoteSessionInterval>>,
}

impl SymbolSpecification {
    /// Quote session intervals scheduled for the given weekday.
    #[must_use]
    pub fn quote_sessions_for(&self, weekday: Weekday) -> &[QuoteSessionInterval] {
        self.quote_sessions
            .get(weekday_key(weekday))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True if the broker-local timestamp falls inside any quote session
    /// scheduled for its weekday.
    #[must_use]
    pub fn in_quote_session(&self, broker_time: NaiveDateTime) -> bool {
        self.quote_sessions_for(broker_time.weekday())
            .iter()
            .any(|session| session.contains(broker_time.time()))
    }
}

fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// A streamed price quote for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPrice {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    /// Quote timestamp in server time.
    pub time: DateTime<Utc>,
    /// Quote timestamp in broker-local time, used to match quote sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_tick_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_tick_value: Option<Decimal>,
}

impl SymbolPrice {
    /// Broker-local timestamp of the quote, falling back to server time.
    #[must_use]
    pub fn broker_timestamp(&self) -> NaiveDateTime {
        self.broker_time.unwrap_or_else(|| self.time.naive_utc())
    }
}
