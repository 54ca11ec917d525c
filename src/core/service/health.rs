//! Connection health tracking: uptime accumulators and quote freshness.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::domain::{SymbolPrice, SymbolSpecification};
use crate::core::transport::SynchronizationListener;
use crate::error::Result;

/// Sampling period of the uptime accumulators.
const MEASURE_INTERVAL: Duration = Duration::from_secs(1);

/// A subscribed symbol counts as streaming if its price was refreshed within
/// this window.
const MIN_QUOTE_INTERVAL: Duration = Duration::from_secs(60);

const HOUR_WINDOW: usize = 3600;
const DAY_WINDOW: usize = 86400;
const WEEK_WINDOW: usize = 604800;

/// What the monitor reads back from its owning connection each tick.
///
/// The connection owns the monitor; the monitor only holds this capability,
/// never the connection itself.
pub trait HealthSource: Send + Sync {
    fn connected(&self) -> bool;
    fn connected_to_broker(&self) -> bool;
    fn synchronized(&self) -> bool;
    fn subscribed_symbols(&self) -> Vec<String>;
    fn specification(&self, symbol: &str) -> Option<SymbolSpecification>;
}

/// Current health flags with a human-readable summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub connected: bool,
    pub connected_to_broker: bool,
    pub synchronized: bool,
    pub quote_streaming_healthy: bool,
    pub healthy: bool,
    pub message: String,
}

/// Uptime percentages over the three sliding windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Uptime {
    #[serde(rename = "1h")]
    pub hour: f64,
    #[serde(rename = "1d")]
    pub day: f64,
    #[serde(rename = "1w")]
    pub week: f64,
}

impl Uptime {
    /// Window-name-keyed map, the shape the uptime save call expects.
    #[must_use]
    pub fn to_map(self) -> HashMap<String, f64> {
        HashMap::from([
            ("1h".to_string(), self.hour),
            ("1d".to_string(), self.day),
            ("1w".to_string(), self.week),
        ])
    }
}

struct UptimeWindow {
    samples: VecDeque<bool>,
    capacity: usize,
}

impl UptimeWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    fn push(&mut self, healthy: bool) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(healthy);
    }

    fn uptime_percent(&self) -> f64 {
        if self.samples.is_empty() {
            return 100.0;
        }
        let healthy = self.samples.iter().filter(|sample| **sample).count();
        (100.0 * healthy as f64 / self.samples.len() as f64).round()
    }
}

struct QuoteObservation {
    broker_time: NaiveDateTime,
    updated_at: Instant,
}

struct MonitorShared {
    source: Weak<dyn HealthSource>,
    quotes: Mutex<HashMap<String, QuoteObservation>>,
    windows: Mutex<[UptimeWindow; 3]>,
}

impl MonitorShared {
    /// No subscriptions means no quotes are expected. Otherwise at least one
    /// subscribed symbol must have a recent price stamped inside a quote
    /// session of its specification.
    fn quote_streaming_healthy(&self, source: &dyn HealthSource) -> bool {
        let symbols = source.subscribed_symbols();
        if symbols.is_empty() {
            return true;
        }
        let quotes = self.quotes.lock();
        symbols.iter().any(|symbol| {
            let Some(observation) = quotes.get(symbol) else {
                return false;
            };
            if observation.updated_at.elapsed() > MIN_QUOTE_INTERVAL {
                return false;
            }
            source
                .specification(symbol)
                .is_some_and(|specification| specification.in_quote_session(observation.broker_time))
        })
    }

    fn measure(&self) {
        let Some(source) = self.source.upgrade() else {
            return;
        };
        let healthy = source.connected()
            && source.connected_to_broker()
            && source.synchronized()
            && self.quote_streaming_healthy(source.as_ref());
        let mut windows = self.windows.lock();
        for window in windows.iter_mut() {
            window.push(healthy);
        }
    }
}

/// Samples connection health once per second and accumulates uptime over
/// 1-hour, 1-day and 1-week sliding windows.
pub struct ConnectionHealthMonitor {
    shared: Arc<MonitorShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHealthMonitor {
    #[must_use]
    pub fn new(source: Weak<dyn HealthSource>) -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                source,
                quotes: Mutex::new(HashMap::new()),
                windows: Mutex::new([
                    UptimeWindow::new(HOUR_WINDOW),
                    UptimeWindow::new(DAY_WINDOW),
                    UptimeWindow::new(WEEK_WINDOW),
                ]),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the periodic sampling task.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MEASURE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The immediate first tick would sample the pre-connection state.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                shared.measure();
            }
        }));
    }

    /// Stop the periodic sampling task.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Uptime percentages over the sliding windows, rounded to whole percent.
    #[must_use]
    pub fn uptime(&self) -> Uptime {
        let windows = self.shared.windows.lock();
        Uptime {
            hour: windows[0].uptime_percent(),
            day: windows[1].uptime_percent(),
            week: windows[2].uptime_percent(),
        }
    }

    /// Current health flags and summary message.
    #[must_use]
    pub fn health_status(&self) -> HealthStatus {
        let (connected, connected_to_broker, synchronized, quote_streaming_healthy) =
            match self.shared.source.upgrade() {
                Some(source) => (
                    source.connected(),
                    source.connected_to_broker(),
                    source.synchronized(),
                    self.shared.quote_streaming_healthy(source.as_ref()),
                ),
                None => (false, false, false, false),
            };
        let healthy = connected && connected_to_broker && synchronized && quote_streaming_healthy;
        let message = if healthy {
            "Connection to broker is stable. No health issues detected.".to_string()
        } else {
            let mut reasons = Vec::new();
            if !connected {
                reasons.push("connection to API server is not established or lost");
            }
            if !connected_to_broker {
                reasons.push("connection to broker is not established or lost");
            }
            if !synchronized {
                reasons.push("local terminal state is not synchronized to broker");
            }
            if !quote_streaming_healthy {
                reasons.push("quotes are not streamed from the broker within reasonable time");
            }
            format!(
                "Connection is not healthy because {}.",
                reasons.join(" and ")
            )
        };
        HealthStatus {
            connected,
            connected_to_broker,
            synchronized,
            quote_streaming_healthy,
            healthy,
            message,
        }
    }

    #[cfg(test)]
    fn measure_now(&self) {
        self.shared.measure();
    }
}

#[async_trait]
impl SynchronizationListener for ConnectionHealthMonitor {
    async fn on_symbol_price_updated(&self, _instance_index: u32, price: SymbolPrice) -> Result<()> {
        let broker_time = price.broker_timestamp();
        self.shared.quotes.lock().insert(
            price.symbol,
            QuoteObservation {
                broker_time,
                updated_at: Instant::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::QuoteSessionInterval;
    use chrono::{Datelike, NaiveTime, Utc};
    use parking_lot::RwLock;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct FakeSource {
        connected: RwLock<bool>,
        connected_to_broker: RwLock<bool>,
        synchronized: RwLock<bool>,
        symbols: RwLock<Vec<String>>,
        specifications: RwLock<HashMap<String, SymbolSpecification>>,
    }

    impl HealthSource for FakeSource {
        fn connected(&self) -> bool {
            *self.connected.read()
        }
        fn connected_to_broker(&self) -> bool {
            *self.connected_to_broker.read()
        }
        fn synchronized(&self) -> bool {
            *self.synchronized.read()
        }
        fn subscribed_symbols(&self) -> Vec<String> {
            self.symbols.read().clone()
        }
        fn specification(&self, symbol: &str) -> Option<SymbolSpecification> {
            self.specifications.read().get(symbol).cloned()
        }
    }

    fn healthy_source() -> Arc<FakeSource> {
        let source = Arc::new(FakeSource::default());
        *source.connected.write() = true;
        *source.connected_to_broker.write() = true;
        *source.synchronized.write() = true;
        source
    }

    fn monitor_for(source: &Arc<FakeSource>) -> ConnectionHealthMonitor {
        let source: Arc<dyn HealthSource> = source.clone();
        let weak: Weak<dyn HealthSource> = Arc::downgrade(&source);
        ConnectionHealthMonitor::new(weak)
    }

    fn all_day_specification(symbol: &str) -> SymbolSpecification {
        let now = Utc::now().naive_utc();
        let day = match now.weekday() {
            chrono::Weekday::Mon => "MONDAY",
            chrono::Weekday::Tue => "TUESDAY",
            chrono::Weekday::Wed => "WEDNESDAY",
            chrono::Weekday::Thu => "THURSDAY",
            chrono::Weekday::Fri => "FRIDAY",
            chrono::Weekday::Sat => "SATURDAY",
            chrono::Weekday::Sun => "SUNDAY",
        };
        let mut quote_sessions = HashMap::new();
        quote_sessions.insert(
            day.to_string(),
            vec![QuoteSessionInterval {
                from: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                to: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            }],
        );
        SymbolSpecification {
            symbol: symbol.to_string(),
            min_volume: dec!(0.01),
            max_volume: dec!(100),
            volume_step: dec!(0.01),
            tick_size: None,
            quote_sessions,
        }
    }

    fn price_now(symbol: &str) -> SymbolPrice {
        SymbolPrice {
            symbol: symbol.to_string(),
            bid: dec!(1.1),
            ask: dec!(1.1002),
            time: Utc::now(),
            broker_time: Some(Utc::now().naive_utc()),
            profit_tick_value: None,
            loss_tick_value: None,
        }
    }

    #[test]
    fn empty_windows_report_full_uptime() {
        let source = healthy_source();
        let monitor = monitor_for(&source);
        let uptime = monitor.uptime();
        assert_eq!(uptime.hour, 100.0);
        assert_eq!(uptime.week, 100.0);
    }

    #[test]
    fn uptime_is_rounded_share_of_healthy_samples() {
        let mut window = UptimeWindow::new(3600);
        for _ in 0..16 {
            window.push(true);
        }
        for _ in 0..16 {
            window.push(false);
        }
        assert_eq!(window.uptime_percent(), 50.0);

        let mut window = UptimeWindow::new(3600);
        window.push(true);
        window.push(true);
        window.push(false);
        // 2/3 healthy rounds to 67.
        assert_eq!(window.uptime_percent(), 67.0);
    }

    #[test]
    fn window_capacity_slides() {
        let mut window = UptimeWindow::new(4);
        for _ in 0..4 {
            window.push(false);
        }
        for _ in 0..4 {
            window.push(true);
        }
        assert_eq!(window.uptime_percent(), 100.0);
    }

    #[test]
    fn uptime_tracks_flag_transitions() {
        let source = healthy_source();
        let monitor = monitor_for(&source);

        // t=0..4 healthy, t=4..8 api down, t=8..16 broker down,
        // t=16..20 not synchronized, t=20..32 healthy again: 16/32 healthy.
        for _ in 0..4 {
            monitor.measure_now();
        }
        *source.connected.write() = false;
        for _ in 4..8 {
            monitor.measure_now();
        }
        *source.connected.write() = true;
        *source.connected_to_broker.write() = false;
        for _ in 8..16 {
            monitor.measure_now();
        }
        *source.connected_to_broker.write() = true;
        *source.synchronized.write() = false;
        for _ in 16..20 {
            monitor.measure_now();
        }
        *source.synchronized.write() = true;
        for _ in 20..32 {
            monitor.measure_now();
        }

        assert_eq!(monitor.uptime().hour, 50.0);
    }

    #[test]
    fn healthy_status_message() {
        let source = healthy_source();
        let monitor = monitor_for(&source);
        let status = monitor.health_status();
        assert!(status.healthy);
        assert_eq!(
            status.message,
            "Connection to broker is stable. No health issues detected."
        );
    }

    #[test]
    fn unhealthy_reasons_follow_fixed_order() {
        let source = Arc::new(FakeSource::default());
        *source.symbols.write() = vec!["EURUSD".to_string()];
        let monitor = monitor_for(&source);
        let status = monitor.health_status();
        assert!(!status.healthy);
        assert_eq!(
            status.message,
            "Connection is not healthy because connection to API server is not established or \
             lost and connection to broker is not established or lost and local terminal state \
             is not synchronized to broker and quotes are not streamed from the broker within \
             reasonable time."
        );
    }

    #[test]
    fn single_failed_flag_reports_single_reason() {
        let source = healthy_source();
        *source.synchronized.write() = false;
        let monitor = monitor_for(&source);
        assert_eq!(
            monitor.health_status().message,
            "Connection is not healthy because local terminal state is not synchronized to broker."
        );
    }

    #[tokio::test]
    async fn quotes_healthy_without_subscriptions() {
        let source = healthy_source();
        let monitor = monitor_for(&source);
        assert!(monitor.health_status().quote_streaming_healthy);
    }

    #[tokio::test]
    async fn fresh_in_session_price_keeps_quotes_healthy() {
        let source = healthy_source();
        *source.symbols.write() = vec!["EURUSD".to_string()];
        source
            .specifications
            .write()
            .insert("EURUSD".to_string(), all_day_specification("EURUSD"));
        let monitor = monitor_for(&source);

        assert!(!monitor.health_status().quote_streaming_healthy);
        monitor
            .on_symbol_price_updated(0, price_now("EURUSD"))
            .await
            .unwrap();
        assert!(monitor.health_status().quote_streaming_healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_price_flips_quotes_unhealthy() {
        let source = healthy_source();
        *source.symbols.write() = vec!["EURUSD".to_string()];
        source
            .specifications
            .write()
            .insert("EURUSD".to_string(), all_day_specification("EURUSD"));
        let monitor = monitor_for(&source);

        let price = price_now("EURUSD");
        monitor.on_symbol_price_updated(0, price).await.unwrap();
        assert!(monitor.health_status().quote_streaming_healthy);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!monitor.health_status().quote_streaming_healthy);
    }

    #[tokio::test]
    async fn out_of_session_price_does_not_count() {
        let source = healthy_source();
        *source.symbols.write() = vec!["EURUSD".to_string()];
        // Specification without any quote sessions: never in session.
        let mut specification = all_day_specification("EURUSD");
        specification.quote_sessions.clear();
        source
            .specifications
            .write()
            .insert("EURUSD".to_string(), specification);
        let monitor = monitor_for(&source);

        monitor
            .on_symbol_price_updated(0, price_now("EURUSD"))
            .await
            .unwrap();
        assert!(!monitor.health_status().quote_streaming_healthy);
    }
}
