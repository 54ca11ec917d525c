//! Termlink - client-side synchronization core for cloud-hosted trading
//! terminals.
//!
//! A consumer opens a [`TerminalConnection`](app::TerminalConnection) to a
//! remote trading account. The connection keeps an in-memory replica of the
//! account (positions, orders, prices, history) consistent with the
//! server-side terminal, streams market data, issues trading commands and
//! reports connection health.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── core/             # Reusable library components
//! │   ├── domain/       # Pure domain types
//! │   ├── transport/    # Transport trait, listeners, packet orderer
//! │   ├── cache/        # Terminal state replica
//! │   ├── store/        # History storage backends
//! │   └── service/      # Connection health monitoring
//! └── app/              # Connection facade, registry, configuration
//! ```
//!
//! # Features
//!
//! - `testkit` - Mock transport for downstream test suites

pub mod app;
pub mod core;
pub mod error;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
