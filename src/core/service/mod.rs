//! Cross-cutting services.

mod health;

pub use health::{ConnectionHealthMonitor, HealthSource, HealthStatus, Uptime};
