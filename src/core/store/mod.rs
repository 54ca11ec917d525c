//! History storage backends.

mod history;

pub use history::{HistoryStorage, MemoryHistoryStorage};
