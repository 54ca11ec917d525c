//! Pure domain types shared across the crate.
//!
//! These mirror what the terminal reports for one trading account: account
//! information, positions, pending and historical orders, deals, symbol
//! specifications and prices, plus the typed trade request surface.

mod account;
mod deal;
mod market;
mod order;
mod position;
mod trade;

pub use account::{AccountHandle, AccountInformation};
pub use deal::{Deal, DealEntryType, DealType};
pub use market::{QuoteSessionInterval, SymbolPrice, SymbolSpecification};
pub use order::{Order, OrderState, OrderType};
pub use position::{Position, PositionType};
pub use trade::{
    ExpirationOptions, ExpirationType, FillingMode, MarketTradeOptions, PendingTradeOptions,
    TradeOptions, TradeRequest, TradeResponse,
};
