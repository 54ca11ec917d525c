//! Read-only replicas of server-side state.

mod terminal;

pub use terminal::TerminalState;
