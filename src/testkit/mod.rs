//! Test doubles for the transport seam.
//!
//! Enabled with the `testkit` feature; the crate's own integration tests pull
//! it in through a self path dev-dependency.

mod transport;

pub use transport::{MockTransport, TransportCall};
