//! Core library components.

pub mod cache;
pub mod domain;
pub mod service;
pub mod store;
pub mod transport;
