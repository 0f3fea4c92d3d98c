//! Core domain + application logic for the guard bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the storage
//! engine live behind ports (traits) implemented in adapter crates.

pub mod actions;
pub mod authorize;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod escalate;
pub mod extract;
pub mod logging;
pub mod messages;
pub mod ports;
pub mod roster;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
