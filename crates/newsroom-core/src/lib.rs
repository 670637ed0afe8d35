//! Core domain + application logic for the newsroom mini app.
//!
//! This crate is intentionally framework-agnostic. The Supabase-style backend
//! and the Telegram launch context live behind ports (traits) implemented in
//! adapter crates.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod live;
pub mod logging;
pub mod nav;
pub mod ports;
pub mod repo;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
