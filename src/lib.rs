//! # Token Keeper Library
//!
//! Binds chat principals to OAuth accounts and keeps those accounts alive by
//! rotating their refresh tokens and probing the remote API on a schedule.
//!
//! Modules:
//! - `config` — service configuration, defaults and validation
//! - `oauth` — token exchanges against the provider over a pooled client
//! - `store` — bindings and the credential store they persist in
//! - `workflow` — one-shot binding and the renewal cycle
//! - `observability` / `server` — prometheus metrics and their HTTP endpoint

pub mod config;
pub mod oauth;
pub mod store;
pub mod workflow;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;
pub mod tests;


pub use crate::config::types::ServiceConfig;
