//! Tradepost Core - domain types for the marketplace.
//!
//! This crate is shared by:
//! - `engine` - stores, services and the query façade
//! - `cli` - operator tooling (migrations, feed ingestion, fulfillment)
//!
//! # Architecture
//!
//! Only types and pure functions live here: no I/O, no database access.
//! Enabling the `postgres` feature adds `sqlx` encode/decode impls for the
//! newtypes and enums so the engine can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - typed ids, e-mail, prices, order states and roles
//! - [`feed`] - shop catalog feeds and their validation into an ingestion plan
//! - [`contact`] - delivery contact drafts and patches
//! - [`views`] - read projections returned to callers
//! - [`validation`] - field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod contact;
pub mod feed;
pub mod types;
pub mod validation;
pub mod views;

pub use types::*;
pub use validation::{FieldError, ValidationErrors};
