//! Tradepost Engine - marketplace operations over a pluggable store.
//!
//! # Architecture
//!
//! - [`services`] - one service per area (catalog ingestion, browsing,
//!   accounts, contacts, basket, orders, partner view, fulfillment). Every
//!   operation takes the caller's [`identity::AuthContext`] explicitly.
//! - [`store`] - the persistence traits plus the in-memory backend
//! - [`db`] - the `PostgreSQL` backend and embedded migrations
//! - [`query`] - turns flat store rows into nested views
//! - [`notify`] - outbound events (new order, account registered)
//! - [`config`] - environment configuration
//! - [`error`] - the service error taxonomy and failure envelope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod notify;
pub mod query;
pub mod services;
pub mod store;

pub use config::{ConfigError, DatabaseConfig, EngineConfig};
pub use db::PgStore;
pub use error::{ErrorBody, Result, ServiceError};
pub use identity::{AuthContext, Principal};
pub use notify::{MemorySink, Notification, NotificationSink, TracingSink};
pub use store::{MemoryStore, RepositoryError, Store};
