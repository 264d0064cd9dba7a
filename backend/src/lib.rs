//! Gold Price Backend Library
//!
//! This library provides the core functionality for the gold price service,
//! including:
//! - Relaying the exgold domestic precious-metal price feed to superusers
//! - User authentication (argon2 password hashes, JWT access tokens)
//! - User and item models with their Postgres table mapping

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod services;
