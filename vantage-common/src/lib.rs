//! # Vantage Common Library
//!
//! Shared code for the Vantage channel-analytics services including:
//! - Database pool initialization, schema creation, and models
//! - Normalized Twitch event types
//! - Configuration loading
//! - Common error types
//! - Watch-time arithmetic

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use config::Config;
pub use error::{Error, Result};
