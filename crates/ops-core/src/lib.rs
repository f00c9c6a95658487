//! Core types and utilities for ops-assist
//!
//! # Modules
//!
//! - `config`: Environment file loading and typed settings
//! - `error`: Error types and Result alias
//! - `logging`: tracing subscriber setup shared by every binary
//! - `types`: Action-group wire types, alert events and status policy

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
pub use types::*;
