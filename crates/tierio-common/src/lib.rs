//! tierio Common - Shared types and utilities
//!
//! This crate provides the storage type definitions, error types and
//! configuration structures used across all tierio components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{LoggingConfig, PolicyConfig, SuiteConfig};
pub use error::{Error, Result};
pub use types::*;
