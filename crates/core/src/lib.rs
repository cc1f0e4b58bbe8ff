//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache generations backed by SQLite
//! - Unified error types
//! - Configuration and the precache manifest

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStorage, Generation, RequestKey, ResponseType, StoredResponse};
pub use config::{AppConfig, ConfigError, PrecacheManifest};
pub use error::Error;
