//! SQLite-backed store of versioned cache generations.
//!
//! This module provides the persisted half of the offline cache:
//!
//! - One named generation per deployed version (`<site>-cache-v<N>`)
//! - Entries keyed by request identity (method + URL, SHA-256 hashed)
//! - Automatic schema migrations
//! - WAL mode so readers keep a consistent snapshot while a generation is deleted

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::{RequestKey, ResponseType, StoredResponse};
pub use generations::Generation;
