//! Core types and shared functionality for lownet.
//!
//! This crate provides:
//! - Bucket storage with SQLite and in-memory backends
//! - Request descriptor and stored response types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Bucket, CacheDb, CacheStorage, MemoryStorage, RequestKey, ResponseType, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
