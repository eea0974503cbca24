//! Named, versioned buckets of cached responses.
//!
//! A bucket maps a request descriptor (method + URL) to an immutable
//! response snapshot. Storage is reached through the [`CacheStorage`] trait
//! so the proxy never touches a global store directly. Two backends:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, schema migrations
//! - [`MemoryStorage`]: process-local maps behind a tokio `RwLock`

pub mod buckets;
pub mod connection;
pub mod entry;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{RequestKey, ResponseType, StoredResponse};
pub use memory::MemoryStorage;
pub use storage::{Bucket, CacheStorage};
