//! MCP tool implementations.
//!
//! This module contains all tools exposed by the lownet server.

pub mod cache;
pub mod proxy_fetch;
pub mod proxy_update;
