//! Network client for lownet.
//!
//! This crate provides the request type the proxy intercepts, URL
//! resolution against the configured origin, and the `Fetcher` seam with
//! its reqwest-backed implementation.

pub mod fetch;
pub mod request;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, NetworkResponse, classify_response};
pub use request::ProxyRequest;
