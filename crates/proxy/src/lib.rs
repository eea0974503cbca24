//! Stale-while-revalidate caching proxy for one origin.
//!
//! - [`rules`]: ordered bypass rule table
//! - [`manifest`]: paths precached at install
//! - [`lifecycle`]: install (populate) and activate (sweep old buckets)
//! - [`interceptor`]: per-request policy
//! - [`refresh`]: tracked background refresh tasks
//! - [`proxy`]: [`CacheProxy`] and the [`ProxyHandlers`] host interface

pub mod interceptor;
pub mod lifecycle;
pub mod manifest;
pub mod proxy;
pub mod refresh;
pub mod rules;

#[cfg(test)]
pub(crate) mod test_support;

pub use interceptor::{Interception, PassThroughReason, ResponseSource};
pub use lifecycle::{ActivateOutcome, InstallOutcome, LifecycleSignal};
pub use manifest::{PRECACHE, PrecacheManifest};
pub use proxy::{CacheProxy, ProxyHandlers};
pub use refresh::RefreshTracker;
pub use rules::{BypassRule, DEFAULT_BYPASS_RULES, MatchKind, RuleSet};
