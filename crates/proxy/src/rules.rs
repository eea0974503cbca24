//! Bypass rule table.
//!
//! Requests matching any rule skip the cache entirely. Rules are evaluated
//! in order with exact, case-sensitive comparisons.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use url::Url;

/// How a rule's value is compared against a request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Path starts with the value.
    Prefix,
    /// Path equals the value.
    Exact,
    /// Query string has a parameter with this name.
    QueryFlag,
}

/// One bypass condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BypassRule {
    pub kind: MatchKind,
    pub value: Cow<'static, str>,
}

impl BypassRule {
    pub const fn prefix(value: &'static str) -> Self {
        Self { kind: MatchKind::Prefix, value: Cow::Borrowed(value) }
    }

    pub const fn exact(value: &'static str) -> Self {
        Self { kind: MatchKind::Exact, value: Cow::Borrowed(value) }
    }

    pub const fn query_flag(value: &'static str) -> Self {
        Self { kind: MatchKind::QueryFlag, value: Cow::Borrowed(value) }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let value = self.value.as_ref();
        match self.kind {
            MatchKind::Prefix => url.path().starts_with(value),
            MatchKind::Exact => url.path() == value,
            MatchKind::QueryFlag => url.query_pairs().any(|(name, _)| name == value),
        }
    }
}

impl fmt::Display for BypassRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MatchKind::Prefix => write!(f, "path prefix {}", self.value),
            MatchKind::Exact => write!(f, "path {}", self.value),
            MatchKind::QueryFlag => write!(f, "query flag {}", self.value),
        }
    }
}

/// API, submit, verify and explicit cache-bypass requests.
pub const DEFAULT_BYPASS_RULES: &[BypassRule] = &[
    BypassRule::prefix("/posts/"),
    BypassRule::exact("/submit"),
    BypassRule::prefix("/verify"),
    BypassRule::query_flag("_nocache"),
];

/// Ordered list of bypass rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<BypassRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<BypassRule>) -> Self {
        Self { rules }
    }

    /// First rule matching the URL, if any.
    pub fn matching(&self, url: &Url) -> Option<&BypassRule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    pub fn push(&mut self, rule: BypassRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[BypassRule] {
        &self.rules
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(DEFAULT_BYPASS_RULES.to_vec())
    }
}
