//! Interfaces between the filter and the host CMS.
//!
//! The host wires these explicitly: its HTTP layer calls [`UpdateHooks`]
//! around every outbound request, its update subsystem consults
//! `on_core_update_query`, and its cache layer implements [`UpdateCache`].
//! There is no implicit hook discovery and no global instance.

use anyhow::Result;
use std::collections::HashMap;

/// Outgoing request arguments as seen by the host's HTTP layer. Only the
/// form body matters to the filter; payload fields are keyed `"plugins"` /
/// `"themes"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestArgs {
    pub body: HashMap<String, Vec<u8>>,
}

impl RequestArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body_field(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.body.insert(key.into(), value);
        self
    }
}

/// Result of the pre-send hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreSendAction {
    /// Let the host transmit the request.
    #[default]
    Transmit,
    /// Short-circuit: the request is never performed and the host treats the
    /// update check as failed/empty.
    Cancel,
}

/// Synthetic answer to a core-platform update check: no updates available,
/// checked just now, against the currently running platform version.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CoreUpdateCheck {
    pub updates: Vec<serde_json::Value>,
    pub last_checked: u64,
    pub version_checked: String,
}

/// The three interception points the host invokes on the filter.
pub trait UpdateHooks {
    /// Pre-send: return [`PreSendAction::Cancel`] to stop the request, or
    /// `default` unchanged to let it proceed.
    fn on_before_send(&self, default: PreSendAction, args: &RequestArgs, url: &str)
    -> PreSendAction;

    /// Body mutation: return the (possibly rewritten) request arguments.
    fn on_rewrite_body(&self, args: RequestArgs, url: &str) -> RequestArgs;

    /// Core update query: `Some` answers the check locally without any
    /// network request; `None` lets the host check normally.
    fn on_core_update_query(&self) -> Option<CoreUpdateCheck>;
}

/// Cached update-check results owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedCheck {
    PluginUpdates,
    ThemeUpdates,
}

/// Host cache layer; the filter deletes cached results on activation and
/// deactivation so the next check is fresh.
#[cfg_attr(test, mockall::automock)]
pub trait UpdateCache {
    fn delete(&self, check: CachedCheck) -> Result<()>;
}
