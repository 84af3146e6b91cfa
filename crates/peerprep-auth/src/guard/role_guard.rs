//! Role guard evaluation over session flags.
//!
//! The guard is a UI visibility gate. It trusts the stored flag as-is and
//! performs no server round-trip; real authorization happens server-side
//! on every request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use peerprep_core::config::NavigationConfig;
use peerprep_core::types::Role;

use crate::session::keys::AUTHENTICATED_MARKER;

/// Anything the guard can read flags from.
pub trait FlagSource: Send + Sync {
    /// Current value of a flag.
    fn flag(&self, key: &str) -> Option<String>;
}

impl FlagSource for HashMap<String, String> {
    fn flag(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Where a blocked navigation goes instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Fallback route.
    pub to: String,
    /// Replace the current history entry rather than push a new one.
    pub replace: bool,
}

/// Result of evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Render the protected view.
    Render,
    /// Do not render; navigate to the fallback instead.
    Redirect(Redirect),
}

impl GuardDecision {
    /// Whether the protected view may render.
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Gates one role's protected routes behind its session flag.
///
/// Holds no state of its own; every call re-reads the flag, so logging
/// out between two evaluations flips the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    /// Role whose marker is checked.
    role: Role,
    /// Route to redirect to when the marker is absent.
    fallback: String,
}

impl RoleGuard {
    /// Creates a guard with an explicit fallback route.
    pub fn new(role: Role, fallback: impl Into<String>) -> Self {
        Self {
            role,
            fallback: fallback.into(),
        }
    }

    /// Creates a guard using the configured fallback for the role.
    pub fn from_config(role: Role, config: &NavigationConfig) -> Self {
        Self::new(role, config.fallback_for(role))
    }

    /// Role this guard protects.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Fallback route.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Whether the stored flag equals the authenticated marker.
    pub fn is_authorized(&self, flags: &dyn FlagSource) -> bool {
        flags.flag(self.role.flag_key()).as_deref() == Some(AUTHENTICATED_MARKER)
    }

    /// Decides whether the protected view renders.
    pub fn evaluate(&self, flags: &dyn FlagSource) -> GuardDecision {
        if self.is_authorized(flags) {
            GuardDecision::Render
        } else {
            debug!(role = %self.role, fallback = %self.fallback, "Guard redirecting");
            GuardDecision::Redirect(Redirect {
                to: self.fallback.clone(),
                replace: true,
            })
        }
    }
}
