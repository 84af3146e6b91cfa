//! Router that applies role guards on every navigation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::guard::{FlagSource, GuardDecision};

use super::history::History;
use super::table::{Access, RouteTable, normalize};

/// What happened when navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// The route rendered.
    Rendered {
        /// Rendered path.
        path: String,
    },
    /// A guard blocked the route and history now points at the fallback.
    Redirected {
        /// Blocked path.
        from: String,
        /// Fallback path now current in history.
        to: String,
    },
    /// No route matches; the not-found view rendered.
    NotFound {
        /// Requested path.
        path: String,
    },
}

impl NavigationOutcome {
    /// Path that is current after the navigation.
    pub fn current_path(&self) -> &str {
        match self {
            Self::Rendered { path } | Self::NotFound { path } => path,
            Self::Redirected { to, .. } => to,
        }
    }
}

/// Owns history and evaluates guards against live session flags.
pub struct Router {
    table: Arc<RouteTable>,
    flags: Arc<dyn FlagSource>,
    history: History,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("history", &self.history)
            .finish()
    }
}

impl Router {
    /// Creates a router starting at `/`.
    pub fn new(table: Arc<RouteTable>, flags: Arc<dyn FlagSource>) -> Self {
        Self {
            table,
            flags,
            history: History::default(),
        }
    }

    /// Route table in use.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Navigation history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current path.
    pub fn current(&self) -> &str {
        self.history.current()
    }

    /// Pushes `path` and renders it, redirecting if its guard refuses.
    pub fn navigate(&mut self, path: &str) -> NavigationOutcome {
        let path = normalize(path);
        self.history.push(path.clone());
        let outcome = self.render_current();
        info!(path = %path, current = %outcome.current_path(), "Navigated");
        outcome
    }

    /// Steps back in history and re-renders that entry.
    pub fn back(&mut self) -> Option<NavigationOutcome> {
        self.history.back()?;
        Some(self.render_current())
    }

    /// Re-renders the current entry, re-evaluating its guard.
    pub fn refresh(&mut self) -> NavigationOutcome {
        self.render_current()
    }

    /// Evaluates the current entry. A refused guard replaces the entry
    /// with the fallback so going back never lands on the blocked route.
    fn render_current(&mut self) -> NavigationOutcome {
        let path = self.history.current().to_string();

        let Some(route) = self.table.resolve(&path) else {
            debug!(path = %path, "No matching route");
            return NavigationOutcome::NotFound { path };
        };

        match route.access {
            Access::Public => NavigationOutcome::Rendered { path },
            Access::Protected(role) => {
                match self.table.guard_for(role).evaluate(self.flags.as_ref()) {
                    GuardDecision::Render => NavigationOutcome::Rendered { path },
                    GuardDecision::Redirect(redirect) => {
                        if redirect.replace {
                            self.history.replace(redirect.to.clone());
                        } else {
                            self.history.push(redirect.to.clone());
                        }
                        NavigationOutcome::Redirected {
                            from: path,
                            to: redirect.to,
                        }
                    }
                }
            }
        }
    }
}
