//! Route guard configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Client-side navigation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Per-role fallback routes. Key is the role name, value the route a
    /// blocked visitor is redirected to. Missing roles use `/login/<role>`.
    #[serde(default)]
    pub fallbacks: HashMap<String, String>,
}

impl NavigationConfig {
    /// Fallback route for a role.
    pub fn fallback_for(&self, role: Role) -> String {
        self.fallbacks
            .get(role.as_str())
            .cloned()
            .unwrap_or_else(|| role.default_fallback())
    }
}
