//! Local session flag storage configuration.

use serde::{Deserialize, Serialize};

/// Where and how session flags are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the JSON file holding the flags.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Cookie name used when a bare cookie value is supplied at login.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_store_path() -> String {
    "data/session.json".to_string()
}

fn default_cookie_name() -> String {
    "connect.sid".to_string()
}
