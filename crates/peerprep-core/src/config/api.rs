//! Backend API addressing.

use serde::{Deserialize, Serialize};

/// Backend API and realtime endpoint addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address of the REST API, e.g. `http://localhost:5000/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path suffix stripped from `base_url` to reach the realtime server.
    #[serde(default = "default_socket_path_suffix")]
    pub socket_path_suffix: String,
    /// Path of the realtime endpoint on the realtime server.
    #[serde(default = "default_realtime_path")]
    pub realtime_path: String,
    /// Socket namespace joined after the transport opens.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_path_suffix: default_socket_path_suffix(),
            realtime_path: default_realtime_path(),
            namespace: default_namespace(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_socket_path_suffix() -> String {
    "/api".to_string()
}

fn default_realtime_path() -> String {
    "/socket.io/".to_string()
}

fn default_namespace() -> String {
    "/".to_string()
}
