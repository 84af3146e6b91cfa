//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a serde default so an empty file (or no
//! file at all) yields a usable configuration.

pub mod api;
pub mod logging;
pub mod navigation;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::api::ApiConfig;
pub use self::logging::LoggingConfig;
pub use self::navigation::NavigationConfig;
pub use self::realtime::{RealtimeConfig, TransportKind};
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API addressing.
    #[serde(default)]
    pub api: ApiConfig,
    /// Realtime connection settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Local session flag storage.
    #[serde(default)]
    pub session: SessionConfig,
    /// Route guard fallbacks.
    #[serde(default)]
    pub navigation: NavigationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PEERPREP__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        tracing::debug!(env, "Loading layered configuration");
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PEERPREP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from a single explicit file.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        tracing::debug!(path, "Loading configuration file");
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(true))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to read '{path}': {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize '{path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();
        assert!(config.realtime.reconnect);
        assert_eq!(
            config.realtime.transports,
            vec![TransportKind::Websocket, TransportKind::Polling]
        );
        assert_eq!(config.api.socket_path_suffix, "/api");
    }

    #[test]
    fn test_from_file_overrides_fields() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://peerprep.example.edu/api"

[realtime]
transports = ["polling"]
reconnect_attempts = 2

[navigation.fallbacks]
admin = "/"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.api.base_url, "https://peerprep.example.edu/api");
        assert_eq!(config.realtime.transports, vec![TransportKind::Polling]);
        assert_eq!(config.realtime.reconnect_attempts, 2);
        assert_eq!(config.realtime.reconnect_delay_ms, 1000);
        assert_eq!(config.navigation.fallbacks.get("admin").unwrap(), "/");
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("does/not/exist.toml").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
