//! Realtime endpoint derivation from the API base address.

use reqwest::Url;

use peerprep_core::config::{ApiConfig, TransportKind};
use peerprep_core::error::AppError;

use crate::message::packet::ENGINE_PROTOCOL;

/// Address of the realtime server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Realtime server origin plus any path prefix, with the API suffix removed.
    origin: Url,
    /// Realtime path appended to the origin.
    realtime_path: String,
    /// Namespace joined after the transport opens.
    namespace: String,
}

impl Endpoint {
    /// Derives the endpoint from API configuration.
    ///
    /// `http://host:5000/api` with suffix `/api` becomes `http://host:5000`.
    pub fn from_config(api: &ApiConfig) -> Result<Self, AppError> {
        let mut origin = Url::parse(&api.base_url).map_err(|e| {
            AppError::configuration(format!("Invalid API base URL '{}': {e}", api.base_url))
        })?;

        match origin.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AppError::configuration(format!(
                    "API base URL must be http or https, got '{other}'"
                )));
            }
        }

        let path = origin.path().trim_end_matches('/').to_string();
        let suffix = api.socket_path_suffix.trim_end_matches('/');
        let stripped = if suffix.is_empty() {
            path.as_str()
        } else {
            path.strip_suffix(suffix).unwrap_or(&path)
        };
        let stripped = if stripped.is_empty() { "/" } else { stripped }.to_string();
        origin.set_path(&stripped);
        origin.set_query(None);
        origin.set_fragment(None);

        let namespace = if api.namespace.starts_with('/') {
            api.namespace.clone()
        } else {
            format!("/{}", api.namespace)
        };

        Ok(Self {
            origin,
            realtime_path: api.realtime_path.clone(),
            namespace,
        })
    }

    /// Origin the realtime server is reached at.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Namespace to join.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full URL for a transport, including the protocol query parameters.
    pub fn transport_url(&self, kind: TransportKind) -> Result<Url, AppError> {
        let base = self.origin.path().trim_end_matches('/');
        let realtime = self.realtime_path.trim_start_matches('/');
        let path = format!("{base}/{realtime}");

        let mut url = self.origin.clone();
        url.set_path(&path);

        if kind == TransportKind::Websocket {
            let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
            url.set_scheme(scheme).map_err(|_| {
                AppError::configuration(format!("Cannot derive websocket URL from {url}"))
            })?;
        }

        url.query_pairs_mut()
            .append_pair("EIO", &ENGINE_PROTOCOL.to_string())
            .append_pair("transport", kind.as_str());

        Ok(url)
    }
}
