//! Typed views over the raw session flags.

use serde::{Deserialize, Serialize};

use peerprep_core::types::Role;

/// What the login flow writes into the flag store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    /// Role the user logged in as.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Display email.
    pub email: String,
    /// Avatar URL, if the account has one.
    pub avatar: Option<String>,
    /// Opaque session token, if the backend issued one.
    pub token: Option<String>,
    /// Session cookie (`name=value`) for credentialed transports.
    pub cookie: Option<String>,
}

impl LoginRecord {
    /// Start a login record with the required fields.
    pub fn new(role: Role, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            email: email.into(),
            avatar: None,
            token: None,
            cookie: None,
        }
    }

    /// Attach an avatar URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Attach a session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach a session cookie.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

/// Read-only profile shown by navigation chrome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    /// First role whose marker is set, if any.
    pub role: Option<Role>,
    /// Display name.
    pub name: Option<String>,
    /// Display email.
    pub email: Option<String>,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Whether a session token is stored.
    pub has_token: bool,
    /// Whether a session cookie is stored.
    pub has_cookie: bool,
}

impl SessionProfile {
    /// Whether any role marker is set.
    pub fn is_logged_in(&self) -> bool {
        self.role.is_some()
    }

    /// Name to display, falling back to the email and then a placeholder.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Guest")
    }
}
