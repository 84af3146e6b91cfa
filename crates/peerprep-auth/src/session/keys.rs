//! Well-known session flag keys.
//!
//! Role markers live under [`Role::flag_key`](peerprep_core::types::Role::flag_key).

/// Display name shown in navigation chrome.
pub const NAME: &str = "name";
/// Display email shown in navigation chrome.
pub const EMAIL: &str = "email";
/// Optional avatar URL.
pub const AVATAR: &str = "avatar";
/// Optional opaque session token.
pub const TOKEN: &str = "token";
/// Optional `name=value` cookie attached to realtime transports.
pub const SESSION_COOKIE: &str = "session_cookie";

/// Value a role marker must hold for the role to count as logged in.
pub const AUTHENTICATED_MARKER: &str = "true";
