//! Session flag commands: login, logout, whoami.

use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use peerprep_auth::{LoginRecord, SessionStore};
use peerprep_core::error::AppError;
use peerprep_core::types::Role;

/// Arguments for `login`
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Role to log in as (student, coordinator, admin)
    #[arg(short, long)]
    pub role: Role,
    /// Display name
    #[arg(short, long)]
    pub name: String,
    /// Display email
    #[arg(short, long)]
    pub email: String,
    /// Avatar URL
    #[arg(long)]
    pub avatar: Option<String>,
    /// Opaque session token
    #[arg(long)]
    pub token: Option<String>,
    /// Session cookie (`name=value`) for the realtime connection
    #[arg(long)]
    pub cookie: Option<String>,
}

/// Arguments for `logout`
#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Skip confirmation
    #[arg(long)]
    pub force: bool,
}

/// Profile view printed by `whoami`
#[derive(Debug, Serialize)]
struct WhoAmI {
    logged_in: bool,
    role: Option<Role>,
    name: String,
    email: Option<String>,
    avatar: Option<String>,
    has_token: bool,
    has_cookie: bool,
}

/// Writes the flags a successful login produces.
///
/// A bare cookie value is stored as `<cookie_name>=<value>`.
pub fn login(args: &LoginArgs, store: &SessionStore, cookie_name: &str) -> Result<(), AppError> {
    let mut record = LoginRecord::new(args.role, &args.name, &args.email);
    if let Some(avatar) = &args.avatar {
        record = record.with_avatar(avatar);
    }
    if let Some(token) = &args.token {
        record = record.with_token(token);
    }
    if let Some(cookie) = &args.cookie {
        if cookie.contains('=') {
            record = record.with_cookie(cookie);
        } else {
            record = record.with_cookie(format!("{cookie_name}={cookie}"));
        }
    }

    store.record_login(&record)?;
    output::print_success(&format!(
        "Logged in as {} ({})",
        args.name,
        args.role.label()
    ));
    Ok(())
}

/// Clears every session flag, asking first unless forced.
pub fn logout(args: &LogoutArgs, store: &SessionStore) -> Result<(), AppError> {
    if store.snapshot().is_empty() {
        output::print_warning("No session to clear");
        return Ok(());
    }

    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Clear the local session?")
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.logout()?;
    output::print_success("Logged out");
    Ok(())
}

/// Prints the current session profile.
pub fn whoami(store: &SessionStore, format: OutputFormat) -> Result<(), AppError> {
    let profile = store.profile();
    let view = WhoAmI {
        logged_in: profile.is_logged_in(),
        role: profile.role,
        name: profile.display_name().to_string(),
        email: profile.email.clone(),
        avatar: profile.avatar.clone(),
        has_token: profile.has_token,
        has_cookie: profile.has_cookie,
    };

    match format {
        OutputFormat::Json => output::print_item(&view),
        OutputFormat::Table => {
            let role = view
                .role
                .map(|r| r.label().to_string())
                .unwrap_or_else(|| "-".to_string());
            output::print_kv("Logged in", if view.logged_in { "yes" } else { "no" });
            output::print_kv("Role", &role);
            output::print_kv("Name", &view.name);
            output::print_kv("Email", view.email.as_deref().unwrap_or("-"));
            output::print_kv("Avatar", view.avatar.as_deref().unwrap_or("-"));
            output::print_kv("Token", if view.has_token { "stored" } else { "-" });
            output::print_kv("Cookie", if view.has_cookie { "stored" } else { "-" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_args() -> LoginArgs {
        LoginArgs {
            role: Role::Coordinator,
            name: "Lin".to_string(),
            email: "lin@example.edu".to_string(),
            avatar: None,
            token: Some("tok".to_string()),
            cookie: Some("connect.sid=s1".to_string()),
        }
    }

    #[test]
    fn test_login_then_forced_logout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();

        login(&login_args(), &store, "connect.sid").unwrap();
        assert_eq!(store.profile().role, Some(Role::Coordinator));
        assert_eq!(store.session_cookie().as_deref(), Some("connect.sid=s1"));

        logout(&LogoutArgs { force: true }, &store).unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_bare_cookie_gets_configured_name() {
        let store = SessionStore::in_memory();
        let args = LoginArgs {
            cookie: Some("s2".to_string()),
            ..login_args()
        };

        login(&args, &store, "peerprep.sid").unwrap();
        assert_eq!(store.session_cookie().as_deref(), Some("peerprep.sid=s2"));
    }

    #[test]
    fn test_logout_without_session_is_noop() {
        let store = SessionStore::in_memory();
        logout(&LogoutArgs { force: false }, &store).unwrap();
    }
}
