//! Route listing and guard checks.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use peerprep_auth::routes::{Access, menu_for};
use peerprep_auth::{FlagSource, NavigationOutcome, RouteTable, Router, SessionStore};
use peerprep_core::config::AppConfig;
use peerprep_core::error::AppError;
use peerprep_core::types::Role;

/// Arguments for `routes`
#[derive(Debug, Args)]
pub struct RoutesArgs {
    /// Only routes protected for this role
    #[arg(short, long, conflicts_with = "public")]
    pub role: Option<Role>,
    /// Only public routes
    #[arg(long)]
    pub public: bool,
    /// Show the navigation menu for the role instead of the route table
    #[arg(long)]
    pub menu: bool,
}

/// Arguments for `check`
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Path to evaluate, e.g. `/student/dashboard`
    pub path: String,
}

/// Route display row
#[derive(Debug, Serialize, Tabled)]
struct RouteRow {
    /// Path
    path: String,
    /// Title
    title: String,
    /// Access
    access: String,
    /// Fallback
    fallback: String,
    /// Menu
    menu: String,
}

/// Menu display row
#[derive(Debug, Serialize, Tabled)]
struct MenuRow {
    /// Title
    title: String,
    /// Path
    path: String,
}

/// Lists routes, optionally narrowed to one access chunk.
pub fn list(args: &RoutesArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let table = RouteTable::default_routes(&config.navigation);

    if args.menu {
        let rows: Vec<MenuRow> = menu_for(&table, args.role)
            .into_iter()
            .map(|item| MenuRow {
                title: item.title,
                path: item.path,
            })
            .collect();
        output::print_list(&rows, format);
        return Ok(());
    }

    let routes = match (args.role, args.public) {
        (Some(role), _) => table.chunk(Some(role)),
        (None, true) => table.chunk(None),
        (None, false) => table.routes().iter().collect(),
    };

    let rows: Vec<RouteRow> = routes
        .into_iter()
        .map(|route| {
            let (access, fallback) = match route.access {
                Access::Public => ("public".to_string(), "-".to_string()),
                Access::Protected(role) => (
                    role.as_str().to_string(),
                    table.guard_for(role).fallback().to_string(),
                ),
            };
            RouteRow {
                path: route.path.clone(),
                title: route.title.clone(),
                access,
                fallback,
                menu: if route.in_menu { "✓" } else { "✗" }.to_string(),
            }
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}

/// Navigates to a path with the stored flags and reports the outcome.
pub fn check(
    args: &CheckArgs,
    config: &AppConfig,
    store: SessionStore,
    format: OutputFormat,
) -> Result<(), AppError> {
    let outcome = evaluate(&args.path, config, Arc::new(store));

    match format {
        OutputFormat::Json => output::print_item(&outcome),
        OutputFormat::Table => match &outcome {
            NavigationOutcome::Rendered { path } => {
                output::print_success(&format!("{path} renders"));
            }
            NavigationOutcome::Redirected { from, to } => {
                output::print_warning(&format!("{from} redirects to {to} (history replaced)"));
            }
            NavigationOutcome::NotFound { path } => {
                output::print_warning(&format!("{path} has no route (not-found view)"));
            }
        },
    }
    Ok(())
}

fn evaluate(path: &str, config: &AppConfig, flags: Arc<dyn FlagSource>) -> NavigationOutcome {
    let table = Arc::new(RouteTable::default_routes(&config.navigation));
    let mut router = Router::new(table, flags);
    router.navigate(path)
}

#[cfg(test)]
mod tests {
    use peerprep_auth::LoginRecord;

    use super::*;

    #[test]
    fn test_evaluate_follows_stored_role() {
        let config = AppConfig::default();
        let store = Arc::new(SessionStore::in_memory());

        assert_eq!(
            evaluate("/student/feedback", &config, store.clone()),
            NavigationOutcome::Redirected {
                from: "/student/feedback".to_string(),
                to: "/login/student".to_string(),
            }
        );

        store
            .record_login(&LoginRecord::new(Role::Student, "Ada", "ada@example.edu"))
            .unwrap();
        assert_eq!(
            evaluate("/student/feedback", &config, store.clone()),
            NavigationOutcome::Rendered {
                path: "/student/feedback".to_string()
            }
        );
        assert!(matches!(
            evaluate("/nowhere", &config, store),
            NavigationOutcome::NotFound { .. }
        ));
    }
}
