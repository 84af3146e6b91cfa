//! Route definitions grouped by access level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use peerprep_core::config::NavigationConfig;
use peerprep_core::types::Role;

use crate::guard::RoleGuard;

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "access", content = "role", rename_all = "snake_case")]
pub enum Access {
    /// Anyone, logged in or not.
    Public,
    /// Only visitors whose role marker is set.
    Protected(Role),
}

/// A single client route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Absolute path, without trailing slash (except `/`).
    pub path: String,
    /// Page title.
    pub title: String,
    /// Access level.
    pub access: Access,
    /// Whether the route appears in navigation chrome.
    pub in_menu: bool,
}

impl Route {
    fn new(path: &str, title: &str, access: Access, in_menu: bool) -> Self {
        Self {
            path: path.to_string(),
            title: title.to_string(),
            access,
            in_menu,
        }
    }

    fn public(path: &str, title: &str, in_menu: bool) -> Self {
        Self::new(path, title, Access::Public, in_menu)
    }

    fn protected(role: Role, path: &str, title: &str) -> Self {
        Self::new(path, title, Access::Protected(role), true)
    }
}

/// All routes plus one guard per role.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    guards: HashMap<Role, RoleGuard>,
}

impl RouteTable {
    /// Builds a table from explicit routes, taking fallbacks from config.
    pub fn new(routes: Vec<Route>, navigation: &NavigationConfig) -> Self {
        let guards = Role::ALL
            .into_iter()
            .map(|role| (role, RoleGuard::from_config(role, navigation)))
            .collect();
        Self { routes, guards }
    }

    /// The PeerPrep route set: public pages plus one chunk per role.
    pub fn default_routes(navigation: &NavigationConfig) -> Self {
        let mut routes = vec![
            Route::public("/", "Home", true),
            Route::public("/about", "About", true),
            Route::public("/contact", "Contact", true),
            Route::public("/privacy", "Privacy Policy", false),
            Route::public("/terms", "Terms of Service", false),
        ];

        for role in Role::ALL {
            routes.push(Route::public(
                &role.default_fallback(),
                &format!("{} Login", role.label()),
                false,
            ));
        }

        routes.extend([
            Route::protected(Role::Student, "/student/dashboard", "Dashboard"),
            Route::protected(Role::Student, "/student/interviews", "My Interviews"),
            Route::protected(Role::Student, "/student/feedback", "Feedback"),
            Route::protected(Role::Student, "/student/profile", "Profile"),
            Route::protected(Role::Coordinator, "/coordinator/dashboard", "Dashboard"),
            Route::protected(Role::Coordinator, "/coordinator/students", "Students"),
            Route::protected(Role::Coordinator, "/coordinator/pairing", "Pairing"),
            Route::protected(Role::Coordinator, "/coordinator/schedule", "Schedule"),
            Route::protected(Role::Admin, "/admin/dashboard", "Dashboard"),
            Route::protected(Role::Admin, "/admin/coordinators", "Coordinators"),
            Route::protected(Role::Admin, "/admin/settings", "Settings"),
        ]);

        Self::new(routes, navigation)
    }

    /// Every route in declaration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Finds the route for a path. Query strings, fragments, and a
    /// trailing slash are ignored.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let normalized = normalize(path);
        self.routes.iter().find(|r| r.path == normalized)
    }

    /// The guard for a role.
    pub fn guard_for(&self, role: Role) -> &RoleGuard {
        // every role gets a guard in `new`
        &self.guards[&role]
    }

    /// Routes belonging to one access chunk: `None` for public routes,
    /// `Some(role)` for that role's protected routes.
    pub fn chunk(&self, role: Option<Role>) -> Vec<&Route> {
        self.routes
            .iter()
            .filter(|r| match (r.access, role) {
                (Access::Public, None) => true,
                (Access::Protected(owner), Some(role)) => owner == role,
                _ => false,
            })
            .collect()
    }
}

/// Strips query, fragment, and trailing slash; ensures a leading slash.
pub(crate) fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
