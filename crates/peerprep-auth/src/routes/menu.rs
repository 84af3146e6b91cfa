//! Navigation chrome entries per role.

use serde::{Deserialize, Serialize};

use peerprep_core::types::Role;

use super::table::{Access, RouteTable};

/// One link in the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    /// Link text.
    pub title: String,
    /// Target path.
    pub path: String,
}

/// Menu entries visible to a visitor.
///
/// Logged-out visitors see the public menu plus one login link per role;
/// logged-in visitors see the public menu plus their own role's routes.
pub fn menu_for(table: &RouteTable, role: Option<Role>) -> Vec<NavItem> {
    let mut items: Vec<NavItem> = table
        .routes()
        .iter()
        .filter(|r| r.in_menu)
        .filter(|r| match r.access {
            Access::Public => true,
            Access::Protected(owner) => Some(owner) == role,
        })
        .map(|r| NavItem {
            title: r.title.clone(),
            path: r.path.clone(),
        })
        .collect();

    if role.is_none() {
        items.extend(Role::ALL.into_iter().map(|role| {
            let fallback = table.guard_for(role).fallback().to_string();
            NavItem {
                title: format!("{} Login", role.label()),
                path: fallback,
            }
        }));
    }

    items
}

#[cfg(test)]
mod tests {
    use peerprep_core::config::NavigationConfig;

    use super::*;

    #[test]
    fn test_logged_out_menu() {
        let table = RouteTable::default_routes(&NavigationConfig::default());
        let menu = menu_for(&table, None);

        assert!(menu.iter().any(|i| i.path == "/about"));
        assert!(menu.iter().any(|i| i.path == "/login/admin"));
        assert!(!menu.iter().any(|i| i.path.starts_with("/student/")));
    }

    #[test]
    fn test_student_menu() {
        let table = RouteTable::default_routes(&NavigationConfig::default());
        let menu = menu_for(&table, Some(Role::Student));

        assert!(menu.iter().any(|i| i.path == "/student/interviews"));
        assert!(!menu.iter().any(|i| i.path.starts_with("/admin/")));
        assert!(!menu.iter().any(|i| i.path.starts_with("/login/")));
    }
}
