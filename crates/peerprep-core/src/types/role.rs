//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Roles served by the PeerPrep client.
///
/// A role selects the navigation chrome and the protected routes a user
/// may see. Roles are not hierarchical: an administrator flag does not
/// unlock student routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A student practicing mock interviews.
    Student,
    /// A coordinator who pairs students and manages schedules.
    Coordinator,
    /// A platform administrator.
    Admin,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Role; 3] = [Role::Student, Role::Coordinator, Role::Admin];

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Coordinator => "coordinator",
            Self::Admin => "admin",
        }
    }

    /// Session flag key holding this role's authenticated marker.
    pub fn flag_key(&self) -> &'static str {
        match self {
            Self::Student => "student_auth",
            Self::Coordinator => "coordinator_auth",
            Self::Admin => "admin_auth",
        }
    }

    /// Human-readable label for navigation chrome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Coordinator => "Coordinator",
            Self::Admin => "Administrator",
        }
    }

    /// Default route a blocked visitor is sent to.
    pub fn default_fallback(&self) -> String {
        format!("/login/{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "coordinator" => Ok(Self::Coordinator),
            "admin" | "administrator" => Ok(Self::Admin),
            _ => Err(AppError::validation(format!(
                "Invalid role: '{s}'. Expected one of: student, coordinator, admin"
            ))),
        }
    }
}
