//! Role guard: the render-or-redirect predicate for protected routes.

pub mod role_guard;

pub use role_guard::{FlagSource, GuardDecision, Redirect, RoleGuard};
