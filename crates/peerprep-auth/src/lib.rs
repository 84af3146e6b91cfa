//! # peerprep-auth
//!
//! Client-side session state and route protection for PeerPrep.
//!
//! ## Modules
//!
//! - `session`: locally persisted session flags written at login and cleared at logout
//! - `guard`: the role guard predicate deciding render vs. redirect
//! - `routes`: route table, history, router, and navigation menu
//!
//! Nothing here is a security boundary. The flags are advisory UI state
//! and the guard only controls what the client shows; the server enforces
//! authorization on every request.

pub mod guard;
pub mod routes;
pub mod session;

pub use guard::{FlagSource, GuardDecision, Redirect, RoleGuard};
pub use routes::{History, NavigationOutcome, RouteTable, Router};
pub use session::{LoginRecord, SessionProfile, SessionStore};
