//! Client-side routing: route table, history, router, and menus.

pub mod history;
pub mod menu;
pub mod router;
pub mod table;

pub use history::History;
pub use menu::{NavItem, menu_for};
pub use router::{NavigationOutcome, Router};
pub use table::{Access, Route, RouteTable};
