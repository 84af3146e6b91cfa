//! Locally persisted session flags.

pub mod keys;
pub mod profile;
pub mod store;

pub use profile::{LoginRecord, SessionProfile};
pub use store::SessionStore;
