//! # peerprep-core
//!
//! Core crate for the PeerPrep client. Contains configuration schemas,
//! the [`Role`](types::Role) enumeration shared by routing and session
//! handling, and the unified error system.
//!
//! This crate has **no** internal dependencies on other PeerPrep crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
