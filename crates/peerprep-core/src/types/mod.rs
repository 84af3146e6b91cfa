//! Core type definitions used across the PeerPrep workspace.

pub mod role;

pub use role::Role;
