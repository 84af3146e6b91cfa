//! Convenience result type alias for PeerPrep.

use crate::error::AppError;

/// A specialized `Result` type for PeerPrep operations.
pub type AppResult<T> = Result<T, AppError>;
