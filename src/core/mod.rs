/// Core Module for scopedb
///
/// Scoped database access and the error types it surfaces.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, Result, ScopeError};
