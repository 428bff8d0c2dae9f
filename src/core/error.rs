/// Error Module
///
/// This module defines the error types surfaced by scoped database access.
/// Driver errors raised inside a scoped block are kept apart from everything
/// else so the scope boundary can wrap them without touching caller errors.
use thiserror::Error;

/// Error type for scopedb operations.
///
/// - Driver failures at the scope boundary (`ConnectionFailure`)
/// - Raw driver errors raised while a block is running (`Driver`)
/// - Rows whose width disagrees with the result metadata
/// - Parameter loading problems
#[derive(Error, Debug)]
pub enum DbError {
    /// A driver error surfaced by a scoped block: opening, executing within,
    /// or finalizing it. The original driver error is kept as the source.
    #[error("Database connection failed: {0}")]
    ConnectionFailure(#[source] rusqlite::Error),

    /// Errors from SQLite operations inside a scoped block
    #[error("Driver error: {0}")]
    Driver(#[from] rusqlite::Error),

    /// A fetched row does not have one value per column
    #[error("Row shape mismatch: expected {expected} values, got {actual}")]
    RowShapeMismatch { expected: usize, actual: usize },

    /// Connection parameter loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors that may be returned from a scoped block.
///
/// The scope boundary needs to tell driver failures (rolled back and wrapped
/// as [`DbError::ConnectionFailure`]) from anything else (rolled back and
/// returned untouched). Caller error types opt in by implementing this trait.
pub trait ScopeError: From<DbError> + Sized {
    /// Splits out the driver error, or hands `self` back unchanged.
    fn into_driver_error(self) -> std::result::Result<rusqlite::Error, Self>;
}

impl ScopeError for DbError {
    fn into_driver_error(self) -> std::result::Result<rusqlite::Error, Self> {
        match self {
            DbError::Driver(err) => Ok(err),
            other => Err(other),
        }
    }
}

impl DbError {
    /// Returns true for `ConnectionFailure`.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, DbError::ConnectionFailure(_))
    }
}
