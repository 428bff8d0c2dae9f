/// Database Module
///
/// The database layer is split into four concerns:
/// - **Connection Management** (`connection.rs`): scoped connections with commit/rollback/close guarantees
/// - **Statement Execution** (`cursor.rs`): cursors and the result sets they produce
/// - **Row Iteration** (`query.rs`): lazy, chunked iteration over result sets
/// - **Journal Mode** (`wal.rs`): the best-effort switch to write-ahead logging
///
/// ## Error Handling
///
/// Driver errors raised inside a scoped block surface as `DbError::ConnectionFailure`;
/// everything else passes through unchanged.
pub mod connection;
pub mod cursor;
pub mod query;
pub mod wal;

pub use connection::*;
pub use cursor::*;
pub use query::*;
pub use wal::*;
