// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::{ConnectionParams, IsolationLevel};
pub use crate::core::db::{
    result_iter, ConnectionManager, Cursor, Fetch, ResultSet, Row, RowIter, WalStatus,
    DEFAULT_CHUNK_SIZE,
};
pub use crate::core::{DbError, Result, ScopeError};
