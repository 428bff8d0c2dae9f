/// # Test Utilities Module
///
/// Fixtures shared by the unit tests:
/// - On-disk temporary databases (each scoped block opens its own connection,
///   so `:memory:` would not survive between blocks)
/// - A scripted `Fetch` source that records every fetch call
/// - A counting wrapper around any other `Fetch` source
/// - A caller-defined error type for pass-through checks

use crate::config::ConnectionParams;
use crate::core::db::query::Fetch;
use crate::core::{DbError, Result, ScopeError};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary database file removed when the fixture drops
pub struct TempDatabase {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TempDatabase {
    /// Empty database file in a fresh temporary directory
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");
        Connection::open(&path).expect("create test database");
        TempDatabase { _dir: dir, path }
    }

    /// Database holding `t(id, name)` with rows (1,'a'), (2,'b'), (3,'c')
    pub fn with_letters() -> Self {
        let db = Self::new();
        db.open()
            .execute_batch(
                "
                CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
                INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c');
            ",
            )
            .expect("seed test database");
        db
    }

    pub fn params(&self) -> ConnectionParams {
        ConnectionParams::new(self.path.to_string_lossy())
    }

    /// Direct connection for inspecting the database outside any scope
    pub fn open(&self) -> Connection {
        Connection::open(&self.path).expect("open test database")
    }
}

/// Number of rows in `t`
pub fn count_rows(db: &TempDatabase) -> i64 {
    db.open()
        .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
        .expect("count rows")
}

/// Journal mode as reported by a fresh connection
pub fn journal_mode_of(db: &TempDatabase) -> String {
    db.open()
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .expect("read journal mode")
}

/// One recorded fetch call and how many rows it returned
#[derive(Debug, Clone, PartialEq)]
pub enum FetchCall {
    /// fetch_one; whether a row came back
    One(bool),
    /// fetch_many; requested size and rows returned
    Many(usize, usize),
    /// fetch_all; rows returned
    All(usize),
    /// a call that returned an error
    Failed,
}

/// In-memory `Fetch` source with a fixed result and a call log
pub struct ScriptedFetch {
    columns: Option<Arc<[String]>>,
    rows: VecDeque<Vec<Value>>,
    fail_after: Option<usize>,
    pub calls: Vec<FetchCall>,
}

impl ScriptedFetch {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        ScriptedFetch {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
            rows: rows.into(),
            fail_after: None,
            calls: Vec::new(),
        }
    }

    /// Source for a statement that produced no result set
    pub fn without_description() -> Self {
        ScriptedFetch {
            columns: None,
            rows: VecDeque::new(),
            fail_after: None,
            calls: Vec::new(),
        }
    }

    /// Every fetch call after the first `calls` returns a driver error
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    fn check_failure(&mut self) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.calls.len() >= limit) {
            self.calls.push(FetchCall::Failed);
            return Err(DbError::Driver(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl Fetch for ScriptedFetch {
    fn description(&self) -> Option<Arc<[String]>> {
        self.columns.clone()
    }

    fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        self.check_failure()?;
        let row = self.rows.pop_front();
        self.calls.push(FetchCall::One(row.is_some()));
        Ok(row)
    }

    fn fetch_many(&mut self, size: usize) -> Result<Vec<Vec<Value>>> {
        self.check_failure()?;
        let take = size.min(self.rows.len());
        let batch: Vec<_> = self.rows.drain(..take).collect();
        self.calls.push(FetchCall::Many(size, batch.len()));
        Ok(batch)
    }

    fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        self.check_failure()?;
        let batch: Vec<_> = self.rows.drain(..).collect();
        self.calls.push(FetchCall::All(batch.len()));
        Ok(batch)
    }
}

/// Records the calls made against any other `Fetch` source
pub struct CountingFetch<F> {
    inner: F,
    pub calls: Vec<FetchCall>,
}

impl<F: Fetch> CountingFetch<F> {
    pub fn new(inner: F) -> Self {
        CountingFetch {
            inner,
            calls: Vec::new(),
        }
    }
}

impl<F: Fetch> Fetch for CountingFetch<F> {
    fn description(&self) -> Option<Arc<[String]>> {
        self.inner.description()
    }

    fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        let row = self.inner.fetch_one()?;
        self.calls.push(FetchCall::One(row.is_some()));
        Ok(row)
    }

    fn fetch_many(&mut self, size: usize) -> Result<Vec<Vec<Value>>> {
        let batch = self.inner.fetch_many(size)?;
        self.calls.push(FetchCall::Many(size, batch.len()));
        Ok(batch)
    }

    fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        let batch = self.inner.fetch_all()?;
        self.calls.push(FetchCall::All(batch.len()));
        Ok(batch)
    }
}

/// Error type of an imaginary caller, wrapping the crate error
#[derive(Debug)]
pub enum AppError {
    Db(DbError),
    Invalid(&'static str),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        AppError::Db(err)
    }
}

impl ScopeError for AppError {
    fn into_driver_error(self) -> std::result::Result<rusqlite::Error, Self> {
        match self {
            AppError::Db(err) => err.into_driver_error().map_err(AppError::Db),
            other => Err(other),
        }
    }
}
