/// Cursor Module
///
/// Statement execution on a scoped connection. A `Cursor` owns at most one
/// prepared statement at a time; executing steps it once and produces a
/// `ResultSet` that reads the remaining rows from the driver on demand.

use crate::config::IsolationLevel;
use crate::core::db::query::Fetch;
use crate::core::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Params, Rows, Statement};
use std::sync::Arc;
use tracing::debug;

/// Represents different SQL statement types, as far as transactions care
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// REPLACE statement
    Replace,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    /// Other statement types (DDL, PRAGMA, ...)
    Other,
}

impl StatementType {
    /// Determines the statement type from the leading keyword of a SQL string,
    /// skipping leading `--` and `/* */` comments
    pub fn from_sql(sql: &str) -> Self {
        let keyword = skip_leading_comments(sql)
            .split(|c: char| c.is_whitespace() || c == ';' || c == '(')
            .next()
            .unwrap_or("")
            .to_uppercase();

        match keyword.as_str() {
            "SELECT" | "WITH" | "VALUES" => StatementType::Select,
            "INSERT" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "REPLACE" => StatementType::Replace,
            "BEGIN" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
                StatementType::Transaction
            }
            _ => StatementType::Other,
        }
    }

    /// Whether an implicit transaction is opened before this statement
    pub fn modifies_data(self) -> bool {
        matches!(
            self,
            StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::Replace
        )
    }
}

/// Returns `sql` from its first token that is neither whitespace nor a comment.
fn skip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line_comment) = rest.strip_prefix("--") {
            rest = match line_comment.find('\n') {
                Some(end) => &line_comment[end + 1..],
                None => "",
            };
        } else if let Some(block_comment) = rest.strip_prefix("/*") {
            rest = match block_comment.find("*/") {
                Some(end) => &block_comment[end + 2..],
                None => "",
            };
        } else {
            return rest;
        }
        rest = rest.trim_start();
    }
}

/// Statement-execution handle bound to a scoped connection.
///
/// Handed out by [`ConnectionManager::connect`](super::ConnectionManager::connect)
/// and closed by it before the connection closes.
pub struct Cursor<'conn> {
    conn: &'conn Connection,
    isolation_level: IsolationLevel,
    statement: Option<Statement<'conn>>,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(conn: &'conn Connection, isolation_level: IsolationLevel) -> Self {
        Cursor {
            conn,
            isolation_level,
            statement: None,
        }
    }

    /// Executes one SQL statement.
    ///
    /// The statement is stepped once before returning, so its side effects
    /// and errors happen here even if no row is ever fetched. For statements
    /// with a result set, the first row is buffered in the `ResultSet` and the
    /// rest are read from the driver on demand. Any previous statement of this
    /// cursor is finalized first.
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<ResultSet<'_>> {
        self.statement = None;
        self.begin_if_needed(sql)?;

        let statement = self.statement.insert(self.conn.prepare(sql)?);
        if statement.column_count() == 0 {
            let changes = statement.execute(params)?;
            return Ok(ResultSet {
                columns: None,
                rows: None,
                pending: None,
                changes,
            });
        }

        let columns: Arc<[String]> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = statement.query(params)?;
        let pending = match rows.next()? {
            Some(row) => Some(read_values(row, columns.len())?),
            None => None,
        };
        Ok(ResultSet {
            columns: Some(columns),
            rows: pending.is_some().then_some(rows),
            pending,
            changes: 0,
        })
    }

    /// Executes several `;`-separated statements, discarding any rows.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.statement = None;
        self.begin_if_needed(sql)?;
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Rowid of the most recent successful INSERT on this connection.
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// The connection this cursor runs on.
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Finalizes the current statement so nothing is left in progress.
    pub fn reset(&mut self) {
        if self.statement.take().is_some() {
            debug!("Finalized cursor statement");
        }
    }

    /// Finalizes the current statement, if any.
    pub fn close(mut self) {
        self.reset();
        debug!("Cursor closed");
    }

    fn begin_if_needed(&self, sql: &str) -> Result<()> {
        let Some(begin) = self.isolation_level.begin_statement() else {
            return Ok(());
        };
        if self.conn.is_autocommit() && StatementType::from_sql(sql).modifies_data() {
            debug!(begin, "Opening implicit transaction");
            self.conn.execute_batch(begin)?;
        }
        Ok(())
    }
}

/// Outcome of [`Cursor::execute`].
///
/// Carries the result metadata (column names, in order) when the statement
/// produces rows. At most the first row is buffered; the rest are read from
/// the driver only when fetched.
pub struct ResultSet<'stmt> {
    columns: Option<Arc<[String]>>,
    rows: Option<Rows<'stmt>>,
    pending: Option<Vec<Value>>,
    changes: usize,
}

impl ResultSet<'_> {
    /// Column names, or `None` when the statement produced no result set.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Rows changed by a statement without a result set.
    pub fn changes(&self) -> usize {
        self.changes
    }
}

impl Fetch for ResultSet<'_> {
    fn description(&self) -> Option<Arc<[String]>> {
        self.columns.clone()
    }

    fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        if let Some(values) = self.pending.take() {
            return Ok(Some(values));
        }
        let width = self.columns.as_ref().map_or(0, |columns| columns.len());
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };

        match rows.next()? {
            Some(row) => Ok(Some(read_values(row, width)?)),
            None => {
                // Dropping the rows resets the statement
                self.rows = None;
                Ok(None)
            }
        }
    }
}

fn read_values(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width)
        .map(|idx| row.get_ref(idx).map(Value::from))
        .collect()
}
