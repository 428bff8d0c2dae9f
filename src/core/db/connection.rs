/// Connection Management Module
///
/// Scoped connection lifecycle: every unit of work gets its own connection,
/// committed when the work succeeds, rolled back when it fails, and closed on
/// every exit path.

use crate::config::ConnectionParams;
use crate::core::db::cursor::Cursor;
use crate::core::db::query::{result_iter, Fetch, RowIter};
use crate::core::{DbError, ScopeError};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Emits the close notice when a scoped block ends, unwinding included.
///
/// Declared before the connection so it drops after it.
struct CloseNotice;

impl Drop for CloseNotice {
    fn drop(&mut self) {
        info!("Database connection closed.");
    }
}

/// Connection manager for scoped database access
///
/// Holds nothing but the connection parameters, so one manager can be shared
/// between threads; each scoped block opens an independent connection.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    params: ConnectionParams,
}

impl ConnectionManager {
    /// Creates a new connection manager
    pub fn new(params: ConnectionParams) -> Self {
        ConnectionManager { params }
    }

    /// The parameters every scoped connection is opened with
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Runs `work` with a cursor on a fresh connection.
    ///
    /// - `Ok` from `work`: the connection is committed.
    /// - `Err` from `work`: the connection is rolled back. Driver errors come
    ///   back as [`DbError::ConnectionFailure`]; other errors come back as-is.
    /// - Always: the cursor is closed, then the connection. Its last
    ///   statement is finalized before the commit or rollback, so rows left
    ///   unfetched never hold the transaction open.
    ///
    /// Failures to open, commit or close also surface as `ConnectionFailure`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use scopedb::{ConnectionManager, ConnectionParams};
    ///
    /// let manager = ConnectionManager::new(ConnectionParams::new("app.db"));
    /// manager.connect(|cursor| -> scopedb::Result<()> {
    ///     cursor.execute("INSERT INTO t (name) VALUES (?1)", &["a"])?;
    ///     Ok(())
    /// })?;
    /// # Ok::<(), scopedb::DbError>(())
    /// ```
    pub fn connect<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        E: ScopeError,
        F: FnOnce(&mut Cursor<'_>) -> std::result::Result<T, E>,
    {
        info!(path = %self.params.path, "Connecting to database...");
        let _notice = CloseNotice;
        let conn = self.open().map_err(connection_failure)?;

        let mut cursor = Cursor::new(&conn, self.params.isolation_level);
        let outcome = work(&mut cursor);
        // No statement may be in progress when the transaction ends
        cursor.reset();
        let outcome = finalize(&conn, outcome);
        cursor.close();
        release(conn, outcome)
    }

    /// Runs `work` with the raw connection, for callers managing their own
    /// statements. Same commit / rollback / close guarantees as [`connect`].
    ///
    /// Unless the isolation level is `autocommit`, a transaction is begun on
    /// entry, so statements that cannot run inside one (such as switching the
    /// journal mode) belong in [`connect`] instead.
    ///
    /// [`connect`]: ConnectionManager::connect
    pub fn raw_connect<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        E: ScopeError,
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
    {
        info!(path = %self.params.path, "Connecting to database...");
        let _notice = CloseNotice;
        let conn = self.open().map_err(connection_failure)?;

        if let Some(begin) = self.params.isolation_level.begin_statement() {
            debug!(begin, "Opening transaction");
            if let Err(err) = conn.execute_batch(begin) {
                return release(conn, Err(connection_failure(err)));
            }
        }

        let outcome = finalize(&conn, work(&conn));
        release(conn, outcome)
    }

    /// Iterates the rows of an executed statement; see [`result_iter`].
    pub fn result_iter<'a, F: Fetch + ?Sized>(
        &self,
        source: &'a mut F,
        chunk_size: usize,
    ) -> RowIter<'a, F> {
        result_iter(source, chunk_size)
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(&self.params.path, self.params.open_flags())?;
        conn.busy_timeout(self.params.busy_timeout())?;
        Ok(conn)
    }
}

fn connection_failure<E: ScopeError>(err: rusqlite::Error) -> E {
    E::from(DbError::ConnectionFailure(err))
}

/// Commits or rolls back according to `outcome`.
fn finalize<T, E: ScopeError>(
    conn: &Connection,
    outcome: std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    match outcome {
        Ok(value) => match commit(conn) {
            Ok(()) => Ok(value),
            Err(err) => {
                warn!(error = %err, "Commit failed");
                rollback(conn);
                Err(connection_failure(err))
            }
        },
        Err(err) => {
            rollback(conn);
            match err.into_driver_error() {
                Ok(driver_err) => {
                    warn!(error = %driver_err, "Scoped block failed");
                    Err(connection_failure(driver_err))
                }
                Err(other) => Err(other),
            }
        }
    }
}

fn commit(conn: &Connection) -> rusqlite::Result<()> {
    if conn.is_autocommit() {
        return Ok(());
    }
    debug!("Committing transaction");
    conn.execute_batch("COMMIT")
}

/// Best effort: a failed rollback is logged, never raised.
fn rollback(conn: &Connection) {
    if conn.is_autocommit() {
        return;
    }
    debug!("Rolling back transaction");
    if let Err(err) = conn.execute_batch("ROLLBACK") {
        warn!(error = %err, "Rollback failed");
    }
}

/// Closes the connection. A close failure only wins over a successful outcome.
fn release<T, E: ScopeError>(
    conn: Connection,
    outcome: std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    match (conn.close(), outcome) {
        (Ok(()), outcome) => outcome,
        (Err((_conn, err)), Ok(_)) => Err(connection_failure(err)),
        (Err((_conn, err)), Err(original)) => {
            warn!(error = %err, "Failed to close connection");
            Err(original)
        }
    }
}
