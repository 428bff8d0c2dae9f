/// Write-ahead logging switch.
///
/// A one-shot, best-effort routine: it reads the current journal mode and
/// asks SQLite for WAL when the database is in any other mode.

use crate::core::db::connection::ConnectionManager;
use crate::core::db::cursor::Cursor;
use crate::core::db::query::result_iter;
use crate::core::Result;
use rusqlite::types::Value;
use tracing::{debug, error, info, warn};

const JOURNAL_MODE_COLUMN: &str = "journal_mode";

/// What `enable_wal` found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalStatus {
    /// The database already reported `wal`; nothing was changed.
    AlreadyEnabled,
    /// The mode-change statement was issued. `current` is the mode SQLite
    /// reported back, which stays e.g. `memory` for in-memory databases.
    Switched { previous: String, current: String },
    /// No journal mode was reported; nothing was changed.
    Unreported,
    /// A database error occurred and was logged.
    Failed,
}

impl ConnectionManager {
    /// Switches the journal mode to WAL unless it already is.
    ///
    /// Never returns an error: failures, including failing to open the
    /// database, are logged and reported as [`WalStatus::Failed`].
    pub fn enable_wal(&self) -> WalStatus {
        let outcome = self.connect(|cursor| -> Result<WalStatus> {
            let Some(previous) = journal_mode(cursor, "PRAGMA journal_mode")? else {
                return Ok(WalStatus::Unreported);
            };
            if !needs_wal_switch(&previous) {
                debug!(mode = %previous, "Journal mode already WAL");
                return Ok(WalStatus::AlreadyEnabled);
            }

            info!(from = %previous, "set journal_mode=wal");
            let current = journal_mode(cursor, "PRAGMA journal_mode = WAL;")?.unwrap_or_default();
            if needs_wal_switch(&current) {
                warn!(mode = %current, "Database kept its journal mode");
            }
            Ok(WalStatus::Switched { previous, current })
        });

        outcome.unwrap_or_else(|err| {
            error!(error = %err, "An error occurred during query execution");
            WalStatus::Failed
        })
    }
}

/// Whether a reported journal mode is something other than WAL.
pub fn needs_wal_switch(mode: &str) -> bool {
    !mode.eq_ignore_ascii_case("wal")
}

/// Runs a journal-mode pragma and reads the single row it reports.
fn journal_mode(cursor: &mut Cursor<'_>, sql: &str) -> Result<Option<String>> {
    let mut results = cursor.execute(sql, [])?;
    let row = match result_iter(&mut results, 1).next() {
        Some(row) => row?,
        None => return Ok(None),
    };

    match row.get(JOURNAL_MODE_COLUMN) {
        Some(Value::Text(mode)) if !mode.is_empty() => Ok(Some(mode.clone())),
        _ => Ok(None),
    }
}
