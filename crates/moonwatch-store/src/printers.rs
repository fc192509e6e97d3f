// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent printer list and login preferences backed by SQLite.
//
// Printers keep the order they were registered in via an explicit `position`
// column; ids are opaque strings and the primary key.  Preferences are plain
// key/value rows (saved server address, API key, selected printer).

use std::path::Path;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, info, instrument, warn};

use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::types::{Credentials, PrinterEndpoint, PrinterId};

use crate::fingerprint::short_fingerprint;

const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS printers (
        id       TEXT PRIMARY KEY,
        base_url TEXT NOT NULL,
        api_key  TEXT NOT NULL,
        name     TEXT NOT NULL,
        position INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS preferences (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

pub const PREF_SERVER_ADDRESS: &str = "server_address";
pub const PREF_API_KEY: &str = "api_key";
pub const PREF_SELECTED_PRINTER: &str = "selected_printer_id";

/// A registered printer as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPrinter {
    pub endpoint: PrinterEndpoint,
    pub name: String,
}

/// Outcome of [`PrinterStore::import_legacy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

fn db_err(context: &str) -> impl FnOnce(rusqlite::Error) -> MoonwatchError + '_ {
    move |e| MoonwatchError::Database(format!("{context}: {e}"))
}

/// Printer list and preferences in one SQLite database.
///
/// Synchronous, like every `rusqlite` API.  Callers on an async runtime
/// keep it behind a mutex and hold the lock only for the call.
pub struct PrinterStore {
    conn: Connection,
}

impl PrinterStore {
    /// Open (or create) the database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err("open"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err("WAL pragma"))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(db_err("create tables"))?;

        info!("printer store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("open in-memory"))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(db_err("create tables"))?;

        debug!("in-memory printer store opened");
        Ok(Self { conn })
    }

    // -- Printers --

    /// Append a printer after every existing one.
    #[instrument(skip(self, endpoint), fields(printer = %endpoint.id, key = %short_fingerprint(&endpoint.api_key)))]
    pub fn insert(&self, endpoint: &PrinterEndpoint, name: &str) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO printers (id, base_url, api_key, name, position)
             VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(position), -1) + 1 FROM printers))",
            params![endpoint.id.as_str(), endpoint.base_url, endpoint.api_key, name],
        );

        match result {
            Ok(_) => {
                info!(url = %endpoint.base_url, "printer stored");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(MoonwatchError::DuplicateId(endpoint.id.to_string()))
            }
            Err(e) => Err(MoonwatchError::Database(format!("insert printer: {e}"))),
        }
    }

    /// Replace the address and key of an existing printer, keeping its
    /// name and position.
    #[instrument(skip(self, endpoint), fields(printer = %endpoint.id))]
    pub fn update_endpoint(&self, endpoint: &PrinterEndpoint) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE printers SET base_url = ?1, api_key = ?2 WHERE id = ?3",
                params![endpoint.base_url, endpoint.api_key, endpoint.id.as_str()],
            )
            .map_err(db_err("update printer"))?;

        if rows == 0 {
            return Err(MoonwatchError::NotFound(endpoint.id.to_string()));
        }
        debug!("printer endpoint updated");
        Ok(())
    }

    /// Remove a printer.  Removing an unknown id is not an error.
    #[instrument(skip(self), fields(printer = %id))]
    pub fn delete(&self, id: &PrinterId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM printers WHERE id = ?1", params![id.as_str()])
            .map_err(db_err("delete printer"))?;
        debug!(rows, "printer delete");
        Ok(())
    }

    pub fn get(&self, id: &PrinterId) -> Result<Option<StoredPrinter>> {
        self.conn
            .query_row(
                "SELECT id, base_url, api_key, name FROM printers WHERE id = ?1",
                params![id.as_str()],
                row_to_printer,
            )
            .optional()
            .map_err(db_err("get printer"))
    }

    /// All printers in registration order.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<StoredPrinter>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, base_url, api_key, name FROM printers ORDER BY position ASC")
            .map_err(db_err("prepare list"))?;

        let printers = stmt
            .query_map([], row_to_printer)
            .map_err(db_err("query list"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("collect rows"))?;

        debug!(count = printers.len(), "listed printers");
        Ok(printers)
    }

    /// Import entries in the old `id|ip|name` text format.
    ///
    /// Entries with the wrong number of fields, an empty id, an unusable
    /// address, or an id that is already stored are skipped.  `api_key` is
    /// applied to every imported printer since the old format had none.
    #[instrument(skip(self, entries, api_key))]
    pub fn import_legacy<I, S>(&self, entries: I, api_key: &str) -> Result<ImportReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = ImportReport::default();

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }

            let parts: Vec<&str> = entry.split('|').collect();
            let [id, address, name] = parts.as_slice() else {
                warn!(entry, "skipping malformed legacy entry");
                report.skipped += 1;
                continue;
            };
            let id = id.trim();
            if id.is_empty() {
                warn!(entry, "skipping legacy entry without id");
                report.skipped += 1;
                continue;
            }

            let endpoint = match PrinterEndpoint::new(id.into(), address, api_key) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    warn!(entry, error = %e, "skipping legacy entry with bad address");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.insert(&endpoint, name.trim()) {
                Ok(()) => report.imported += 1,
                Err(MoonwatchError::DuplicateId(_)) => {
                    debug!(printer = id, "legacy entry already stored");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(imported = report.imported, skipped = report.skipped, "legacy import finished");
        Ok(report)
    }

    // -- Preferences --

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(db_err("set preference"))?;
        Ok(())
    }

    pub fn preference(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("get preference"))
    }

    pub fn remove_preference(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])
            .map_err(db_err("remove preference"))?;
        Ok(())
    }

    #[instrument(skip(self, credentials), fields(server = %credentials.server_address, key = %short_fingerprint(&credentials.api_key)))]
    pub fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.set_preference(PREF_SERVER_ADDRESS, &credentials.server_address)?;
        self.set_preference(PREF_API_KEY, &credentials.api_key)?;
        info!("credentials saved");
        Ok(())
    }

    /// Saved login, if both halves are present.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let address = self.preference(PREF_SERVER_ADDRESS)?;
        let key = self.preference(PREF_API_KEY)?;
        match (address, key) {
            (Some(address), Some(key)) => Credentials::new(&address, &key).map(Some),
            _ => Ok(None),
        }
    }

    pub fn set_selected_printer(&self, id: Option<&PrinterId>) -> Result<()> {
        match id {
            Some(id) => self.set_preference(PREF_SELECTED_PRINTER, id.as_str()),
            None => self.remove_preference(PREF_SELECTED_PRINTER),
        }
    }

    pub fn selected_printer(&self) -> Result<Option<PrinterId>> {
        Ok(self.preference(PREF_SELECTED_PRINTER)?.map(PrinterId::from))
    }

    /// Forget every printer and preference (logout).
    #[instrument(skip(self))]
    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM printers; DELETE FROM preferences;")
            .map_err(db_err("clear all"))?;
        info!("printer store cleared");
        Ok(())
    }
}

fn row_to_printer(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPrinter> {
    let id: String = row.get(0)?;
    Ok(StoredPrinter {
        endpoint: PrinterEndpoint {
            id: PrinterId::from(id),
            base_url: row.get(1)?,
            api_key: row.get(2)?,
        },
        name: row.get(3)?,
    })
}
