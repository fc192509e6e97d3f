// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Control audit trail: append-only SQLite log of every command sent to a
// printer (emergency stop, settings, reset).
//
// Schema:
//   control_audit(
//     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp  TEXT    NOT NULL,   -- RFC 3339
//     action     TEXT    NOT NULL,   -- e.g. "emergency_stop", "apply_settings"
//     printer_id TEXT    NOT NULL,
//     success    INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details    TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::types::PrinterId;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS control_audit (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp  TEXT    NOT NULL,
    action     TEXT    NOT NULL,
    printer_id TEXT    NOT NULL,
    success    INTEGER NOT NULL,
    details    TEXT
);";

fn db_err(e: rusqlite::Error) -> MoonwatchError {
    MoonwatchError::Database(e.to_string())
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub printer_id: PrinterId,
    pub success: bool,
    pub details: Option<String>,
}

/// Append-only control log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record one control command and whether the printer accepted it.
    #[instrument(skip(self, details), fields(%action, printer = %printer_id, success))]
    pub fn record(
        &self,
        action: &str,
        printer_id: &PrinterId,
        success: bool,
        details: Option<&str>,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO control_audit (timestamp, action, printer_id, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, printer_id.as_str(), success as i32, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Entries for one printer, oldest first.
    pub fn entries_for_printer(&self, printer_id: &PrinterId) -> Result<Vec<AuditEntry>> {
        self.query(
            "SELECT id, timestamp, action, printer_id, success, details
             FROM control_audit
             WHERE printer_id = ?1
             ORDER BY id ASC",
            params![printer_id.as_str()],
        )
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.query(
            "SELECT id, timestamp, action, printer_id, success, details
             FROM control_audit
             ORDER BY id DESC
             LIMIT ?1",
            params![limit],
        )
    }

    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM control_audit", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    printer_id: PrinterId::from(row.get::<_, String>(3)?),
                    success: row.get::<_, i32>(4)? != 0,
                    details: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }
}
