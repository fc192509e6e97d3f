// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// moonwatch-store: everything Moonwatch keeps on disk.
//
// One SQLite file holds the registered printers (in the order they were
// added), login preferences, and an append-only record of control commands.
// API keys are stored so requests can be authenticated, but only their
// fingerprints ever reach the log.

pub mod audit;
pub mod fingerprint;
pub mod printers;

pub use audit::{AuditEntry, AuditLog};
pub use fingerprint::{fingerprint, short_fingerprint};
pub use printers::{ImportReport, PrinterStore, StoredPrinter};
