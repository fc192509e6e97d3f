// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Moonwatch.

use thiserror::Error;

/// Top-level error type for all Moonwatch operations.
#[derive(Debug, Error)]
pub enum MoonwatchError {
    // -- Controller errors --
    /// Connect, read, timeout, or non-success HTTP status.
    #[error("printer network error: {0}")]
    Network(String),

    /// The controller answered but the body did not have the expected shape.
    #[error("unexpected controller response: {0}")]
    Protocol(String),

    // -- Registry errors --
    #[error("unknown printer id: {0}")]
    NotFound(String),

    #[error("printer id already registered: {0}")]
    DuplicateId(String),

    #[error("no printer selected")]
    NoPrinterSelected,

    // -- Input validation --
    #[error("invalid printer address '{address}': {reason}")]
    InvalidEndpoint { address: String, reason: String },

    #[error("invalid printer settings: {0}")]
    InvalidSettings(String),

    #[error("server address and API key are both required")]
    InvalidCredentials,

    // -- Tunnel --
    #[error("VPN tunnel error: {0}")]
    Tunnel(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MoonwatchError>;
