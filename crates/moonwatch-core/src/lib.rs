// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Moonwatch: Core types, error definitions, and pure telemetry logic shared
// across all crates.

pub mod alerts;
pub mod config;
pub mod error;
pub mod gcode;
pub mod human_errors;
pub mod payload;
pub mod telemetry;
pub mod types;

pub use config::AppConfig;
pub use error::MoonwatchError;
pub use types::*;
