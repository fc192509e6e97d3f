// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Critical-event detection on freshly polled telemetry.
//
// The session evaluates every new view and hands the resulting alerts to the
// platform notifier.  Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PrinterView, StatusTone};

/// Hotend temperature above which an overheat alert fires.
pub const DEFAULT_NOZZLE_OVERHEAT_C: f64 = 250.0;

/// Importance of an alert, drives notification styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Info,
    Warning,
    Error,
    Success,
}

/// A user-facing notification about one printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub kind: AlertKind,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: AlertKind) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            raised_at: Utc::now(),
        }
    }
}

/// Limits used by [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub nozzle_overheat_c: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            nozzle_overheat_c: DEFAULT_NOZZLE_OVERHEAT_C,
        }
    }
}

/// Alerts raised by one view: nozzle overheat and stopped/failed prints.
pub fn evaluate(view: &PrinterView, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if view.nozzle_temperature > thresholds.nozzle_overheat_c {
        alerts.push(Alert::new(
            "Nozzle overheating",
            format!(
                "Nozzle temperature on {} is {:.1}°C, above the {:.0}°C limit!",
                view.name, view.nozzle_temperature, thresholds.nozzle_overheat_c
            ),
            AlertKind::Warning,
        ));
    }

    if view.tone() == StatusTone::Fault {
        alerts.push(Alert::new(
            "Print failure",
            format!(
                "Printing on {} has stopped or the printer reported an error ({}).",
                view.name, view.print_status
            ),
            AlertKind::Error,
        ));
    }

    alerts
}
