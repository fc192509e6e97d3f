// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire shapes of the controller's `/printer/objects/query` response.
//
// Unknown fields are ignored.  Fields without a serde default are required:
// a payload that lacks them fails to decode and is reported as a protocol
// error by the client.

use serde::{Deserialize, Serialize};

/// Top-level envelope returned by the object query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub result: QueryResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub status: String,
    pub heater_bed: HeaterBed,
    pub toolhead: Toolhead,
    pub print_stats: PrintStats,
    /// Hotend heater; present when the controller is asked for it or
    /// volunteers it.
    #[serde(default)]
    pub extruder: Option<Extruder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaterBed {
    pub temperature: f64,
    #[serde(default)]
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolhead {
    #[serde(default)]
    pub position: Vec<f64>,
    pub print_time: f64,
    /// Some firmwares report the hotend temperature on the toolhead object.
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintStats {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extruder {
    pub temperature: f64,
    #[serde(default)]
    pub target: f64,
}

impl QueryResult {
    /// Hotend temperature, preferring the dedicated extruder object.
    pub fn nozzle_temperature(&self) -> Option<f64> {
        self.extruder
            .as_ref()
            .map(|e| e.temperature)
            .or(self.toolhead.temperature)
    }
}
