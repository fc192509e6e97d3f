// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alerts::AlertThresholds;
use crate::types::TimeRange;

/// Persistent application settings.
///
/// Missing keys in `config.json` fall back to the defaults below, so older
/// files keep loading after new settings are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// TCP connect timeout for controller requests, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-request timeout for controller requests, in milliseconds.
    pub request_timeout_ms: u64,
    /// Hotend temperature that triggers an overheat alert.
    pub nozzle_overheat_c: f64,
    /// Chart window used when none is given on the command line.
    pub default_time_range: TimeRange,
    /// WireGuard config handed to `wg-quick`.  Relative paths resolve
    /// against the data directory.
    pub wireguard_config: PathBuf,
    /// Fixed wait after `wg-quick` returns before the tunnel is used.
    pub tunnel_settle_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 7_000,
            nozzle_overheat_c: crate::alerts::DEFAULT_NOZZLE_OVERHEAT_C,
            default_time_range: TimeRange::All,
            wireguard_config: PathBuf::from("wireguard.conf"),
            tunnel_settle_ms: 2_000,
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn tunnel_settle(&self) -> Duration {
        Duration::from_millis(self.tunnel_settle_ms)
    }

    pub fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            nozzle_overheat_c: self.nozzle_overheat_c,
        }
    }
}
