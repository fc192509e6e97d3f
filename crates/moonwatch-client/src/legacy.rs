// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boolean/empty-default adapter over `Controller`.
//
// Control actions report only "worked" or "didn't": the caller cannot tell a
// request that never left the device from one the printer failed to answer
// in time.  The structured error is logged here and then dropped.

use tracing::{info, warn};

use moonwatch_core::gcode::{PrinterSettings, RESTORE_DEFAULTS};
use moonwatch_core::types::{PrinterEndpoint, TimeRange};

use crate::moonraker::Controller;

/// Cancel the running print.
pub async fn emergency_stop(controller: &dyn Controller, endpoint: &PrinterEndpoint) -> bool {
    match controller.cancel_print(endpoint).await {
        Ok(()) => {
            info!(printer = %endpoint.id, "emergency stop delivered");
            true
        }
        Err(e) => {
            warn!(printer = %endpoint.id, error = %e, "emergency stop failed");
            false
        }
    }
}

/// Send bed/nozzle targets and speed as one three-line script.
pub async fn apply_settings(
    controller: &dyn Controller,
    endpoint: &PrinterEndpoint,
    settings: &PrinterSettings,
) -> bool {
    run_script(controller, endpoint, &settings.to_gcode()).await
}

/// Restore factory defaults.
pub async fn reset_settings(controller: &dyn Controller, endpoint: &PrinterEndpoint) -> bool {
    run_script(controller, endpoint, &[RESTORE_DEFAULTS.to_string()]).await
}

/// Send arbitrary script lines.
pub async fn run_script(
    controller: &dyn Controller,
    endpoint: &PrinterEndpoint,
    lines: &[String],
) -> bool {
    match controller.send_command(endpoint, lines).await {
        Ok(()) => true,
        Err(e) => {
            warn!(printer = %endpoint.id, error = %e, "G-code script failed");
            false
        }
    }
}

/// Temperature readings, or empty when they could not be fetched.
pub async fn temperature_history(
    controller: &dyn Controller,
    endpoint: &PrinterEndpoint,
    range: TimeRange,
) -> Vec<f64> {
    controller.fetch_temperature_history(endpoint, range).await
}
