// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Telemetry normalization: raw controller payloads into display-ready views.
//
// Everything here is pure.  The same payload always yields the same view, so
// callers may normalize status and history in any order.

use crate::payload::StatusPayload;
use crate::types::{EndpointMeta, PrinterView, TemperatureSample};

/// Convert a status query response into a [`PrinterView`].
///
/// Temperatures and the status tag are copied verbatim.  A missing nozzle
/// reading becomes `0.0`, the same placeholder a freshly added printer shows.
pub fn normalize(raw: &StatusPayload, meta: &EndpointMeta) -> PrinterView {
    let result = &raw.result;
    PrinterView {
        id: meta.id.clone(),
        name: meta.name.clone(),
        bed_temperature: result.heater_bed.temperature,
        bed_target: result.heater_bed.target,
        nozzle_temperature: result.nozzle_temperature().unwrap_or(0.0),
        elapsed_print_time_seconds: clamp_seconds(result.toolhead.print_time),
        print_status: result.status.clone(),
        progress: result.print_stats.progress,
        filename: result.print_stats.filename.clone(),
    }
}

/// Number the history readings by position.  Order is preserved as received.
pub fn to_samples(readings: &[f64]) -> Vec<TemperatureSample> {
    readings
        .iter()
        .enumerate()
        .map(|(index, &temperature)| TemperatureSample { index, temperature })
        .collect()
}

/// Whole seconds in `seconds`, truncating any fraction.
pub fn whole_seconds(seconds: f64) -> u64 {
    clamp_seconds(seconds).trunc() as u64
}

/// Render elapsed print time as `"<h>h <m>m <s>s"`.
///
/// Fractional seconds are discarded, never rounded: `3661.9` is `"1h 1m 1s"`.
pub fn format_print_time(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}h {minutes}m {secs}s")
}

fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
