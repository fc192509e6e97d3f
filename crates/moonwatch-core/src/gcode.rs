// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Control commands expressed as G-code script lines.

use serde::{Deserialize, Serialize};

use crate::error::{MoonwatchError, Result};

/// Script that returns the printer to its factory settings.
pub const RESTORE_DEFAULTS: &str = "RESTORE_DEFAULTS";

/// Target temperatures and speed factor entered on the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSettings {
    /// Heated bed target in °C.
    pub bed_target: i32,
    /// Hotend target in °C.
    pub nozzle_target: i32,
    /// Print speed in percent.
    pub speed: i32,
}

impl PrinterSettings {
    pub fn new(bed_target: i32, nozzle_target: i32, speed: i32) -> Result<Self> {
        if bed_target < 0 {
            return Err(MoonwatchError::InvalidSettings(format!(
                "bed temperature must not be negative (got {bed_target})"
            )));
        }
        if nozzle_target < 0 {
            return Err(MoonwatchError::InvalidSettings(format!(
                "nozzle temperature must not be negative (got {nozzle_target})"
            )));
        }
        if speed <= 0 {
            return Err(MoonwatchError::InvalidSettings(format!(
                "print speed must be positive (got {speed})"
            )));
        }
        Ok(Self {
            bed_target,
            nozzle_target,
            speed,
        })
    }

    /// Parse the three raw form fields.  Every field must be an integer.
    pub fn parse(bed: &str, nozzle: &str, speed: &str) -> Result<Self> {
        Self::new(
            parse_field("bed temperature", bed)?,
            parse_field("nozzle temperature", nozzle)?,
            parse_field("print speed", speed)?,
        )
    }

    /// The script lines sent to `/printer/gcode/script`, in order.
    pub fn to_gcode(&self) -> Vec<String> {
        vec![
            format!("SET_HEATER_BED_TEMPERATURE TARGET={}", self.bed_target),
            format!("SET_EXTRUDER_TEMPERATURE TARGET={}", self.nozzle_target),
            format!("SET_PRINT_SPEED SPEED={}", self.speed),
        ]
    }
}

fn parse_field(name: &str, raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .map_err(|_| MoonwatchError::InvalidSettings(format!("{name} '{raw}' is not a whole number")))
}

/// Join script lines into the single newline-separated body the controller
/// expects.
pub fn join_script<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_three_lines_in_order() {
        let settings = PrinterSettings::new(60, 215, 100).unwrap();
        assert_eq!(
            settings.to_gcode(),
            [
                "SET_HEATER_BED_TEMPERATURE TARGET=60",
                "SET_EXTRUDER_TEMPERATURE TARGET=215",
                "SET_PRINT_SPEED SPEED=100",
            ]
        );
    }

    #[test]
    fn parse_accepts_padded_integers() {
        let settings = PrinterSettings::parse(" 55", "200 ", "80").unwrap();
        assert_eq!(settings, PrinterSettings::new(55, 200, 80).unwrap());
    }

    #[test]
    fn parse_rejects_non_integers() {
        assert!(matches!(
            PrinterSettings::parse("60.5", "200", "100"),
            Err(MoonwatchError::InvalidSettings(_))
        ));
        assert!(PrinterSettings::parse("60", "", "100").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PrinterSettings::new(-1, 200, 100).is_err());
        assert!(PrinterSettings::new(60, -5, 100).is_err());
        assert!(PrinterSettings::new(60, 200, 0).is_err());
    }

    #[test]
    fn join_script_uses_newlines() {
        let settings = PrinterSettings::new(0, 0, 100).unwrap();
        assert_eq!(
            join_script(&settings.to_gcode()),
            "SET_HEATER_BED_TEMPERATURE TARGET=0\nSET_EXTRUDER_TEMPERATURE TARGET=0\nSET_PRINT_SPEED SPEED=100"
        );
        assert_eq!(join_script(&[RESTORE_DEFAULTS]), "RESTORE_DEFAULTS");
    }
}
