// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text rendering for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use moonwatch_core::types::{PrinterId, PrinterView, StatusTone, TemperatureSample, TimeRange};
use moonwatch_monitor::RegistryEntry;
use moonwatch_store::AuditEntry;

fn paint(tone: StatusTone, text: &str) -> String {
    format!("\x1b[{}m{text}\x1b[0m", tone.ansi_color())
}

/// One row of `moonwatch list`.
pub fn printer_line(entry: &RegistryEntry, selected: Option<&PrinterId>) -> String {
    let marker = if selected == Some(entry.id()) { '*' } else { ' ' };
    let status = match &entry.view {
        Some(view) => paint(view.tone(), &view.print_status),
        None => "-".to_string(),
    };
    format!(
        "{marker} {:<38} {:<24} {:<32} {status}",
        entry.id(),
        entry.name,
        entry.endpoint.base_url
    )
}

pub fn view_block(view: &PrinterView, history: &[TemperatureSample], range: TimeRange) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", view.name, view.id);
    let _ = writeln!(out, "  status   {}", paint(view.tone(), &view.print_status));
    if let Some(filename) = &view.filename {
        let _ = writeln!(out, "  file     {filename}");
    }
    let _ = writeln!(
        out,
        "  bed      {:.1} / {:.1} °C",
        view.bed_temperature, view.bed_target
    );
    let _ = writeln!(out, "  nozzle   {:.1} °C", view.nozzle_temperature);
    let _ = writeln!(out, "  time     {}", view.formatted_print_time());
    if let Some(progress) = view.progress {
        let _ = writeln!(out, "  progress {:.0}%", progress * 100.0);
    }
    let _ = write!(out, "  history  {}", history_summary(history, range));
    out
}

pub fn refreshed_line(refreshed_at: Option<DateTime<Utc>>) -> String {
    match refreshed_at {
        Some(at) => format!(
            "  updated  {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => "  updated  never".to_string(),
    }
}

/// `"<n> samples (<range>), min .. max, last"` or a note when empty.
pub fn history_summary(history: &[TemperatureSample], range: TimeRange) -> String {
    let Some(last) = history.last() else {
        return format!("no samples ({})", range.label());
    };
    let (min, max) = history.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s.temperature), hi.max(s.temperature))
    });
    format!(
        "{} samples ({}), {min:.1}..{max:.1} °C, last {:.1} °C",
        history.len(),
        range.label(),
        last.temperature
    )
}

pub fn audit_line(entry: &AuditEntry) -> String {
    let outcome = if entry.success {
        paint(StatusTone::Active, "ok")
    } else {
        paint(StatusTone::Fault, "failed")
    };
    let mut line = format!(
        "{} {:<16} {:<24} {outcome}",
        entry.timestamp,
        entry.action,
        entry.printer_id
    );
    if let Some(details) = &entry.details {
        let _ = write!(line, "  {details}");
    }
    line
}
