// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session behaviour against an in-process controller.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use moonwatch_bridge::Notifier;
use moonwatch_client::Controller;
use moonwatch_core::alerts::{Alert, AlertKind, AlertThresholds};
use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::gcode::PrinterSettings;
use moonwatch_core::payload::StatusPayload;
use moonwatch_core::types::{PrinterEndpoint, PrinterId, TimeRange};
use moonwatch_monitor::{EndpointDraft, Registry, Session, SessionState};

/// Scriptable controller.  When `gate` is set every call waits for a permit.
#[derive(Default)]
struct FakeController {
    status: Mutex<Option<serde_json::Value>>,
    history: Mutex<Vec<f64>>,
    fail_commands: AtomicBool,
    panic_on_status: AtomicBool,
    status_calls: AtomicUsize,
    history_ranges: Mutex<Vec<TimeRange>>,
    scripts: Mutex<Vec<Vec<String>>>,
    cancels: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeController {
    fn set_status(&self, status: &str, bed: f64, nozzle: f64, print_time: f64) {
        *self.status.lock().unwrap() = Some(serde_json::json!({
            "result": {
                "status": status,
                "heater_bed": { "temperature": bed, "target": 60.0 },
                "toolhead": { "print_time": print_time, "temperature": nozzle },
                "print_stats": { "progress": 0.42 }
            }
        }));
    }

    fn fail_status(&self) {
        *self.status.lock().unwrap() = None;
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl Controller for FakeController {
    async fn query_status(&self, _endpoint: &PrinterEndpoint) -> Result<StatusPayload> {
        self.pass_gate().await;
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_status.load(Ordering::SeqCst) {
            panic!("controller blew up");
        }
        let body = self.status.lock().unwrap().clone();
        match body {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(MoonwatchError::Network("status query timed out".into())),
        }
    }

    async fn send_command(&self, _endpoint: &PrinterEndpoint, lines: &[String]) -> Result<()> {
        self.scripts.lock().unwrap().push(lines.to_vec());
        if self.fail_commands.load(Ordering::SeqCst) {
            Err(MoonwatchError::Network("gcode script returned HTTP 500".into()))
        } else {
            Ok(())
        }
    }

    async fn cancel_print(&self, _endpoint: &PrinterEndpoint) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if self.fail_commands.load(Ordering::SeqCst) {
            Err(MoonwatchError::Network("print cancel returned HTTP 500".into()))
        } else {
            Ok(())
        }
    }

    async fn fetch_temperature_history(
        &self,
        _endpoint: &PrinterEndpoint,
        range: TimeRange,
    ) -> Vec<f64> {
        self.pass_gate().await;
        self.history_ranges.lock().unwrap().push(range);
        self.history.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct Harness {
    session: Session,
    controller: Arc<FakeController>,
    notifier: Arc<RecordingNotifier>,
    printer: PrinterId,
}

async fn harness(controller: FakeController) -> Harness {
    let registry = Registry::new();
    let printer = registry
        .add(EndpointDraft::new("10.0.0.5:7125", "key").with_id("p1"), "Voron")
        .await
        .unwrap();
    let controller = Arc::new(controller);
    let notifier = Arc::new(RecordingNotifier::default());
    let session = Session::new(
        registry,
        controller.clone(),
        notifier.clone(),
        AlertThresholds::default(),
    );
    Harness {
        session,
        controller,
        notifier,
        printer,
    }
}

#[tokio::test]
async fn select_polls_and_caches_view() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("printing", 60.2, 210.0, 125.4);
    *h.controller.history.lock().unwrap() = vec![205.0, 207.5, 209.9];

    let outcome = h.session.select(&h.printer).await.unwrap().wait().await;

    assert!(outcome.status_updated());
    assert_eq!(outcome.history_len, 3);
    let entry = h.session.registry().get(&h.printer).await.unwrap();
    let view = entry.view.unwrap();
    assert_eq!(view.print_status, "printing");
    assert_eq!(view.bed_temperature, 60.2);
    assert_eq!(view.elapsed_whole_seconds(), 125);
    assert_eq!(view.formatted_print_time(), "0h 2m 5s");
    assert_eq!(entry.history[2].temperature, 209.9);
    assert_eq!(entry.history[2].index, 2);
    assert_eq!(h.session.state(), SessionState::Displaying);
}

#[tokio::test]
async fn failed_status_keeps_last_view() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("printing", 60.0, 200.0, 10.0);
    h.session.select(&h.printer).await.unwrap().wait().await;

    h.controller.fail_status();
    let outcome = h.session.refresh().await.unwrap().wait().await;

    assert!(!outcome.status_updated());
    assert!(outcome.status_error.unwrap().contains("timed out"));
    let view = h.session.registry().get(&h.printer).await.unwrap().view.unwrap();
    assert_eq!(view.bed_temperature, 60.0);
    assert_eq!(h.session.state(), SessionState::Displaying);
}

#[tokio::test]
async fn unavailable_history_becomes_empty_series() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("idle", 20.0, 21.0, 0.0);
    *h.controller.history.lock().unwrap() = vec![21.0, 21.5];
    h.session.select(&h.printer).await.unwrap().wait().await;

    h.controller.history.lock().unwrap().clear();
    let outcome = h.session.refresh().await.unwrap().wait().await;

    assert_eq!(outcome.history_len, 0);
    assert!(outcome.status_updated());
    assert!(h.session.registry().get(&h.printer).await.unwrap().history.is_empty());
}

#[tokio::test]
async fn time_range_change_repolls_with_new_range() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("printing", 60.0, 200.0, 10.0);

    assert!(h.session.set_time_range(TimeRange::LastHour).await.unwrap().is_none());
    h.session.select(&h.printer).await.unwrap().wait().await;
    let handle = h
        .session
        .set_time_range(TimeRange::Last12Hours)
        .await
        .unwrap()
        .expect("selected printer is re-polled");
    assert_eq!(handle.wait().await.range, TimeRange::Last12Hours);

    assert_eq!(
        *h.controller.history_ranges.lock().unwrap(),
        vec![TimeRange::LastHour, TimeRange::Last12Hours]
    );
    assert_eq!(h.controller.status_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn state_follows_triggers() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(FakeController {
        gate: Some(gate.clone()),
        ..Default::default()
    })
    .await;
    h.controller.set_status("idle", 20.0, 21.0, 0.0);
    assert_eq!(h.session.state(), SessionState::Idle);

    let handle = h.session.select(&h.printer).await.unwrap();
    assert_eq!(h.session.state(), SessionState::Polling);
    assert!(!handle.is_finished());

    gate.add_permits(2);
    handle.wait().await;
    assert_eq!(h.session.state(), SessionState::Displaying);

    h.session.deselect();
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.session.selected().is_none());
}

#[tokio::test]
async fn poll_in_flight_at_deselect_still_lands() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(FakeController {
        gate: Some(gate.clone()),
        ..Default::default()
    })
    .await;
    h.controller.set_status("printing", 61.0, 200.0, 5.0);

    let handle = h.session.select(&h.printer).await.unwrap();
    h.session.deselect();
    gate.add_permits(2);
    let outcome = handle.wait().await;

    assert!(outcome.status_updated());
    assert!(h.session.registry().get(&h.printer).await.unwrap().view.is_some());
    assert_eq!(h.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn unknown_printer_cannot_be_selected() {
    let h = harness(FakeController::default()).await;
    let err = h.session.select(&"ghost".into()).await.unwrap_err();
    assert!(matches!(err, MoonwatchError::NotFound(_)));
    assert_eq!(h.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn refresh_without_selection_fails() {
    let h = harness(FakeController::default()).await;
    assert!(matches!(
        h.session.refresh().await,
        Err(MoonwatchError::NoPrinterSelected)
    ));
    assert!(matches!(
        h.session.emergency_stop().await,
        Err(MoonwatchError::NoPrinterSelected)
    ));
}

#[tokio::test]
async fn alerts_reach_the_notifier() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("error", 60.0, 262.5, 10.0);

    let outcome = h.session.select(&h.printer).await.unwrap().wait().await;

    assert_eq!(outcome.alerts.len(), 2);
    let delivered = h.notifier.alerts.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].kind, AlertKind::Warning);
    assert_eq!(delivered[1].kind, AlertKind::Error);
}

#[tokio::test]
async fn failed_poll_raises_no_alerts() {
    let h = harness(FakeController::default()).await;
    h.controller.fail_status();
    h.session.select(&h.printer).await.unwrap().wait().await;
    assert!(h.notifier.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn control_actions_report_bool() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("printing", 60.0, 200.0, 10.0);
    h.session.select(&h.printer).await.unwrap().wait().await;

    let settings = PrinterSettings::new(65, 215, 110).unwrap();
    assert!(h.session.apply_settings(settings).await.unwrap().wait().await);
    assert!(h.session.reset_settings().await.unwrap().wait().await);

    h.controller.fail_commands.store(true, Ordering::SeqCst);
    let stop = h.session.emergency_stop().await.unwrap();
    assert_eq!(stop.action(), "emergency_stop");
    assert!(!stop.wait().await);

    let scripts = h.controller.scripts.lock().unwrap();
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[0][0], "SET_HEATER_BED_TEMPERATURE TARGET=65");
    assert_eq!(scripts[1], vec!["RESTORE_DEFAULTS".to_string()]);
    assert_eq!(h.controller.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn focus_selects_without_polling() {
    let h = harness(FakeController::default()).await;

    h.session.focus(&h.printer).await.unwrap();
    assert_eq!(h.session.selected(), Some(h.printer.clone()));
    assert_eq!(h.session.state(), SessionState::Displaying);

    assert!(h.session.emergency_stop().await.unwrap().wait().await);
    assert_eq!(h.controller.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.status_calls.load(Ordering::SeqCst), 0);
    assert!(h.controller.history_ranges.lock().unwrap().is_empty());
    assert!(h.session.registry().get(&h.printer).await.unwrap().view.is_none());
}

#[tokio::test]
async fn focus_rejects_unknown_printer() {
    let h = harness(FakeController::default()).await;
    let err = h.session.focus(&"ghost".into()).await.unwrap_err();
    assert!(matches!(err, MoonwatchError::NotFound(_)));
    assert!(h.session.selected().is_none());
}

#[tokio::test]
async fn panicking_poll_still_settles_state() {
    let h = harness(FakeController::default()).await;
    h.controller.panic_on_status.store(true, Ordering::SeqCst);

    let outcome = h.session.select(&h.printer).await.unwrap().wait().await;

    assert!(!outcome.status_updated());
    assert!(outcome.status_error.unwrap().contains("poll task failed"));
    assert_eq!(h.session.state(), SessionState::Displaying);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn polls_for_different_printers_run_independently() {
    let h = harness(FakeController::default()).await;
    h.controller.set_status("printing", 60.0, 200.0, 10.0);
    let second = h
        .session
        .registry()
        .add(EndpointDraft::new("10.0.0.6:7125", "key"), "Ender")
        .await
        .unwrap();

    let first_poll = h.session.select(&h.printer).await.unwrap();
    let second_poll = h.session.select(&second).await.unwrap();
    let (a, b) = tokio::join!(first_poll.wait(), second_poll.wait());

    assert!(a.status_updated() && b.status_updated());
    assert_eq!(h.session.selected(), Some(second));
    for entry in h.session.registry().list().await {
        assert!(entry.view.is_some());
    }
}
