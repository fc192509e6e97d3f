// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Poll session for the selected printer.
//
// State machine:
//
//   Idle ──select──▶ Polling ──both calls settled──▶ Displaying
//     ▲                 ▲                                 │
//     └────deselect─────┴──── time range / refresh ◀──────┘
//
// Nothing runs on a timer.  Each trigger spawns one task and hands back a
// handle the caller may await or drop; in-flight polls are never cancelled.
// Within a poll, the status query and the history fetch run concurrently and
// each writes its own field group to the registry as soon as it settles.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use moonwatch_bridge::Notifier;
use moonwatch_client::{Controller, legacy};
use moonwatch_core::alerts::{self, Alert, AlertThresholds};
use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::gcode::PrinterSettings;
use moonwatch_core::telemetry;
use moonwatch_core::types::{PrinterId, PrinterView, TimeRange};

use crate::registry::{Registry, RegistryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No printer selected.
    Idle,
    /// At least one poll is in flight.
    Polling,
    /// A printer is selected and every poll has settled.
    Displaying,
}

struct Selection {
    selected: Option<PrinterId>,
    range: TimeRange,
    in_flight: usize,
    state: SessionState,
}

impl Selection {
    fn begin_poll(&mut self) {
        self.in_flight += 1;
        self.state = SessionState::Polling;
    }

    fn finish_poll(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.state = match self.selected {
                Some(_) => SessionState::Displaying,
                None => SessionState::Idle,
            };
        }
    }
}

/// Marks a poll finished when dropped, including when the poll panics.
struct InFlight(Session);

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut selection = match self.0.selection.lock() {
            Ok(selection) => selection,
            Err(poisoned) => poisoned.into_inner(),
        };
        selection.finish_poll();
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub printer: PrinterId,
    pub range: TimeRange,
    /// The freshly written view, or `None` when the status query failed and
    /// the previous view was kept.
    pub view: Option<PrinterView>,
    pub status_error: Option<String>,
    /// Samples written; zero means history was unavailable.
    pub history_len: usize,
    pub alerts: Vec<Alert>,
}

impl PollOutcome {
    fn failed(printer: PrinterId, range: TimeRange, error: String) -> Self {
        Self {
            printer,
            range,
            view: None,
            status_error: Some(error),
            history_len: 0,
            alerts: Vec::new(),
        }
    }

    pub fn status_updated(&self) -> bool {
        self.view.is_some()
    }
}

/// Awaitable handle to one spawned poll.
#[must_use = "dropping the handle detaches the poll; await `wait` to observe it"]
#[derive(Debug)]
pub struct PollHandle {
    printer: PrinterId,
    range: TimeRange,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn printer(&self) -> &PrinterId {
        &self.printer
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(printer = %self.printer, error = %e, "poll task did not complete");
                PollOutcome::failed(self.printer, self.range, format!("poll task failed: {e}"))
            }
        }
    }
}

/// Awaitable handle to one spawned control command.
#[must_use = "dropping the handle detaches the command; await `wait` for its result"]
pub struct CommandHandle {
    action: &'static str,
    printer: PrinterId,
    task: JoinHandle<bool>,
}

impl CommandHandle {
    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn printer(&self) -> &PrinterId {
        &self.printer
    }

    /// `true` when the printer accepted the command.
    pub async fn wait(self) -> bool {
        self.task.await.unwrap_or_else(|e| {
            warn!(action = self.action, printer = %self.printer, error = %e, "command task did not complete");
            false
        })
    }
}

/// Selection, time range, and trigger handling over a shared [`Registry`].
#[derive(Clone)]
pub struct Session {
    registry: Registry,
    controller: Arc<dyn Controller>,
    notifier: Arc<dyn Notifier>,
    thresholds: AlertThresholds,
    selection: Arc<Mutex<Selection>>,
}

impl Session {
    pub fn new(
        registry: Registry,
        controller: Arc<dyn Controller>,
        notifier: Arc<dyn Notifier>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            registry,
            controller,
            notifier,
            thresholds,
            selection: Arc::new(Mutex::new(Selection {
                selected: None,
                range: TimeRange::default(),
                in_flight: 0,
                state: SessionState::Idle,
            })),
        }
    }

    /// Start with a time range other than `All`.
    pub fn with_time_range(self, range: TimeRange) -> Self {
        self.lock().range = range;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn selected(&self) -> Option<PrinterId> {
        self.lock().selected.clone()
    }

    pub fn time_range(&self) -> TimeRange {
        self.lock().range
    }

    // -- Triggers --

    /// Select a printer and poll it.
    pub async fn select(&self, id: &PrinterId) -> Result<PollHandle> {
        let entry = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;

        let range = {
            let mut selection = self.lock();
            selection.selected = Some(id.clone());
            selection.range
        };
        info!(printer = %id, range = range.wire_name(), "printer selected");
        Ok(self.spawn_poll(entry, range))
    }

    /// Select a printer without polling it.  Used before a control command
    /// so that only the command reaches the printer.
    pub async fn focus(&self, id: &PrinterId) -> Result<()> {
        if self.registry.get(id).await.is_none() {
            return Err(MoonwatchError::NotFound(id.to_string()));
        }

        let mut selection = self.lock();
        selection.selected = Some(id.clone());
        if selection.in_flight == 0 {
            selection.state = SessionState::Displaying;
        }
        debug!(printer = %id, "printer focused");
        Ok(())
    }

    /// Drop the selection.  Polls already in flight still complete and
    /// write to the registry.
    pub fn deselect(&self) {
        let mut selection = self.lock();
        if let Some(id) = selection.selected.take() {
            info!(printer = %id, "printer deselected");
        }
        selection.state = SessionState::Idle;
    }

    /// Change the chart window.  Re-polls the selected printer, if any.
    pub async fn set_time_range(&self, range: TimeRange) -> Result<Option<PollHandle>> {
        let selected = {
            let mut selection = self.lock();
            selection.range = range;
            selection.selected.clone()
        };
        debug!(range = range.wire_name(), "time range changed");

        match selected {
            Some(_) => self.refresh().await.map(Some),
            None => Ok(None),
        }
    }

    /// Poll the selected printer again.
    pub async fn refresh(&self) -> Result<PollHandle> {
        let entry = self.selected_entry().await?;
        let range = self.time_range();
        Ok(self.spawn_poll(entry, range))
    }

    // -- Control actions --

    /// Cancel the running print on the selected printer.
    pub async fn emergency_stop(&self) -> Result<CommandHandle> {
        let entry = self.selected_entry().await?;
        let controller = Arc::clone(&self.controller);
        let endpoint = entry.endpoint;
        let printer = endpoint.id.clone();

        warn!(printer = %printer, "emergency stop requested");
        let task = tokio::spawn(async move { legacy::emergency_stop(controller.as_ref(), &endpoint).await });
        Ok(CommandHandle {
            action: "emergency_stop",
            printer,
            task,
        })
    }

    /// Send new bed/nozzle targets and print speed to the selected printer.
    pub async fn apply_settings(&self, settings: PrinterSettings) -> Result<CommandHandle> {
        let entry = self.selected_entry().await?;
        let controller = Arc::clone(&self.controller);
        let endpoint = entry.endpoint;
        let printer = endpoint.id.clone();

        info!(printer = %printer, ?settings, "applying printer settings");
        let task = tokio::spawn(async move {
            legacy::apply_settings(controller.as_ref(), &endpoint, &settings).await
        });
        Ok(CommandHandle {
            action: "apply_settings",
            printer,
            task,
        })
    }

    /// Restore firmware defaults on the selected printer.
    pub async fn reset_settings(&self) -> Result<CommandHandle> {
        let entry = self.selected_entry().await?;
        let controller = Arc::clone(&self.controller);
        let endpoint = entry.endpoint;
        let printer = endpoint.id.clone();

        info!(printer = %printer, "restoring printer defaults");
        let task = tokio::spawn(async move { legacy::reset_settings(controller.as_ref(), &endpoint).await });
        Ok(CommandHandle {
            action: "reset_settings",
            printer,
            task,
        })
    }

    // -- Internals --

    fn lock(&self) -> std::sync::MutexGuard<'_, Selection> {
        self.selection.lock().expect("session lock poisoned")
    }

    async fn selected_entry(&self) -> Result<RegistryEntry> {
        let id = self.selected().ok_or(MoonwatchError::NoPrinterSelected)?;
        self.registry
            .get(&id)
            .await
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))
    }

    fn spawn_poll(&self, entry: RegistryEntry, range: TimeRange) -> PollHandle {
        self.lock().begin_poll();
        let printer = entry.endpoint.id.clone();
        let session = self.clone();
        let task = tokio::spawn(async move {
            let _guard = InFlight(session.clone());
            session.poll(entry, range).await
        });
        PollHandle {
            printer,
            range,
            task,
        }
    }

    async fn poll(&self, entry: RegistryEntry, range: TimeRange) -> PollOutcome {
        let endpoint = &entry.endpoint;
        let id = &endpoint.id;
        let meta = entry.meta();

        let status = async {
            let payload = self.controller.query_status(endpoint).await?;
            let view = telemetry::normalize(&payload, &meta);
            self.registry.update_view(id, view.clone()).await?;
            Ok::<_, MoonwatchError>(view)
        };

        let history = async {
            let readings = legacy::temperature_history(self.controller.as_ref(), endpoint, range).await;
            let samples = telemetry::to_samples(&readings);
            let len = samples.len();
            if let Err(e) = self.registry.update_history(id, samples).await {
                debug!(printer = %id, error = %e, "history not stored");
            }
            len
        };

        let (status, history_len) = tokio::join!(status, history);

        match status {
            Ok(view) => {
                let alerts = alerts::evaluate(&view, &self.thresholds);
                for alert in &alerts {
                    if let Err(e) = self.notifier.notify(alert) {
                        warn!(printer = %id, error = %e, "alert delivery failed");
                    }
                }
                debug!(printer = %id, status = %view.print_status, history_len, "poll complete");
                PollOutcome {
                    printer: id.clone(),
                    range,
                    view: Some(view),
                    status_error: None,
                    history_len,
                    alerts,
                }
            }
            Err(e) => {
                warn!(printer = %id, error = %e, "status poll failed, keeping last view");
                PollOutcome {
                    printer: id.clone(),
                    range,
                    view: None,
                    status_error: Some(e.to_string()),
                    history_len,
                    alerts: Vec::new(),
                }
            }
        }
    }
}
