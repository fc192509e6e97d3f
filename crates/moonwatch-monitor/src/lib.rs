// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// moonwatch-monitor: the stateful half of Moonwatch.
//
// `Registry` owns every registered printer and its last known telemetry.
// `Session` turns user triggers (select, time range change, refresh, control
// actions) into spawned tasks against a `Controller` and writes the results
// back through the registry.

pub mod registry;
pub mod session;

pub use registry::{EndpointDraft, Registry, RegistryEntry};
pub use session::{CommandHandle, PollHandle, PollOutcome, Session, SessionState};
