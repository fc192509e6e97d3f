// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// moonwatch-client: Moonraker controller access over HTTP.
//
// `moonraker` holds the async client and the `Controller` seam the session
// polls through.  `legacy` wraps that seam in the boolean/empty-default shape
// older callers expect.

pub mod legacy;
pub mod moonraker;

pub use moonraker::{ClientConfig, Controller, MoonrakerClient};
