// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: bridges the command line to the moonwatch backend crates.
//
// Each service wraps one or more backend crate APIs so a command handler can
// call it in one line and print what comes back.

pub mod app_services;
pub mod data_dir;
