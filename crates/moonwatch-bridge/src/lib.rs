// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Moonwatch platform bridge.
//
// Alerts leave the process through `Notifier`; the VPN is driven through
// `Tunnel`.  The headless build has no OS notification channel, so
// `platform_notifier()` hands out the log-only stub.

pub mod stub;
pub mod traits;
pub mod wg_quick;

use std::sync::Arc;

pub use traits::{Notifier, Tunnel};
pub use wg_quick::WgQuickTunnel;

/// Notifier for the running platform.
pub fn platform_notifier() -> Arc<dyn Notifier> {
    tracing::debug!(platform = stub::StubBridge::PLATFORM_NAME, "using stub notifier");
    Arc::new(stub::StubBridge)
}
