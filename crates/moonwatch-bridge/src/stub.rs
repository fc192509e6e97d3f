// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for headless builds: alerts go to the log.

use tracing::{error, info, warn};

use moonwatch_core::alerts::{Alert, AlertKind};
use moonwatch_core::error::Result;

use crate::traits::Notifier;

/// Log-only bridge used when no native notification channel exists.
pub struct StubBridge;

impl StubBridge {
    pub const PLATFORM_NAME: &'static str = "Headless (stub)";
}

impl Notifier for StubBridge {
    fn notify(&self, alert: &Alert) -> Result<()> {
        match alert.kind {
            AlertKind::Error => error!(title = %alert.title, "{}", alert.message),
            AlertKind::Warning => warn!(title = %alert.title, "{}", alert.message),
            AlertKind::Info | AlertKind::Success => {
                info!(title = %alert.title, "{}", alert.message)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_accepts_every_kind() {
        let bridge = StubBridge;
        for kind in [
            AlertKind::Info,
            AlertKind::Warning,
            AlertKind::Error,
            AlertKind::Success,
        ] {
            assert!(bridge.notify(&Alert::new("t", "m", kind)).is_ok());
        }
    }
}
