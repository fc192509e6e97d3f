// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.

use async_trait::async_trait;

use moonwatch_core::alerts::Alert;
use moonwatch_core::error::Result;

/// Deliver alerts to the user.
///
/// Called from poll tasks, so implementations must not block for long.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<()>;
}

/// An externally managed VPN tunnel.
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Bring the tunnel up.  Returns once it is expected to carry traffic.
    async fn up(&self) -> Result<()>;

    async fn down(&self) -> Result<()>;

    /// Whether the tunnel interface currently exists.
    async fn is_active(&self) -> bool;
}
