// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WireGuard tunnel driven through the external `wg-quick` command.
//
// Moonwatch never speaks WireGuard itself.  `up`/`down` shell out to
// `wg-quick <action> <config>`, then wait a fixed settle delay so the first
// request after `up` does not race the interface coming up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use moonwatch_core::error::{MoonwatchError, Result};

use crate::traits::Tunnel;

const WG_QUICK: &str = "wg-quick";
const SYSFS_NET: &str = "/sys/class/net";

#[derive(Debug, Clone)]
pub struct WgQuickTunnel {
    config: PathBuf,
    settle: Duration,
    program: String,
    sysfs_net: PathBuf,
}

impl WgQuickTunnel {
    pub fn new(config: impl Into<PathBuf>, settle: Duration) -> Self {
        Self {
            config: config.into(),
            settle,
            program: WG_QUICK.to_string(),
            sysfs_net: PathBuf::from(SYSFS_NET),
        }
    }

    /// Run a different executable in place of `wg-quick`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Look for interfaces under a different directory than `/sys/class/net`.
    pub fn with_sysfs_net(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysfs_net = dir.into();
        self
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Interface name `wg-quick` derives from the config: its file stem.
    pub fn interface(&self) -> Option<&str> {
        self.config.file_stem().and_then(|s| s.to_str())
    }

    #[instrument(skip(self), fields(config = %self.config.display()))]
    async fn run(&self, action: &str) -> Result<()> {
        if !self.config.is_file() {
            return Err(MoonwatchError::Tunnel(format!(
                "WireGuard config not found: {}",
                self.config.display()
            )));
        }

        info!(program = %self.program, "running tunnel command");
        let output = Command::new(&self.program)
            .arg(action)
            .arg(&self.config)
            .output()
            .await
            .map_err(|e| MoonwatchError::Tunnel(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "tunnel command failed");
            return Err(MoonwatchError::Tunnel(format!(
                "{} {action} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        debug!(settle_ms = self.settle.as_millis() as u64, "waiting for tunnel to settle");
        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}

#[async_trait]
impl Tunnel for WgQuickTunnel {
    async fn up(&self) -> Result<()> {
        self.run("up").await
    }

    async fn down(&self) -> Result<()> {
        self.run("down").await
    }

    async fn is_active(&self) -> bool {
        let Some(interface) = self.interface() else {
            return false;
        };
        tokio::fs::try_exists(self.sysfs_net.join(interface))
            .await
            .unwrap_or(false)
    }
}
