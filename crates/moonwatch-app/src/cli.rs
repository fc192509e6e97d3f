// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use moonwatch_core::types::TimeRange;

/// Monitor and control Moonraker printers from the terminal.
#[derive(Parser, Debug)]
#[command(name = "moonwatch", author, version, about, long_about = None)]
pub struct Cli {
    /// Where the database and config.json live (default: $XDG_DATA_HOME/moonwatch)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save the server address and API key
    Login {
        server: String,
        api_key: String,
    },
    /// Forget credentials and every registered printer
    Logout,
    /// Register a printer
    Add {
        /// Host, host:port, or full URL
        address: String,
        /// Display name (defaults to the address)
        #[arg(short, long, default_value = "")]
        name: String,
        /// Use a fixed id instead of generating one
        #[arg(long)]
        id: Option<String>,
        /// API key for this printer (defaults to the login key)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Change a printer's address or key
    Edit {
        id: String,
        address: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Unregister a printer
    Remove { id: String },
    /// Show registered printers
    List,
    /// Register the printers the login server reports
    Discover,
    /// Import `id|ip|name` lines from a file
    Import { file: PathBuf },
    /// Fetch status and temperature history once
    Monitor {
        /// Printer id (defaults to the last one monitored)
        id: Option<String>,
        /// History window: all, 30m, 1h or 12h
        #[arg(short, long)]
        range: Option<TimeRange>,
    },
    /// Cancel the running print
    Stop { id: Option<String> },
    /// Set bed and nozzle targets and the speed factor
    Settings {
        id: Option<String>,
        #[arg(long)]
        bed: String,
        #[arg(long)]
        nozzle: String,
        #[arg(long)]
        speed: String,
    },
    /// Restore the printer's default settings
    Reset { id: Option<String> },
    /// Manage the WireGuard tunnel
    Vpn {
        #[command(subcommand)]
        action: VpnAction,
    },
    /// Show recent control commands
    Audit {
        /// Only commands sent to this printer
        #[arg(short, long)]
        printer: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnAction {
    Up,
    Down,
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monitor_with_range() {
        let cli = Cli::try_parse_from(["moonwatch", "monitor", "p1", "--range", "30m"]).unwrap();
        match cli.command {
            Command::Monitor { id, range } => {
                assert_eq!(id.as_deref(), Some("p1"));
                assert_eq!(range, Some(TimeRange::Last30Min));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_range() {
        assert!(Cli::try_parse_from(["moonwatch", "monitor", "--range", "week"]).is_err());
    }

    #[test]
    fn settings_fields_stay_raw() {
        let cli = Cli::try_parse_from([
            "moonwatch", "settings", "--bed", "60", "--nozzle", "abc", "--speed", "100",
        ])
        .unwrap();
        match cli.command {
            Command::Settings { id, nozzle, .. } => {
                assert!(id.is_none());
                assert_eq!(nozzle, "abc");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn audit_accepts_printer_filter() {
        let cli = Cli::try_parse_from(["moonwatch", "audit", "--printer", "p1", "-l", "5"]).unwrap();
        match cli.command {
            Command::Audit { printer, limit } => {
                assert_eq!(printer.as_deref(), Some("p1"));
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn data_dir_is_global() {
        let cli = Cli::try_parse_from(["moonwatch", "list", "--data-dir", "/tmp/mw"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/mw")));
        assert!(matches!(cli.command, Command::List));
    }
}
