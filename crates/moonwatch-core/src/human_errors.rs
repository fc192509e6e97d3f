// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command-line front end.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Nothing is retried automatically; `retriable` only tells the user whether
// running the same command again may help.

use crate::error::MoonwatchError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or timeout; trying again later may work.
    Transient,
    /// User must do something (fix an address, pick a printer).
    ActionRequired,
    /// Cannot be fixed by trying again.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether repeating the command may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `MoonwatchError` into a `HumanError`.
pub fn humanize_error(err: &MoonwatchError) -> HumanError {
    match err {
        // -- Controller --
        MoonwatchError::Network(detail) => humanize_network_error(detail),

        MoonwatchError::Protocol(_) => HumanError {
            message: "The printer answered with data we don't understand.".into(),
            suggestion: "Check that the address points at a Moonraker API and that its version is supported.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Registry --
        MoonwatchError::NotFound(id) => HumanError {
            message: "That printer isn't in your list.".into(),
            suggestion: format!("Run `moonwatch list` to see registered printers. (Unknown id: {id})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MoonwatchError::DuplicateId(id) => HumanError {
            message: "A printer with that id is already registered.".into(),
            suggestion: format!("Remove the existing entry first or choose another id. ({id})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MoonwatchError::NoPrinterSelected => HumanError {
            message: "No printer selected.".into(),
            suggestion: "Choose a printer from the list, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Input --
        MoonwatchError::InvalidEndpoint { address, reason } => HumanError {
            message: "The printer address doesn't look right.".into(),
            suggestion: format!("It should look like 192.168.1.40:7125. ('{address}': {reason})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MoonwatchError::InvalidSettings(detail) => HumanError {
            message: "Check the values you entered.".into(),
            suggestion: format!("Temperatures and speed must be whole numbers. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MoonwatchError::InvalidCredentials => HumanError {
            message: "Both the server address and the API key are needed.".into(),
            suggestion: "Run `moonwatch login <address> <api-key>` with both values filled in.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Tunnel --
        MoonwatchError::Tunnel(detail) => HumanError {
            message: "The VPN tunnel could not be changed.".into(),
            suggestion: format!("Make sure wg-quick is installed and the WireGuard config exists. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Storage --
        MoonwatchError::Database(_) => HumanError {
            message: "The local printer list had a problem.".into(),
            suggestion: "Try the command again. Your printers should still be there.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        MoonwatchError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Moonwatch doesn't have permission to do that.".into(),
                    suggestion: "Check file permissions, or run the command with the right privileges.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        MoonwatchError::Serialization(_) => HumanError {
            message: "Moonwatch had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Parse transport error details into human-readable messages.
fn humanize_network_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") {
        HumanError {
            message: "The printer didn't respond in time.".into(),
            suggestion: "The printer might be busy or switched off, or the VPN may be down. Check it's on and reachable, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("connection refused") || lower.contains("connect") {
        HumanError {
            message: "We couldn't connect to the printer.".into(),
            suggestion: "Check the address and port, and that Moonraker is running.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("401") || lower.contains("403") {
        HumanError {
            message: "The printer rejected the API key.".into(),
            suggestion: "Log in again with the key shown in Moonraker's settings.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "Talking to the printer failed.".into(),
            suggestion: format!("Try again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
