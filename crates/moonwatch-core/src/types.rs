// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Moonwatch printer client.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MoonwatchError, Result};

/// Opaque, stable identifier for a registered printer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterId(String);

impl PrinterId {
    /// Generate a fresh identifier.
    ///
    /// UUIDv7 embeds a millisecond timestamp, so ids minted by one process
    /// sort in creation order and do not collide.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PrinterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PrinterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network address plus credential for one controllable printer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterEndpoint {
    pub id: PrinterId,
    /// Normalized controller base URL, e.g. `http://192.168.1.40:7125`.
    pub base_url: String,
    /// Shared secret sent as `X-Api-Key` on every request.
    pub api_key: String,
}

impl PrinterEndpoint {
    /// Build an endpoint from user input, normalizing the address.
    pub fn new(id: PrinterId, address: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            id,
            base_url: normalize_base_url(address)?,
            api_key: api_key.into(),
        })
    }

    /// Join a controller path (starting with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// The API key must never end up in logs.
impl std::fmt::Debug for PrinterEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterEndpoint")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Normalize a user-entered controller address into a base URL.
///
/// A bare host or `host:port` gets an `http://` scheme; trailing slashes are
/// removed so paths can be appended directly.
pub fn normalize_base_url(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let invalid = |reason: &str| MoonwatchError::InvalidEndpoint {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("address is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let (scheme, rest) = with_scheme
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Err(invalid("only http and https are supported"));
    }

    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(invalid("missing host"));
    }
    if authority.chars().any(char::is_whitespace) {
        return Err(invalid("host contains whitespace"));
    }

    Ok(with_scheme.trim_end_matches('/').to_string())
}

/// Identity fields copied into every [`PrinterView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMeta {
    pub id: PrinterId,
    pub name: String,
}

/// Display-ready snapshot of one printer at one point in time.
///
/// Every poll produces a new value; views are never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterView {
    pub id: PrinterId,
    pub name: String,
    pub bed_temperature: f64,
    pub bed_target: f64,
    pub nozzle_temperature: f64,
    /// Raw seconds since print start, never negative.
    pub elapsed_print_time_seconds: f64,
    /// Controller-defined status tag, copied verbatim.
    pub print_status: String,
    /// Fraction complete (0.0–1.0) when the controller reports it.
    pub progress: Option<f64>,
    pub filename: Option<String>,
}

impl PrinterView {
    /// Elapsed time with fractional seconds discarded.
    pub fn elapsed_whole_seconds(&self) -> u64 {
        crate::telemetry::whole_seconds(self.elapsed_print_time_seconds)
    }

    /// Elapsed time rendered as `"<h>h <m>m <s>s"`.
    pub fn formatted_print_time(&self) -> String {
        crate::telemetry::format_print_time(self.elapsed_print_time_seconds)
    }

    pub fn tone(&self) -> StatusTone {
        StatusTone::classify(&self.print_status)
    }
}

/// Styling bucket for a status string.
///
/// The controller's vocabulary is open; only a known subset maps to a
/// distinct tone and everything else is [`StatusTone::Neutral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTone {
    /// A print is running.
    Active,
    /// Ready for work or paused.
    Waiting,
    /// Print stopped abnormally or the controller is in an error state.
    Fault,
    Neutral,
}

impl StatusTone {
    pub fn classify(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "printing" => Self::Active,
            "idle" | "standby" | "paused" | "ready" => Self::Waiting,
            "error" | "stopped" | "cancelled" | "shutdown" => Self::Fault,
            _ => Self::Neutral,
        }
    }

    /// ANSI colour code used by the terminal front end.
    pub fn ansi_color(&self) -> &'static str {
        match self {
            Self::Active => "32",
            Self::Waiting => "33",
            Self::Fault => "31",
            Self::Neutral => "34",
        }
    }
}

/// One point of the temperature chart, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub index: usize,
    pub temperature: f64,
}

/// Window of temperature history requested from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeRange {
    #[default]
    All,
    #[serde(rename = "LAST_30_MIN")]
    Last30Min,
    LastHour,
    #[serde(rename = "LAST_12_HOURS")]
    Last12Hours,
}

impl TimeRange {
    pub const VARIANTS: [TimeRange; 4] = [
        TimeRange::All,
        TimeRange::Last30Min,
        TimeRange::LastHour,
        TimeRange::Last12Hours,
    ];

    /// Value of the `interval` query parameter.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Last30Min => "LAST_30_MIN",
            Self::LastHour => "LAST_HOUR",
            Self::Last12Hours => "LAST_12_HOURS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All time",
            Self::Last30Min => "30 min",
            Self::LastHour => "1 hour",
            Self::Last12Hours => "12 hours",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "last_30_min" | "30m" | "30min" => Ok(Self::Last30Min),
            "last_hour" | "1h" | "hour" => Ok(Self::LastHour),
            "last_12_hours" | "12h" => Ok(Self::Last12Hours),
            other => Err(format!(
                "unknown time range '{other}' (expected all, 30m, 1h or 12h)"
            )),
        }
    }
}

/// Server address and API key entered at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server_address: String,
    pub api_key: String,
}

impl Credentials {
    /// Both fields must be non-blank.
    pub fn new(server_address: &str, api_key: &str) -> Result<Self> {
        let server_address = server_address.trim();
        let api_key = api_key.trim();
        if server_address.is_empty() || api_key.is_empty() {
            return Err(MoonwatchError::InvalidCredentials);
        }
        Ok(Self {
            server_address: server_address.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server_address", &self.server_address)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
