// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async HTTP client for Moonraker-compatible printer controllers.
//
// Supported controller calls:
//   - GET  /printer/objects/query?heater_bed,toolhead,print_stats
//   - POST /printer/gcode/script           {"script": "..."}
//   - POST /printer/print/cancel
//   - GET  /printer/temperature/history?interval=<RANGE>
//   - GET  /printers
//
// Every call is a single attempt.  Failures come back as `Network` (connect,
// timeout, non-success status) or `Protocol` (body does not decode).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use moonwatch_core::AppConfig;
use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::gcode::join_script;
use moonwatch_core::payload::StatusPayload;
use moonwatch_core::types::{PrinterEndpoint, TimeRange};

/// Header carrying the controller API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

pub const STATUS_PATH: &str = "/printer/objects/query?heater_bed,toolhead,print_stats";
pub const SCRIPT_PATH: &str = "/printer/gcode/script";
pub const CANCEL_PATH: &str = "/printer/print/cancel";
pub const HISTORY_PATH: &str = "/printer/temperature/history";
pub const PRINTERS_PATH: &str = "/printers";

/// Timeouts applied to every controller request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// The operations the session needs from a printer controller.
///
/// [`MoonrakerClient`] is the production implementation; tests substitute
/// in-process fakes.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn query_status(&self, endpoint: &PrinterEndpoint) -> Result<StatusPayload>;

    async fn send_command(&self, endpoint: &PrinterEndpoint, lines: &[String]) -> Result<()>;

    async fn cancel_print(&self, endpoint: &PrinterEndpoint) -> Result<()>;

    /// Empty on any failure; callers treat empty as "unavailable".
    async fn fetch_temperature_history(
        &self,
        endpoint: &PrinterEndpoint,
        range: TimeRange,
    ) -> Vec<f64>;
}

#[derive(Serialize)]
struct ScriptBody<'a> {
    script: &'a str,
}

/// Moonraker HTTP client.
///
/// One instance serves every printer: the connection pool is shared and the
/// endpoint is passed per call.
#[derive(Debug, Clone)]
pub struct MoonrakerClient {
    http: Client,
}

impl MoonrakerClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MoonwatchError::Network(format!("build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Fetch heater bed, toolhead, and print statistics.
    #[instrument(skip(self, endpoint), fields(printer = %endpoint.id, url = %endpoint.base_url))]
    pub async fn query_status(&self, endpoint: &PrinterEndpoint) -> Result<StatusPayload> {
        debug!("querying printer status");
        let response = self
            .send("status query", self.http.get(endpoint.url(STATUS_PATH)), endpoint)
            .await?;
        let payload: StatusPayload = decode("status query", response).await?;
        debug!(status = %payload.result.status, "status received");
        Ok(payload)
    }

    /// Post G-code lines as one newline-joined script.
    #[instrument(skip(self, endpoint, lines), fields(printer = %endpoint.id, lines = lines.len()))]
    pub async fn send_command<S: AsRef<str>>(
        &self,
        endpoint: &PrinterEndpoint,
        lines: &[S],
    ) -> Result<()> {
        let script = join_script(lines);
        // `send` sets the content type; `.json()` would add a second one.
        let body = serde_json::to_vec(&ScriptBody { script: &script })?;
        let request = self.http.post(endpoint.url(SCRIPT_PATH)).body(body);

        info!("sending G-code script");
        self.send("gcode script", request, endpoint).await?;
        info!("G-code script accepted");
        Ok(())
    }

    /// Cancel the running print.  Sent with no body.
    #[instrument(skip(self, endpoint), fields(printer = %endpoint.id))]
    pub async fn cancel_print(&self, endpoint: &PrinterEndpoint) -> Result<()> {
        info!("sending print cancel");
        self.send("print cancel", self.http.post(endpoint.url(CANCEL_PATH)), endpoint)
            .await?;
        info!("print cancel accepted");
        Ok(())
    }

    /// Temperature readings for the requested window, oldest first.
    #[instrument(skip(self, endpoint), fields(printer = %endpoint.id, range = range.wire_name()))]
    pub async fn try_fetch_temperature_history(
        &self,
        endpoint: &PrinterEndpoint,
        range: TimeRange,
    ) -> Result<Vec<f64>> {
        let url = format!(
            "{}?interval={}",
            endpoint.url(HISTORY_PATH),
            range.wire_name()
        );
        let response = self
            .send("temperature history", self.http.get(url), endpoint)
            .await?;
        let readings: Vec<f64> = decode("temperature history", response).await?;
        debug!(count = readings.len(), "temperature history received");
        Ok(readings)
    }

    /// Like [`Self::try_fetch_temperature_history`] but empty on failure.
    pub async fn fetch_temperature_history(
        &self,
        endpoint: &PrinterEndpoint,
        range: TimeRange,
    ) -> Vec<f64> {
        match self.try_fetch_temperature_history(endpoint, range).await {
            Ok(readings) => readings,
            Err(e) => {
                warn!(printer = %endpoint.id, error = %e, "temperature history unavailable");
                Vec::new()
            }
        }
    }

    /// Printers the controller knows about, keyed by controller-side id.
    #[instrument(skip(self, endpoint), fields(url = %endpoint.base_url))]
    pub async fn fetch_printers(
        &self,
        endpoint: &PrinterEndpoint,
    ) -> Result<BTreeMap<String, String>> {
        let response = self
            .send("printer list", self.http.get(endpoint.url(PRINTERS_PATH)), endpoint)
            .await?;
        let printers: BTreeMap<String, String> = decode("printer list", response).await?;
        debug!(count = printers.len(), "printer list received");
        Ok(printers)
    }

    /// Attach credentials, send once, and reject non-success statuses.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
        endpoint: &PrinterEndpoint,
    ) -> Result<Response> {
        let response = request
            .header(API_KEY_HEADER, &endpoint.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(operation, %status, "controller rejected request");
            return Err(MoonwatchError::Network(format!(
                "{operation} returned HTTP {status}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Controller for MoonrakerClient {
    async fn query_status(&self, endpoint: &PrinterEndpoint) -> Result<StatusPayload> {
        MoonrakerClient::query_status(self, endpoint).await
    }

    async fn send_command(&self, endpoint: &PrinterEndpoint, lines: &[String]) -> Result<()> {
        MoonrakerClient::send_command(self, endpoint, lines).await
    }

    async fn cancel_print(&self, endpoint: &PrinterEndpoint) -> Result<()> {
        MoonrakerClient::cancel_print(self, endpoint).await
    }

    async fn fetch_temperature_history(
        &self,
        endpoint: &PrinterEndpoint,
        range: TimeRange,
    ) -> Vec<f64> {
        MoonrakerClient::fetch_temperature_history(self, endpoint, range).await
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Read the whole body, then decode.  A body that cannot be read is a
/// transport failure; one that reads but does not parse is a protocol error.
async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(operation, e))?;
    serde_json::from_slice(&body)
        .map_err(|e| MoonwatchError::Protocol(format!("{operation}: {e}")))
}

fn transport_error(operation: &str, err: reqwest::Error) -> MoonwatchError {
    if err.is_timeout() {
        MoonwatchError::Network(format!("{operation} timed out: {err}"))
    } else if err.is_connect() {
        MoonwatchError::Network(format!("{operation} could not connect: {err}"))
    } else if err.is_decode() {
        MoonwatchError::Protocol(format!("{operation}: {err}"))
    } else {
        MoonwatchError::Network(format!("{operation}: {err}"))
    }
}
