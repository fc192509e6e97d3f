// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: initialises all backend subsystems and provides
// async-friendly methods for the command handlers to call.
//
// The rusqlite-based PrinterStore and AuditLog are `Send` but not `Sync`, so
// they are wrapped in `Arc<Mutex<>>` and locked only for the duration of one
// query.  The in-memory registry is filled from the store at startup and the
// two are written together afterwards.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use moonwatch_bridge::{Tunnel, WgQuickTunnel, platform_notifier};
use moonwatch_client::{ClientConfig, MoonrakerClient};
use moonwatch_core::AppConfig;
use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::gcode::PrinterSettings;
use moonwatch_core::types::{Credentials, PrinterEndpoint, PrinterId, TimeRange, normalize_base_url};
use moonwatch_monitor::{CommandHandle, EndpointDraft, PollOutcome, Registry, RegistryEntry, Session};
use moonwatch_store::{AuditEntry, AuditLog, ImportReport, PrinterStore, short_fingerprint};

const DATABASE_FILE: &str = "moonwatch.db";
const CONFIG_FILE: &str = "config.json";

/// Shared application services used by every command.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the struct can be moved
/// into spawned tasks.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<Mutex<PrinterStore>>,
    audit_log: Arc<Mutex<AuditLog>>,
    client: MoonrakerClient,
    session: Session,
    tunnel: Arc<dyn Tunnel>,
}

impl AppServices {
    /// Initialise all services.  Call once at startup.
    ///
    /// Opens the database, loads `config.json` (defaults when absent), and
    /// registers every stored printer with the session's registry.
    pub async fn init(dir: PathBuf) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");

        let db_path = dir.join(DATABASE_FILE);
        let store = PrinterStore::open(&db_path)?;
        let audit_log = AuditLog::open(&db_path)?;
        let config = load_config(&dir);
        if !dir.join(CONFIG_FILE).exists() {
            persist_config(&dir, &config)?;
        }

        let client = MoonrakerClient::new(&ClientConfig::from(&config))?;
        let registry = Registry::new();
        for printer in store.list()? {
            registry.insert(printer.endpoint, printer.name).await?;
        }

        let session = Session::new(
            registry,
            Arc::new(client.clone()),
            platform_notifier(),
            config.alert_thresholds(),
        )
        .with_time_range(config.default_time_range);

        let wireguard = if config.wireguard_config.is_absolute() {
            config.wireguard_config.clone()
        } else {
            dir.join(&config.wireguard_config)
        };
        let tunnel = WgQuickTunnel::new(wireguard, config.tunnel_settle());

        info!("app services initialised");
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            audit_log: Arc::new(Mutex::new(audit_log)),
            client,
            session,
            tunnel: Arc::new(tunnel),
        })
    }

    // -- Login ---------------------------------------------------------------

    /// Validate and save the server address and API key.
    pub fn login(&self, server_address: &str, api_key: &str) -> Result<Credentials> {
        let credentials = Credentials::new(server_address, api_key)?;
        normalize_base_url(&credentials.server_address)?;

        self.store().save_credentials(&credentials)?;
        info!(
            server = %credentials.server_address,
            key = %short_fingerprint(&credentials.api_key),
            "logged in"
        );
        Ok(credentials)
    }

    /// Forget credentials, printers, and the selection.
    pub async fn logout(&self) -> Result<()> {
        self.store().clear_all()?;
        self.session.deselect();
        for entry in self.session.registry().list().await {
            self.session.registry().remove(entry.id()).await;
        }
        info!("logged out");
        Ok(())
    }

    pub fn credentials(&self) -> Result<Option<Credentials>> {
        self.store().credentials()
    }

    fn require_credentials(&self) -> Result<Credentials> {
        self.credentials()?.ok_or(MoonwatchError::InvalidCredentials)
    }

    // -- Printers ------------------------------------------------------------

    pub async fn printers(&self) -> Vec<RegistryEntry> {
        self.session.registry().list().await
    }

    pub fn selected_printer(&self) -> Result<Option<PrinterId>> {
        self.store().selected_printer()
    }

    /// Register a printer.  Without an explicit key the saved login key is
    /// used.
    pub async fn add_printer(
        &self,
        address: &str,
        name: &str,
        id: Option<PrinterId>,
        api_key: Option<String>,
    ) -> Result<PrinterId> {
        let api_key = match api_key {
            Some(key) => key,
            None => self.require_credentials()?.api_key,
        };
        let mut draft = EndpointDraft::new(address, api_key);
        draft.id = id;

        let registry = self.session.registry();
        let id = registry.add(draft, name).await?;
        let entry = registry
            .get(&id)
            .await
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;

        let stored = self.store().insert(&entry.endpoint, &entry.name);
        if let Err(e) = stored {
            registry.remove(&id).await;
            return Err(e);
        }
        Ok(id)
    }

    /// Change a printer's address, and optionally its key.
    pub async fn edit_printer(
        &self,
        id: &PrinterId,
        address: &str,
        api_key: Option<String>,
    ) -> Result<PrinterEndpoint> {
        let registry = self.session.registry();
        let current = registry
            .get(id)
            .await
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;
        let api_key = api_key.unwrap_or(current.endpoint.api_key);

        let endpoint = registry.replace_endpoint(id, address, api_key).await?;
        self.store().update_endpoint(&endpoint)?;
        Ok(endpoint)
    }

    pub async fn remove_printer(&self, id: &PrinterId) -> Result<()> {
        self.session.registry().remove(id).await;
        let store = self.store();
        store.delete(id)?;
        if store.selected_printer()?.as_ref() == Some(id) {
            store.set_selected_printer(None)?;
        }
        Ok(())
    }

    /// Register every printer the logged-in server lists that is not
    /// already known.  Returns the ids added.
    pub async fn discover(&self) -> Result<Vec<PrinterId>> {
        let credentials = self.require_credentials()?;
        let server = PrinterEndpoint::new(
            "server".into(),
            &credentials.server_address,
            credentials.api_key.clone(),
        )?;

        let listed = self.client.fetch_printers(&server).await?;
        let mut added = Vec::new();
        for (id, name) in listed {
            let id = PrinterId::from(id);
            if self.session.registry().get(&id).await.is_some() {
                continue;
            }
            let id = self
                .add_printer(
                    &credentials.server_address,
                    &name,
                    Some(id),
                    Some(credentials.api_key.clone()),
                )
                .await?;
            added.push(id);
        }
        info!(count = added.len(), "printers discovered");
        Ok(added)
    }

    /// Import a file of `id|ip|name` lines using the saved login key.
    pub async fn import_legacy(&self, path: &Path) -> Result<ImportReport> {
        let credentials = self.require_credentials()?;
        let text = std::fs::read_to_string(path)?;
        let report = self.store().import_legacy(text.lines(), &credentials.api_key)?;

        let stored = self.store().list()?;
        let registry = self.session.registry();
        for printer in stored {
            if registry.get(&printer.endpoint.id).await.is_none() {
                registry.insert(printer.endpoint, printer.name).await?;
            }
        }
        Ok(report)
    }

    // -- Monitoring ----------------------------------------------------------

    /// The explicit id, else the last printer monitored.
    pub fn resolve_printer(&self, id: Option<String>) -> Result<PrinterId> {
        match id {
            Some(id) => Ok(PrinterId::from(id)),
            None => self
                .selected_printer()?
                .ok_or(MoonwatchError::NoPrinterSelected),
        }
    }

    /// Select a printer, poll it once, and remember the selection.
    pub async fn monitor(
        &self,
        id: &PrinterId,
        range: Option<TimeRange>,
    ) -> Result<(PollOutcome, RegistryEntry)> {
        if let Some(range) = range {
            // Nothing is selected yet in this process, so no poll starts here.
            let _ = self.session.set_time_range(range).await?;
        }
        let outcome = self.session.select(id).await?.wait().await;
        self.store().set_selected_printer(Some(id))?;

        let entry = self
            .session
            .registry()
            .get(id)
            .await
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;
        Ok((outcome, entry))
    }

    // -- Control -------------------------------------------------------------

    pub async fn emergency_stop(&self, id: &PrinterId) -> Result<bool> {
        self.select_for_command(id).await?;
        let handle = self.session.emergency_stop().await?;
        Ok(self.finish_command(handle, None).await)
    }

    pub async fn apply_settings(&self, id: &PrinterId, settings: PrinterSettings) -> Result<bool> {
        self.select_for_command(id).await?;
        let details = format!(
            "bed={} nozzle={} speed={}",
            settings.bed_target, settings.nozzle_target, settings.speed
        );
        let handle = self.session.apply_settings(settings).await?;
        Ok(self.finish_command(handle, Some(&details)).await)
    }

    pub async fn reset_settings(&self, id: &PrinterId) -> Result<bool> {
        self.select_for_command(id).await?;
        let handle = self.session.reset_settings().await?;
        Ok(self.finish_command(handle, None).await)
    }

    async fn select_for_command(&self, id: &PrinterId) -> Result<()> {
        self.session.focus(id).await
    }

    async fn finish_command(&self, handle: CommandHandle, details: Option<&str>) -> bool {
        let action = handle.action();
        let printer = handle.printer().clone();
        let accepted = handle.wait().await;
        self.audit(action, &printer, accepted, details);
        accepted
    }

    // -- VPN -----------------------------------------------------------------

    pub async fn vpn_up(&self) -> Result<()> {
        self.tunnel.up().await
    }

    pub async fn vpn_down(&self) -> Result<()> {
        self.tunnel.down().await
    }

    pub async fn vpn_active(&self) -> bool {
        self.tunnel.is_active().await
    }

    // -- Audit Trail ---------------------------------------------------------

    /// Record an audit entry (convenience wrapper).
    pub fn audit(&self, action: &str, printer: &PrinterId, success: bool, details: Option<&str>) {
        match self.audit_log.lock() {
            Ok(log) => {
                if let Err(e) = log.record(action, printer, success, details) {
                    error!(error = %e, "failed to record audit entry");
                }
            }
            Err(_) => error!("audit lock poisoned"),
        }
    }

    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let log = self.audit_log.lock().expect("audit lock poisoned");
        log.recent_entries(limit)
    }

    /// The newest `limit` entries for one printer, newest first.
    pub fn printer_audit_entries(&self, printer: &PrinterId, limit: u32) -> Result<Vec<AuditEntry>> {
        let log = self.audit_log.lock().expect("audit lock poisoned");
        let mut entries = log.entries_for_printer(printer)?;
        entries.reverse();
        entries.truncate(limit as usize);
        Ok(entries)
    }

    /// Number of audit entries across all printers.
    pub fn audit_total(&self) -> Result<u64> {
        let log = self.audit_log.lock().expect("audit lock poisoned");
        log.count()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, PrinterStore> {
        self.store.lock().expect("store lock poisoned")
    }
}

fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    let Ok(data) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            AppConfig::default()
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
