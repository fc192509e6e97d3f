// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory printer registry.
//
// The registry is the only shared mutable state in a session.  Every write
// takes the single write lock, so two polls for the same printer can never
// interleave half an update.  Views and histories are separate field groups:
// each write replaces its own group wholesale, last write wins.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use moonwatch_core::error::{MoonwatchError, Result};
use moonwatch_core::types::{EndpointMeta, PrinterEndpoint, PrinterId, PrinterView, TemperatureSample};

/// User input for a new printer, before the address is normalized.
#[derive(Clone)]
pub struct EndpointDraft {
    /// Generated when `None`.
    pub id: Option<PrinterId>,
    pub address: String,
    pub api_key: String,
}

impl EndpointDraft {
    pub fn new(address: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<PrinterId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// One registered printer and the last telemetry seen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub endpoint: PrinterEndpoint,
    pub name: String,
    /// Last successfully normalized status, kept when later polls fail.
    pub view: Option<PrinterView>,
    /// Last temperature series; empty means unavailable.
    pub history: Vec<TemperatureSample>,
    /// When `view` was last written.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    fn new(endpoint: PrinterEndpoint, name: String) -> Self {
        Self {
            endpoint,
            name,
            view: None,
            history: Vec::new(),
            refreshed_at: None,
        }
    }

    pub fn id(&self) -> &PrinterId {
        &self.endpoint.id
    }

    /// Identity fields handed to the normalizer.
    pub fn meta(&self) -> EndpointMeta {
        EndpointMeta {
            id: self.endpoint.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    order: Vec<PrinterId>,
    entries: HashMap<PrinterId, RegistryEntry>,
}

/// Cheaply cloneable handle to the shared registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a printer from user input.
    ///
    /// The address is normalized first; a blank display name falls back to
    /// the normalized base URL.  A duplicate id is rejected.
    pub async fn add(&self, draft: EndpointDraft, display_name: &str) -> Result<PrinterId> {
        let id = draft.id.unwrap_or_else(PrinterId::generate);
        let endpoint = PrinterEndpoint::new(id, &draft.address, draft.api_key)?;
        let name = match display_name.trim() {
            "" => endpoint.base_url.clone(),
            trimmed => trimmed.to_string(),
        };
        let id = endpoint.id.clone();
        self.insert(endpoint, name).await?;
        Ok(id)
    }

    /// Register an already normalized endpoint (e.g. one loaded from disk).
    pub async fn insert(&self, endpoint: PrinterEndpoint, name: String) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&endpoint.id) {
            return Err(MoonwatchError::DuplicateId(endpoint.id.to_string()));
        }

        info!(printer = %endpoint.id, url = %endpoint.base_url, name = %name, "printer registered");
        let id = endpoint.id.clone();
        inner.order.push(id.clone());
        inner.entries.insert(id, RegistryEntry::new(endpoint, name));
        Ok(())
    }

    /// Remove a printer.  Unknown ids are ignored.
    pub async fn remove(&self, id: &PrinterId) {
        let mut inner = self.inner.write().await;
        if inner.entries.remove(id).is_some() {
            inner.order.retain(|existing| existing != id);
            info!(printer = %id, "printer removed");
        }
    }

    /// Snapshot of every entry, in registration order.
    pub async fn list(&self) -> Vec<RegistryEntry> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    pub async fn get(&self, id: &PrinterId) -> Option<RegistryEntry> {
        self.inner.read().await.entries.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Explicit edit of a printer's address and key.  Cached telemetry is
    /// kept until the next poll replaces it.
    pub async fn replace_endpoint(
        &self,
        id: &PrinterId,
        address: &str,
        api_key: impl Into<String>,
    ) -> Result<PrinterEndpoint> {
        let endpoint = PrinterEndpoint::new(id.clone(), address, api_key)?;
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;
        entry.endpoint = endpoint.clone();
        info!(printer = %id, url = %endpoint.base_url, "printer endpoint replaced");
        Ok(endpoint)
    }

    /// Replace the cached view and stamp the refresh time.
    pub async fn update_view(&self, id: &PrinterId, view: PrinterView) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;
        entry.view = Some(view);
        entry.refreshed_at = Some(Utc::now());
        debug!(printer = %id, "view updated");
        Ok(())
    }

    /// Replace the cached temperature series.
    pub async fn update_history(&self, id: &PrinterId, history: Vec<TemperatureSample>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| MoonwatchError::NotFound(id.to_string()))?;
        debug!(printer = %id, samples = history.len(), "history updated");
        entry.history = history;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonwatch_core::telemetry::to_samples;

    fn view(id: &str, bed: f64) -> PrinterView {
        PrinterView {
            id: id.into(),
            name: "Voron".into(),
            bed_temperature: bed,
            bed_target: 60.0,
            nozzle_temperature: 200.0,
            elapsed_print_time_seconds: 0.0,
            print_status: "printing".into(),
            progress: None,
            filename: None,
        }
    }

    #[tokio::test]
    async fn list_is_insertion_order() {
        let registry = Registry::new();
        for (id, name) in [("c", "Gamma"), ("a", "Alpha"), ("b", "Beta")] {
            registry
                .add(EndpointDraft::new("10.0.0.1", "k").with_id(id), name)
                .await
                .unwrap();
        }

        let names: Vec<_> = registry.list().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Gamma", "Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let registry = Registry::new();
        let first = registry.add(EndpointDraft::new("10.0.0.1", "k"), "A").await.unwrap();
        let second = registry.add(EndpointDraft::new("10.0.0.2", "k"), "B").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let registry = Registry::new();
        registry
            .add(EndpointDraft::new("10.0.0.1", "k").with_id("p1"), "A")
            .await
            .unwrap();
        let err = registry
            .add(EndpointDraft::new("10.0.0.2", "k").with_id("p1"), "B")
            .await
            .unwrap_err();

        assert!(matches!(err, MoonwatchError::DuplicateId(_)));
        let entries = registry.list().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "A");
    }

    #[tokio::test]
    async fn remove_excludes_and_unknown_is_noop() {
        let registry = Registry::new();
        let a = registry.add(EndpointDraft::new("10.0.0.1", "k"), "A").await.unwrap();
        let b = registry.add(EndpointDraft::new("10.0.0.2", "k"), "B").await.unwrap();

        registry.remove(&a).await;
        registry.remove(&"missing".into()).await;

        let ids: Vec<_> = registry.list().await.into_iter().map(|e| e.endpoint.id).collect();
        assert_eq!(ids, [b]);
    }

    #[tokio::test]
    async fn invalid_address_is_not_registered() {
        let registry = Registry::new();
        let err = registry.add(EndpointDraft::new("   ", "k"), "A").await.unwrap_err();
        assert!(matches!(err, MoonwatchError::InvalidEndpoint { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn blank_name_falls_back_to_url() {
        let registry = Registry::new();
        let id = registry.add(EndpointDraft::new("10.0.0.7:7125/", "k"), " ").await.unwrap();
        assert_eq!(registry.get(&id).await.unwrap().name, "http://10.0.0.7:7125");
    }

    #[tokio::test]
    async fn updates_on_unknown_id_are_not_found() {
        let registry = Registry::new();
        let ghost: PrinterId = "ghost".into();
        assert!(matches!(
            registry.update_view(&ghost, view("ghost", 1.0)).await,
            Err(MoonwatchError::NotFound(_))
        ));
        assert!(matches!(
            registry.update_history(&ghost, Vec::new()).await,
            Err(MoonwatchError::NotFound(_))
        ));
        assert!(matches!(
            registry.replace_endpoint(&ghost, "10.0.0.1", "k").await,
            Err(MoonwatchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn view_and_history_are_independent() {
        let registry = Registry::new();
        let id = registry.add(EndpointDraft::new("10.0.0.1", "k"), "A").await.unwrap();

        registry.update_history(&id, to_samples(&[1.0, 2.0])).await.unwrap();
        registry.update_view(&id, view(id.as_str(), 55.0)).await.unwrap();

        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.history.len(), 2);
        assert_eq!(entry.view.unwrap().bed_temperature, 55.0);
        assert!(entry.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn replace_endpoint_keeps_cached_view() {
        let registry = Registry::new();
        let id = registry.add(EndpointDraft::new("10.0.0.1", "old"), "A").await.unwrap();
        registry.update_view(&id, view(id.as_str(), 60.0)).await.unwrap();

        let endpoint = registry.replace_endpoint(&id, "10.0.0.9:7125", "new").await.unwrap();
        assert_eq!(endpoint.base_url, "http://10.0.0.9:7125");

        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.endpoint.api_key, "new");
        assert!(entry.view.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_view_updates_never_lose_the_entry() {
        let registry = Registry::new();
        let id = registry.add(EndpointDraft::new("10.0.0.1", "k"), "A").await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..64 {
            let registry = registry.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                registry.update_view(&id, view(id.as_str(), i as f64)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let entries = registry.list().await;
        assert_eq!(entries.len(), 1);
        let bed = entries[0].view.as_ref().unwrap().bed_temperature;
        assert!((0.0..64.0).contains(&bed));
    }
}
