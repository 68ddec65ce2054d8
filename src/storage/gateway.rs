use crate::{
    config::{GatewayConfig, Settings},
    domain::{Board, EntityStore},
    error::{Result, TaskboardError},
    storage::{
        snapshot::{self, ImportedSnapshot, StorageUsage},
        KeyValueStore,
    },
    workspace::{SharedWorkspace, Workspace},
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Outcome of the most recent save, as seen by subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    /// A debounced save is waiting for the quiet period to end
    Pending,
    Saved { bytes: u64, at: DateTime<Utc> },
    Failed { message: String },
}

/// What `load` found in storage
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub store: EntityStore,
    pub settings: Settings,
    /// Set when a stored record could not be read and defaults were used instead
    pub warning: Option<String>,
}

impl LoadOutcome {
    pub fn into_workspace(self) -> Workspace {
        Workspace::new(self.store, &self.settings)
    }
}

/// Reads and writes the workspace to durable storage.
///
/// Scheduled saves are debounced through a single replaceable timer: each
/// call to [`schedule_save`](Self::schedule_save) cancels the pending timer
/// and starts a new one, and the workspace is read only when a timer fires.
pub struct PersistenceGateway<S: KeyValueStore + 'static> {
    storage: Arc<S>,
    config: Arc<GatewayConfig>,
    pending: Mutex<Option<JoinHandle<()>>>,
    // Held for the duration of a write so two saves never interleave records.
    write_lock: Arc<tokio::sync::Mutex<()>>,
    status: Arc<watch::Sender<SaveStatus>>,
}

impl<S: KeyValueStore + 'static> PersistenceGateway<S> {
    pub fn new(storage: S, config: GatewayConfig) -> Self {
        Self::with_shared_storage(Arc::new(storage), config)
    }

    pub fn with_shared_storage(storage: Arc<S>, config: GatewayConfig) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            storage,
            config: Arc::new(config),
            pending: Mutex::new(None),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
            status: Arc::new(status),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Returns the last durable state, or the default workspace when nothing
    /// usable is stored. Never fails: unreadable records become a warning.
    pub async fn load(&self) -> LoadOutcome {
        let mut warnings = Vec::new();

        let store = match self.storage.get(&self.config.boards_key).await {
            Ok(Some(text)) => match serde_json::from_str::<Vec<Board>>(&text) {
                Ok(boards) if !boards.is_empty() => EntityStore::from_boards(boards),
                Ok(_) => EntityStore::default(),
                Err(e) => {
                    warnings.push(format!("stored boards could not be parsed: {}", e));
                    EntityStore::default()
                }
            },
            Ok(None) => EntityStore::default(),
            Err(e) => {
                warnings.push(format!("stored boards could not be read: {}", e));
                EntityStore::default()
            }
        };

        let settings = match self.storage.get(&self.config.settings_key).await {
            Ok(Some(text)) => serde_json::from_str::<Settings>(&text).unwrap_or_else(|e| {
                warnings.push(format!("stored settings could not be parsed: {}", e));
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                warnings.push(format!("stored settings could not be read: {}", e));
                Settings::default()
            }
        };

        let warning = if warnings.is_empty() {
            debug!(boards = store.board_count(), "loaded workspace");
            None
        } else {
            let warning = warnings.join("; ");
            warn!(warning = %warning, "falling back to defaults while loading");
            Some(warning)
        };

        LoadOutcome {
            store,
            settings,
            warning,
        }
    }

    /// Writes the workspace immediately and returns the bytes written.
    ///
    /// The settings record is written before the boards record. A failure
    /// of the settings write leaves both records as they were.
    pub async fn save_now(&self, workspace: &SharedWorkspace) -> Result<u64> {
        let result = write_workspace(&self.storage, &self.config, &self.write_lock, workspace).await;
        report(&self.status, &result);
        result
    }

    /// Schedules a debounced save, replacing any pending one.
    ///
    /// Fails only when called outside a Tokio runtime.
    pub fn schedule_save(&self, workspace: &SharedWorkspace) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| TaskboardError::Storage("no async runtime for scheduled save".to_string()))?;

        let storage = Arc::clone(&self.storage);
        let config = Arc::clone(&self.config);
        let write_lock = Arc::clone(&self.write_lock);
        let status = Arc::clone(&self.status);
        let workspace = Arc::clone(workspace);
        let delay = self.config.debounce();

        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached from the timer: superseding the timer must not cut a
            // write short.
            let write = tokio::spawn(async move {
                let result = write_workspace(&storage, &config, &write_lock, &workspace).await;
                report(&status, &result);
            });
            let _ = write.await;
        });

        let mut slot = self.pending_slot()?;
        if let Some(previous) = slot.replace(timer) {
            if !previous.is_finished() {
                debug!("superseded pending save");
            }
            previous.abort();
        }
        drop(slot);

        self.status.send_replace(SaveStatus::Pending);
        Ok(())
    }

    /// Cancels the pending save, if any, and writes right away
    pub async fn flush(&self, workspace: &SharedWorkspace) -> Result<u64> {
        self.cancel_pending();
        self.save_now(workspace).await
    }

    /// Drops the pending save without writing; returns whether one was waiting
    pub fn cancel_pending(&self) -> bool {
        let Ok(mut slot) = self.pending_slot() else {
            return false;
        };
        match slot.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                if waiting {
                    self.status.send_if_modified(|status| {
                        if *status == SaveStatus::Pending {
                            *status = SaveStatus::Idle;
                            true
                        } else {
                            false
                        }
                    });
                }
                waiting
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_slot()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn export_snapshot(&self, workspace: &Workspace) -> Result<Vec<u8>> {
        snapshot::export_snapshot(&workspace.store, &workspace.settings())
    }

    /// Validates a backup; the caller decides when to swap it into the workspace
    pub fn import_snapshot(&self, payload: &[u8]) -> Result<ImportedSnapshot> {
        snapshot::import_snapshot(payload)
    }

    pub fn storage_usage(&self, store: &EntityStore) -> Result<StorageUsage> {
        StorageUsage::measure(store)
    }

    fn pending_slot(&self) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<()>>>> {
        self.pending
            .lock()
            .map_err(|_| TaskboardError::Storage("save timer lock poisoned".to_string()))
    }
}

impl<S: KeyValueStore + 'static> Drop for PersistenceGateway<S> {
    fn drop(&mut self) {
        if self.cancel_pending() {
            warn!("dropped gateway with an unsaved pending change");
        }
    }
}

/// Serializes both records from the workspace as it is right now
fn capture(workspace: &SharedWorkspace) -> Result<(String, String)> {
    let workspace = workspace
        .read()
        .map_err(|_| TaskboardError::Storage("workspace lock poisoned".to_string()))?;
    let boards = serde_json::to_string(workspace.store.boards())?;
    let settings = serde_json::to_string(&workspace.settings())?;
    Ok((boards, settings))
}

async fn write_workspace<S: KeyValueStore>(
    storage: &Arc<S>,
    config: &GatewayConfig,
    write_lock: &tokio::sync::Mutex<()>,
    workspace: &SharedWorkspace,
) -> Result<u64> {
    let _guard = write_lock.lock().await;
    let (boards, settings) = capture(workspace)?;
    let bytes = (boards.len() + settings.len()) as u64;

    if let Some(quota) = config.quota_bytes {
        if bytes > quota {
            return Err(TaskboardError::QuotaExceeded { needed: bytes, quota });
        }
    }

    // Settings first. A failed boards write then leaves the old tree, and
    // `lastOpenBoard` is clamped against it on load.
    storage.set(&config.settings_key, &settings).await?;
    storage.set(&config.boards_key, &boards).await?;
    Ok(bytes)
}

fn report(status: &watch::Sender<SaveStatus>, result: &Result<u64>) {
    match result {
        Ok(bytes) => {
            info!(bytes, "saved workspace");
            status.send_replace(SaveStatus::Saved {
                bytes: *bytes,
                at: Utc::now(),
            });
        }
        Err(e) => {
            error!(error = %e, "failed to save workspace");
            status.send_replace(SaveStatus::Failed {
                message: e.to_string(),
            });
        }
    }
}
