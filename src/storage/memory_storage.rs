use crate::{
    error::{Result, TaskboardError},
    storage::KeyValueStore,
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

/// In-process storage with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<BTreeMap<String, String>>,
    writes: Mutex<BTreeMap<String, usize>>,
    quota: Option<u64>,
    unavailable: AtomicBool,
    rejected_keys: Mutex<BTreeSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any write that would bring the total stored bytes above `quota`
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Makes every subsequent operation fail, as a storage outage would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every subsequent write to `key` fail while other keys still work
    pub fn reject_writes_to(&self, key: &str) {
        if let Ok(mut rejected) = self.rejected_keys.lock() {
            rejected.insert(key.to_string());
        }
    }

    /// Number of successful writes to `key`
    pub fn write_count(&self, key: &str) -> usize {
        self.writes
            .lock()
            .map(|writes| writes.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total bytes currently stored
    pub fn used_bytes(&self) -> u64 {
        self.records
            .lock()
            .map(|records| total_bytes(&records))
            .unwrap_or(0)
    }

    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaskboardError::Storage("storage unavailable".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| TaskboardError::Storage("memory storage lock poisoned".to_string()))
    }
}

fn total_bytes(records: &BTreeMap<String, String>) -> u64 {
    records.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum()
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let rejected = self
            .rejected_keys
            .lock()
            .map(|rejected| rejected.contains(key))
            .unwrap_or(false);
        if rejected {
            return Err(TaskboardError::Storage(format!("write to {} rejected", key)));
        }

        let mut records = self.records()?;
        if let Some(quota) = self.quota {
            let replaced = records.get(key).map(|v| (key.len() + v.len()) as u64).unwrap_or(0);
            let needed = total_bytes(&records) - replaced + (key.len() + value.len()) as u64;
            if needed > quota {
                return Err(TaskboardError::QuotaExceeded { needed, quota });
            }
        }
        records.insert(key.to_string(), value.to_string());
        drop(records);

        if let Ok(mut writes) = self.writes.lock() {
            *writes.entry(key.to_string()).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.records()?.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records()?.keys().cloned().collect())
    }
}
