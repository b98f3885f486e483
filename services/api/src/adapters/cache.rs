//! services/api/src/adapters/cache.rs
//!
//! Stores for the single content cache slot: a JSON file that survives
//! restarts, and an in-memory slot used when no file is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use post_planner_core::{
    domain::ContentResult,
    ports::{CacheStore, PortError, PortResult},
};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

//=========================================================================================
// File-backed Store
//=========================================================================================

/// What is written to disk.
#[derive(Serialize, Deserialize)]
struct CacheRecord {
    result: ContentResult,
    saved_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    /// Creates a new `FileCacheStore`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

fn storage_error(err: impl std::fmt::Display) -> PortError {
    PortError::Storage(err.to_string())
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self) -> PortResult<Option<ContentResult>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(e)),
        };
        let record: CacheRecord = serde_json::from_str(&raw).map_err(storage_error)?;
        Ok(Some(record.result))
    }

    /// Writes to a staging file first so a crash never leaves a torn slot.
    async fn save(&self, result: &ContentResult) -> PortResult<()> {
        let record = CacheRecord {
            result: result.clone(),
            saved_at: Utc::now(),
        };
        let encoded = serde_json::to_vec_pretty(&record).map_err(storage_error)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        let staging = self.staging_path();
        tokio::fs::write(&staging, encoded).await.map_err(storage_error)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(storage_error)
    }

    async fn clear(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e)),
        }
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

#[derive(Default)]
pub struct MemoryCacheStore {
    slot: Mutex<Option<ContentResult>>,
}

impl MemoryCacheStore {
    fn slot(&self) -> PortResult<std::sync::MutexGuard<'_, Option<ContentResult>>> {
        self.slot
            .lock()
            .map_err(|_| PortError::Storage("cache slot poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self) -> PortResult<Option<ContentResult>> {
        Ok(self.slot()?.clone())
    }

    async fn save(&self, result: &ContentResult) -> PortResult<()> {
        *self.slot()? = Some(result.clone());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}
