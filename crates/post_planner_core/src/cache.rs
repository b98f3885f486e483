//! crates/post_planner_core/src/cache.rs
//!
//! The single-slot content cache. Last write wins; the slot is keyed by nothing.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ContentResult;
use crate::ports::{CacheStore, CoreError, CoreResult};

#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Writes the result through to the persisted slot. A failed write is
    /// logged; the in-memory state the caller already updated stays valid.
    pub async fn save(&self, result: &ContentResult) {
        if let Err(e) = self.store.save(result).await {
            warn!("Failed to persist the content cache: {}", e);
        }
    }

    /// Reads the slot. An unreadable slot is treated as empty.
    pub async fn load(&self) -> Option<ContentResult> {
        match self.store.load().await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Ignoring unreadable content cache: {}", e);
                None
            }
        }
    }

    pub async fn reset(&self) -> CoreResult<()> {
        self.store.clear().await.map_err(CoreError::from)?;
        info!("Content cache cleared.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryStore;
    use crate::ports::ErrorKind;

    fn result(text: &str) -> ContentResult {
        ContentResult {
            text: text.to_string(),
            is_news: false,
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = ContentCache::new(Arc::new(MemoryStore::default()));
        assert_eq!(cache.load().await, None);

        cache.save(&result("first")).await;
        cache.save(&result("second")).await;
        assert_eq!(cache.load().await, Some(result("second")));

        cache.reset().await.unwrap();
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn storage_failures_do_not_escape_save_or_load() {
        let cache = ContentCache::new(Arc::new(MemoryStore::failing()));
        cache.save(&result("lost")).await;
        assert_eq!(cache.load().await, None);

        let err = cache.reset().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerFailure);
    }
}
