use api_lib::adapters::{FileCacheStore, MemoryCacheStore};
use post_planner_core::{CacheStore, ContentResult};

fn sample() -> ContentResult {
    ContentResult {
        text: "Shipped the calendar view.".to_string(),
        is_news: false,
        image_url: "https://img.example/calendar.png".to_string(),
    }
}

#[tokio::test]
async fn file_store_survives_a_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("cache.json");

    FileCacheStore::new(path.clone()).save(&sample()).await.unwrap();

    let reopened = FileCacheStore::new(path.clone());
    assert_eq!(reopened.load().await.unwrap(), Some(sample()));
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn file_store_starts_empty_and_clears_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(dir.path().join("cache.json"));

    assert_eq!(store.load().await.unwrap(), None);
    store.clear().await.unwrap();

    store.save(&sample()).await.unwrap();
    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn corrupt_cache_file_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(FileCacheStore::new(path).load().await.is_err());
}

#[tokio::test]
async fn memory_store_holds_one_result() {
    let store = MemoryCacheStore::default();
    store.save(&sample()).await.unwrap();

    let replacement = ContentResult {
        text: "Newer".to_string(),
        ..sample()
    };
    store.save(&replacement).await.unwrap();

    assert_eq!(store.load().await.unwrap(), Some(replacement));
}
