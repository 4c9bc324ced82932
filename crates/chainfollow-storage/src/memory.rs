//! In-memory storage backends.
//!
//! Keeps the asset projection and published jobs in RAM. Useful for testing,
//! replaying recorded streams, and short-lived followers that don't need
//! persistence.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chainfollow_core::asset::Asset;
use chainfollow_core::error::FollowerError;
use chainfollow_core::queue::{JobOptions, JobQueue};
use chainfollow_core::store::ProjectionStore;
use serde::Serialize;

// ─── InMemoryAssetStore ───────────────────────────────────────────────────────

/// In-memory minted-asset projection.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryAssetStore {
    assets: Mutex<BTreeMap<String, Asset>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a row by asset id.
    pub fn get(&self, asset_id: &str) -> Option<Asset> {
        self.assets.lock().unwrap().get(asset_id).cloned()
    }

    /// All rows, ordered by asset id.
    pub fn assets(&self) -> Vec<Asset> {
        self.assets.lock().unwrap().values().cloned().collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.assets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ProjectionStore for InMemoryAssetStore {
    async fn has_asset(&self, asset_id: &str) -> Result<bool, FollowerError> {
        Ok(self.assets.lock().unwrap().contains_key(asset_id))
    }

    async fn insert_assets(&self, assets: &[Asset]) -> Result<(), FollowerError> {
        let mut rows = self.assets.lock().unwrap();
        for asset in assets {
            rows.entry(asset.asset_id.clone())
                .or_insert_with(|| asset.clone());
        }
        Ok(())
    }

    async fn delete_assets_after_slot(&self, slot: u64) -> Result<u64, FollowerError> {
        let mut rows = self.assets.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, a| a.first_appeared_in_slot <= slot);
        Ok((before - rows.len()) as u64)
    }
}

// ─── MemoryJobQueue ───────────────────────────────────────────────────────────

/// A job accepted by [`MemoryJobQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedJob {
    pub name: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
}

/// In-memory job queue. Records published jobs; nothing consumes them.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<QueuedJob>>,
    running: AtomicBool,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All published jobs in publish order.
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().unwrap().clone()
    }

    /// Published jobs with the given name.
    pub fn jobs_named(&self, name: &str) -> Vec<QueuedJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.name == name)
            .cloned()
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn publish(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<(), FollowerError> {
        if !self.is_running() {
            return Err(FollowerError::Queue(format!(
                "cannot publish '{name}': queue is not started"
            )));
        }
        self.jobs.lock().unwrap().push(QueuedJob {
            name: name.to_string(),
            payload,
            options,
        });
        Ok(())
    }

    async fn start(&self) -> Result<(), FollowerError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), FollowerError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfollow_core::asset::MintedAsset;
    use chainfollow_core::queue::{MetadataFetchJob, METADATA_FETCH_JOB};

    fn asset(key: &str, slot: u64) -> Asset {
        Asset::first_seen(&MintedAsset::parse(key).unwrap(), slot).unwrap()
    }

    #[tokio::test]
    async fn insert_and_query_assets() {
        let store = InMemoryAssetStore::new();
        store
            .insert_assets(&[asset("aa.01", 10), asset("bb", 11)])
            .await
            .unwrap();

        assert!(store.has_asset("aa01").await.unwrap());
        assert!(store.has_asset("bb").await.unwrap());
        assert!(!store.has_asset("cc").await.unwrap());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn insert_never_overwrites() {
        let store = InMemoryAssetStore::new();
        store.insert_assets(&[asset("aa", 10)]).await.unwrap();
        store.insert_assets(&[asset("aa", 99)]).await.unwrap();
        assert_eq!(store.get("aa").unwrap().first_appeared_in_slot, 10);
    }

    #[tokio::test]
    async fn delete_after_slot_is_strict() {
        let store = InMemoryAssetStore::new();
        for (i, slot) in (100..=105).enumerate() {
            store
                .insert_assets(&[asset(&format!("{:02x}", i), slot)])
                .await
                .unwrap();
        }
        assert_eq!(store.delete_assets_after_slot(102).await.unwrap(), 3);
        assert_eq!(store.len(), 3); // 100, 101, 102 remain
        assert!(store.assets().iter().all(|a| a.first_appeared_in_slot <= 102));

        assert_eq!(store.delete_assets_after_slot(0).await.unwrap(), 3);
        assert!(store.is_empty());
        assert_eq!(store.delete_assets_after_slot(0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn queue_rejects_publish_when_stopped() {
        let queue = MemoryJobQueue::new();
        let job = MetadataFetchJob::new("aa");
        let err = queue
            .publish_metadata_fetch(&job, JobOptions::METADATA_FETCH)
            .await
            .unwrap_err();
        assert!(err.is_queue());

        queue.start().await.unwrap();
        queue
            .publish_metadata_fetch(&job, JobOptions::METADATA_FETCH)
            .await
            .unwrap();
        queue.stop().await.unwrap();
        assert!(!queue.is_running());

        let jobs = queue.jobs_named(METADATA_FETCH_JOB);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].payload, serde_json::json!({ "assetId": "aa" }));
        assert_eq!(jobs[0].options, JobOptions::METADATA_FETCH);
    }
}
