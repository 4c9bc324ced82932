//! Event processor: turns chain-sync events into projection mutations and
//! metadata-fetch jobs.
//!
//! The processor holds no state of its own. Every store and queue call is
//! awaited before the next one is issued, and the transport's continuation is
//! only fired after all of an event's side effects have completed. A failure
//! anywhere drops the continuation, pausing the stream at that event.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::asset::{Asset, MintedAsset};
use crate::error::FollowerError;
use crate::queue::{JobOptions, JobQueue, MetadataFetchJob};
use crate::store::ProjectionStore;
use crate::transport::{ChainSyncHandler, RequestNext};
use crate::types::{Block, Point, Tip};

/// What a roll-forward did to the projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollForwardOutcome {
    /// Asset ids inserted (and scheduled) by this block, in processing order.
    pub inserted: Vec<String>,
    /// Mint entries whose asset was already present.
    pub skipped: usize,
    /// Mint keys that could not be parsed and were left out.
    pub rejected: Vec<String>,
}

/// Chain-sync handler maintaining the minted-asset projection.
pub struct EventProcessor {
    store: Arc<dyn ProjectionStore>,
    queue: Arc<dyn JobQueue>,
    job_options: JobOptions,
}

impl EventProcessor {
    pub fn new(store: Arc<dyn ProjectionStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            store,
            queue,
            job_options: JobOptions::METADATA_FETCH,
        }
    }

    /// Override the retry policy of published metadata-fetch jobs.
    pub fn with_job_options(mut self, options: JobOptions) -> Self {
        self.job_options = options;
        self
    }

    pub fn job_options(&self) -> JobOptions {
        self.job_options
    }

    /// Drop every asset first seen after `point`. Returns the number of rows deleted.
    ///
    /// Already published jobs are left alone.
    pub async fn rollback(&self, point: &Point, tip: Option<&Tip>) -> Result<u64, FollowerError> {
        let deleted = match point {
            Point::At { slot, .. } => {
                info!(rollback_point = %point, tip = ?tip, "Rolling back");
                self.store.delete_assets_after_slot(*slot).await?
            }
            Point::Origin => {
                info!(tip = ?tip, "Rolling back to genesis");
                self.store.delete_assets_after_slot(0).await?
            }
        };
        info!(deleted, "Deleted assets");
        Ok(deleted)
    }

    /// Record every asset this block mints for the first time and schedule its
    /// metadata fetch.
    pub async fn apply_block(&self, block: &Block) -> Result<RollForwardOutcome, FollowerError> {
        let mut outcome = RollForwardOutcome::default();
        let Some(minting) = block.minting() else {
            debug!(era = %block.era(), slot = block.slot(), "Skipping block without mint data");
            return Ok(outcome);
        };
        let slot = minting.header.slot;

        for tx in &minting.body {
            for key in tx.mint_keys() {
                let minted = match MintedAsset::parse(key) {
                    Ok(minted) => minted,
                    Err(e) => {
                        warn!(error = %e, slot, tx = %tx.id, "Skipping malformed mint key");
                        outcome.rejected.push(key.to_string());
                        continue;
                    }
                };
                let asset_id = minted.asset_id();

                if self.store.has_asset(&asset_id).await? {
                    outcome.skipped += 1;
                    continue;
                }

                let asset = Asset::first_seen(&minted, slot)?;
                self.store.insert_assets(std::slice::from_ref(&asset)).await?;
                self.queue
                    .publish_metadata_fetch(&MetadataFetchJob::new(&asset_id), self.job_options)
                    .await?;

                debug!(
                    asset_id = %asset_id,
                    fingerprint = %asset.fingerprint,
                    slot,
                    tx = %tx.id,
                    "New asset recorded"
                );
                outcome.inserted.push(asset_id);
            }
        }

        if !outcome.inserted.is_empty() {
            info!(slot, new_assets = outcome.inserted.len(), "Processed minting block");
        }
        Ok(outcome)
    }
}

#[async_trait]
impl ChainSyncHandler for EventProcessor {
    async fn roll_backward(
        &self,
        point: Point,
        tip: Option<Tip>,
        next: RequestNext,
    ) -> Result<(), FollowerError> {
        self.rollback(&point, tip.as_ref()).await?;
        next.request();
        Ok(())
    }

    async fn roll_forward(
        &self,
        block: Block,
        _tip: Option<Tip>,
        next: RequestNext,
    ) -> Result<(), FollowerError> {
        self.apply_block(&block).await?;
        next.request();
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
