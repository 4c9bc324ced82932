//! Projection store contract.

use async_trait::async_trait;

use crate::asset::Asset;
use crate::error::FollowerError;

/// Storage for the minted-asset projection.
///
/// Implementations include `InMemoryAssetStore` and `PostgresAssetStore`
/// in `chainfollow-storage`.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Returns `true` if a row with this asset id exists.
    async fn has_asset(&self, asset_id: &str) -> Result<bool, FollowerError>;

    /// Insert rows. Existing rows must not be modified.
    async fn insert_assets(&self, assets: &[Asset]) -> Result<(), FollowerError>;

    /// Delete every row with `first_appeared_in_slot > slot` and return how many were removed.
    async fn delete_assets_after_slot(&self, slot: u64) -> Result<u64, FollowerError>;
}
