//! Minted asset keys and the projection row derived from them.

use serde::{Deserialize, Serialize};

use crate::error::FollowerError;
use crate::fingerprint::fingerprint;

/// Prefix the projection store expects on hex-encoded byte-string columns.
pub const BYTEA_HEX_PREFIX: &str = "\\x";

/// A mint-map key split into its policy id and asset name (both hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintedAsset {
    pub policy_id: String,
    pub asset_name: String,
}

impl MintedAsset {
    /// Parse a `policyId.assetName` key.
    ///
    /// Splits on the first `.`. A key with no dot names the policy's
    /// empty-named asset.
    pub fn parse(key: &str) -> Result<Self, FollowerError> {
        let (policy_id, asset_name) = key.split_once('.').unwrap_or((key, ""));
        if policy_id.is_empty() {
            return Err(FollowerError::InvalidMintKey {
                key: key.to_string(),
                reason: "empty policy id".into(),
            });
        }
        for part in [policy_id, asset_name] {
            if let Err(e) = hex::decode(part) {
                return Err(FollowerError::InvalidMintKey {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(Self {
            policy_id: policy_id.to_string(),
            asset_name: asset_name.to_string(),
        })
    }

    /// Canonical identity: policy id and asset name concatenated.
    pub fn asset_id(&self) -> String {
        format!("{}{}", self.policy_id, self.asset_name)
    }
}

/// A row of the minted-asset projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub asset_id: String,
    pub asset_name: String,
    pub first_appeared_in_slot: u64,
    pub fingerprint: String,
    /// Policy id with [`BYTEA_HEX_PREFIX`].
    pub policy_id: String,
}

impl Asset {
    /// Build the row for an asset first seen in the block at `slot`.
    pub fn first_seen(minted: &MintedAsset, slot: u64) -> Result<Self, FollowerError> {
        Ok(Self {
            asset_id: minted.asset_id(),
            asset_name: minted.asset_name.clone(),
            first_appeared_in_slot: slot,
            fingerprint: fingerprint(&minted.policy_id, &minted.asset_name)?,
            policy_id: format!("{BYTEA_HEX_PREFIX}{}", minted.policy_id),
        })
    }

    /// Policy id without the byte-string prefix.
    pub fn policy_id_hex(&self) -> &str {
        self.policy_id
            .strip_prefix(BYTEA_HEX_PREFIX)
            .unwrap_or(&self.policy_id)
    }
}
