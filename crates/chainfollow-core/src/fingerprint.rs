//! CIP-14 asset fingerprints.
//!
//! `fingerprint = bech32("asset", blake2b-160(policy_id || asset_name))`

use std::fmt;

use bech32::{ToBase32, Variant};
use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};

use crate::error::FollowerError;

/// Human-readable part of every asset fingerprint.
pub const FINGERPRINT_HRP: &str = "asset";

type Blake2b160 = Blake2b<U20>;

/// A derived asset fingerprint. `Display` yields the bech32 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetFingerprint {
    hash: [u8; 20],
}

impl AssetFingerprint {
    /// Derive from raw policy id and asset name bytes. The name may be empty.
    pub fn new(policy_id: &[u8], asset_name: &[u8]) -> Self {
        let mut hasher = Blake2b160::new();
        hasher.update(policy_id);
        hasher.update(asset_name);
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&hasher.finalize());
        Self { hash }
    }

    /// Derive from hex-encoded policy id and asset name.
    pub fn from_hex(policy_id: &str, asset_name: &str) -> Result<Self, FollowerError> {
        let policy = decode_hex(policy_id)?;
        let name = decode_hex(asset_name)?;
        Ok(Self::new(&policy, &name))
    }

    /// The 20-byte digest behind the fingerprint.
    pub fn digest(&self) -> &[u8; 20] {
        &self.hash
    }
}

impl fmt::Display for AssetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode(FINGERPRINT_HRP, self.hash.to_base32(), Variant::Bech32)
            .map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// Fingerprint string for a hex policy id and hex asset name.
pub fn fingerprint(policy_id: &str, asset_name: &str) -> Result<String, FollowerError> {
    Ok(AssetFingerprint::from_hex(policy_id, asset_name)?.to_string())
}

fn decode_hex(s: &str) -> Result<Vec<u8>, FollowerError> {
    hex::decode(s).map_err(|e| FollowerError::InvalidMintKey {
        key: s.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "7eae28af2208be856f7a119668ae52a49b73725e326dc16579dcc373";

    #[test]
    fn cip14_empty_asset_name() {
        assert_eq!(
            fingerprint(POLICY, "").unwrap(),
            "asset1rjklcrnsdzqp65wjgrg55sy9723kw09mlgvlc3"
        );
    }

    #[test]
    fn cip14_named_asset() {
        // "PATATE"
        assert_eq!(
            fingerprint(POLICY, "504154415445").unwrap(),
            "asset13n25uv0yaf5kus35fm2k86cqy60z58d9xmde92"
        );
    }

    #[test]
    fn deterministic_and_name_sensitive() {
        let a = fingerprint("aa", "bb").unwrap();
        let b = fingerprint("aa", "bb").unwrap();
        let c = fingerprint("aa", "bc").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("asset1"));
    }

    #[test]
    fn bytes_and_hex_agree() {
        let from_hex = AssetFingerprint::from_hex("aabb", "01").unwrap();
        let from_bytes = AssetFingerprint::new(&[0xaa, 0xbb], &[0x01]);
        assert_eq!(from_hex, from_bytes);
    }

    #[test]
    fn invalid_hex_rejected() {
        let err = fingerprint("zz", "").unwrap_err();
        assert!(matches!(err, FollowerError::InvalidMintKey { .. }));
    }
}
