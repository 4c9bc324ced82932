//! Chain data model shared by the transport, processor and stores.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ─── Point ────────────────────────────────────────────────────────────────────

/// A position on the chain: genesis, or a concrete `(slot, hash)` pair.
///
/// Serialised as the string `"origin"` or as `{ "slot": .., "hash": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PointRepr", into = "PointRepr")]
pub enum Point {
    Origin,
    At { slot: u64, hash: String },
}

impl Point {
    /// Create a concrete point.
    pub fn at(slot: u64, hash: impl Into<String>) -> Self {
        Self::At {
            slot,
            hash: hash.into(),
        }
    }

    /// Slot of this point; genesis is slot `0`.
    pub fn slot(&self) -> u64 {
        match self {
            Self::Origin => 0,
            Self::At { slot, .. } => *slot,
        }
    }

    /// Header hash of this point, `None` for genesis.
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Origin => None,
            Self::At { hash, .. } => Some(hash),
        }
    }

    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Origin => write!(f, "origin"),
            Self::At { slot, hash } => write!(f, "{slot}.{hash}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Origin(OriginTag),
    At { slot: u64, hash: String },
}

#[derive(Serialize, Deserialize)]
enum OriginTag {
    #[serde(rename = "origin")]
    Origin,
}

impl From<PointRepr> for Point {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Origin(OriginTag::Origin) => Point::Origin,
            PointRepr::At { slot, hash } => Point::At { slot, hash },
        }
    }
}

impl From<Point> for PointRepr {
    fn from(point: Point) -> Self {
        match point {
            Point::Origin => PointRepr::Origin(OriginTag::Origin),
            Point::At { slot, hash } => PointRepr::At { slot, hash },
        }
    }
}

// ─── Tip ──────────────────────────────────────────────────────────────────────

/// The node's current tip as reported alongside each event. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub slot: u64,
    pub hash: String,
    pub block_no: u64,
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

/// Ledger era a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Byron,
    Shelley,
    Allegra,
    Mary,
    Alonzo,
    Babbage,
    Conway,
}

impl Era {
    /// Returns `true` for eras whose transactions carry a mint field.
    pub fn supports_minting(&self) -> bool {
        *self >= Era::Mary
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Byron => "byron",
            Self::Shelley => "shelley",
            Self::Allegra => "allegra",
            Self::Mary => "mary",
            Self::Alonzo => "alonzo",
            Self::Babbage => "babbage",
            Self::Conway => "conway",
        };
        f.write_str(name)
    }
}

/// Header fields the follower relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub slot: u64,
    #[serde(default)]
    pub hash: String,
}

/// A block from an era without native assets. Only the header is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBlock {
    pub header: BlockHeader,
}

/// A block from an era whose transactions may mint native assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintingBlock {
    pub header: BlockHeader,
    /// Transactions in block order.
    #[serde(default)]
    pub body: Vec<Transaction>,
}

/// A transaction, reduced to the fields this follower reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,
    /// Asset key (`policyId.assetName`, hex) → signed quantity, in encoding order.
    #[serde(default)]
    pub mint: IndexMap<String, i64>,
}

impl Transaction {
    /// Asset keys minted or burned by this transaction, in encoding order.
    pub fn mint_keys(&self) -> impl Iterator<Item = &str> {
        self.mint.keys().map(String::as_str)
    }
}

/// A block delivered by the chain-sync transport, tagged by era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Byron(LegacyBlock),
    Shelley(LegacyBlock),
    Allegra(LegacyBlock),
    Mary(MintingBlock),
    Alonzo(MintingBlock),
    Babbage(MintingBlock),
    Conway(MintingBlock),
}

impl Block {
    pub fn era(&self) -> Era {
        match self {
            Self::Byron(_) => Era::Byron,
            Self::Shelley(_) => Era::Shelley,
            Self::Allegra(_) => Era::Allegra,
            Self::Mary(_) => Era::Mary,
            Self::Alonzo(_) => Era::Alonzo,
            Self::Babbage(_) => Era::Babbage,
            Self::Conway(_) => Era::Conway,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        match self {
            Self::Byron(b) | Self::Shelley(b) | Self::Allegra(b) => &b.header,
            Self::Mary(b) | Self::Alonzo(b) | Self::Babbage(b) | Self::Conway(b) => &b.header,
        }
    }

    /// The minting view of this block, or `None` for pre-Mary eras.
    pub fn minting(&self) -> Option<&MintingBlock> {
        match self {
            Self::Mary(b) | Self::Alonzo(b) | Self::Babbage(b) | Self::Conway(b) => Some(b),
            Self::Byron(_) | Self::Shelley(_) | Self::Allegra(_) => None,
        }
    }

    pub fn slot(&self) -> u64 {
        self.header().slot
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_point_wire_form() {
        let json = serde_json::to_string(&Point::Origin).unwrap();
        assert_eq!(json, "\"origin\"");
        let back: Point = serde_json::from_str("\"origin\"").unwrap();
        assert!(back.is_origin());
        assert_eq!(back.slot(), 0);
    }

    #[test]
    fn concrete_point_wire_form() {
        let p: Point = serde_json::from_str(r#"{"slot": 42, "hash": "abcd"}"#).unwrap();
        assert_eq!(p, Point::at(42, "abcd"));
        assert_eq!(p.hash(), Some("abcd"));
        assert_eq!(p.to_string(), "42.abcd");
    }

    #[test]
    fn only_mary_and_later_mint() {
        assert!(!Era::Byron.supports_minting());
        assert!(!Era::Allegra.supports_minting());
        assert!(Era::Mary.supports_minting());
        assert!(Era::Conway.supports_minting());
    }

    #[test]
    fn block_decodes_with_ordered_mint_map() {
        let json = r#"{
            "mary": {
                "header": { "slot": 100, "hash": "h100" },
                "body": [
                    { "id": "tx1", "mint": { "ff.01": 1, "aa.bb": 5, "cc": -2 } },
                    { "id": "tx2" }
                ]
            }
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.era(), Era::Mary);
        assert_eq!(block.slot(), 100);

        let minting = block.minting().unwrap();
        let keys: Vec<_> = minting.body[0].mint_keys().collect();
        assert_eq!(keys, vec!["ff.01", "aa.bb", "cc"]);
        assert!(minting.body[1].mint.is_empty());
    }

    #[test]
    fn legacy_block_has_no_minting_view() {
        let block: Block =
            serde_json::from_str(r#"{"shelley": {"header": {"slot": 7}}}"#).unwrap();
        assert_eq!(block.era(), Era::Shelley);
        assert!(block.minting().is_none());
        assert_eq!(block.header().hash, "");
    }
}
