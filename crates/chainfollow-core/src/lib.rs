//! chainfollow-core: rollback-safe chain follower for the minted-asset projection.
//!
//! # Architecture
//!
//! ```text
//! ChainFollower (lifecycle: initialize → start → shutdown)
//!     ├── ChainSyncConnector / ChainSyncClient  (transport, e.g. ChannelConnector)
//!     │        │ rollBackward / rollForward + RequestNext
//!     │        ▼
//!     ├── EventProcessor
//!     │        ├── ProjectionStore  (has / insert / delete-after-slot)
//!     │        └── JobQueue         (asset-metadata-fetch-initial)
//!     └── JobQueue lifecycle (start before sync, stop after sync)
//! ```

pub mod asset;
pub mod channel;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod follower;
pub mod processor;
pub mod queue;
pub mod store;
pub mod transport;
pub mod types;

pub use asset::{Asset, MintedAsset};
pub use channel::{ChannelConnector, ChannelSyncClient, SyncFinished};
pub use config::{ConnectionConfig, DatabaseConfig, FollowerConfig, FollowerConfigBuilder, LogConfig};
pub use error::FollowerError;
pub use fingerprint::{fingerprint, AssetFingerprint};
pub use follower::{ChainFollower, FollowerState};
pub use processor::{EventProcessor, RollForwardOutcome};
pub use queue::{JobOptions, JobQueue, MetadataFetchJob, METADATA_FETCH_JOB};
pub use store::ProjectionStore;
pub use transport::{ChainSyncClient, ChainSyncConnector, ChainSyncEvent, ChainSyncHandler, RequestNext};
pub use types::{Block, BlockHeader, Era, MintingBlock, Point, Tip, Transaction};
