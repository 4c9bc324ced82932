//! `chainfollow replay`: run a recorded chain-sync stream through the follower.
//!
//! The event file is either a JSON array of events or one event per line.
//! Every event is fed through the channel transport into the configured
//! backends: in-memory by default, Postgres when `database.url` is set (needs
//! the `postgres` feature). The in-memory projection and published jobs are
//! reported as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use chainfollow_core::{
    Asset, ChainFollower, ChainSyncEvent, ChannelConnector, FollowerConfig, JobQueue, Point,
    ProjectionStore,
};
use chainfollow_storage::{InMemoryAssetStore, MemoryJobQueue, QueuedJob};

const CHANNEL_CAPACITY: usize = 64;

/// Parsed arguments of `replay`.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplayArgs {
    pub events: PathBuf,
    pub config: Option<PathBuf>,
}

impl ReplayArgs {
    /// Parse the arguments following the `replay` command word.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut events = None;
        let mut config = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = iter.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                    config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with('-') => bail!("unknown option: {flag}"),
                path if events.is_none() => events = Some(PathBuf::from(path)),
                extra => bail!("unexpected argument: {extra}"),
            }
        }
        Ok(Self {
            events: events.ok_or_else(|| anyhow!("missing <events.json>"))?,
            config,
        })
    }
}

/// Load the config file, or defaults when none was given.
pub fn load_config(path: Option<&Path>) -> Result<FollowerConfig> {
    let Some(path) = path else {
        return Ok(FollowerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    FollowerConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Parse a JSON array of events, or newline-delimited events.
pub fn parse_events(text: &str) -> Result<Vec<ChainSyncEvent>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("parsing event array");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("parsing event on line {}", i + 1))
        })
        .collect()
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    /// `"memory"` or `"postgres"`.
    pub backend: &'static str,
    pub intersection: Point,
    /// Events handed to the transport.
    pub events_fed: usize,
    pub events_total: usize,
    /// Projection after the replay; in-memory backend only.
    pub assets: Vec<Asset>,
    /// Published jobs; in-memory backend only.
    pub jobs: Vec<QueuedJob>,
    /// Why the stream halted, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Feed `events` through a follower backed by the configured stores.
pub async fn replay(config: &FollowerConfig, events: Vec<ChainSyncEvent>) -> Result<ReplaySummary> {
    match config.database.url {
        None => replay_in_memory(config, events).await,
        #[cfg(feature = "postgres")]
        Some(_) => replay_postgres(config, events).await,
        #[cfg(not(feature = "postgres"))]
        Some(_) => bail!("database.url is set but chainfollow was built without the `postgres` feature"),
    }
}

async fn replay_in_memory(
    config: &FollowerConfig,
    events: Vec<ChainSyncEvent>,
) -> Result<ReplaySummary> {
    let store = Arc::new(InMemoryAssetStore::new());
    let queue = Arc::new(MemoryJobQueue::new());
    let mut summary = run(config, store.clone(), queue.clone(), events).await?;
    summary.assets = store.assets();
    summary.jobs = queue.jobs();
    info!(assets = summary.assets.len(), jobs = summary.jobs.len(), "Replay complete");
    Ok(summary)
}

#[cfg(feature = "postgres")]
async fn replay_postgres(
    config: &FollowerConfig,
    events: Vec<ChainSyncEvent>,
) -> Result<ReplaySummary> {
    use chainfollow_storage::postgres::{connect_pool, PostgresAssetStore, PostgresJobQueue};

    let pool = connect_pool(&config.database).await?;
    let store = Arc::new(PostgresAssetStore::new(pool.clone()).await?);
    let queue = Arc::new(PostgresJobQueue::new(pool));
    let mut summary = run(config, store, queue, events).await?;
    summary.backend = "postgres";
    info!(events_fed = summary.events_fed, "Replay complete");
    Ok(summary)
}

async fn run(
    config: &FollowerConfig,
    store: Arc<dyn ProjectionStore>,
    queue: Arc<dyn JobQueue>,
    events: Vec<ChainSyncEvent>,
) -> Result<ReplaySummary> {
    let (connector, tx) = ChannelConnector::new(CHANNEL_CAPACITY);
    let finished = connector.finished();

    let mut follower = ChainFollower::new(store, queue, Box::new(connector));
    follower.initialize(&config.connection).await?;
    let intersection = follower.start(Vec::new()).await?;

    let events_total = events.len();
    let mut events_fed = 0;
    for event in events {
        if tx.send(event).await.is_err() {
            warn!(events_fed, events_total, "chain sync halted, dropping remaining events");
            break;
        }
        events_fed += 1;
    }
    drop(tx);
    finished.wait().await;

    let error = follower.shutdown().await.err().map(|e| e.to_string());
    Ok(ReplaySummary {
        backend: "memory",
        intersection,
        events_fed,
        events_total,
        assets: Vec::new(),
        jobs: Vec::new(),
        error,
    })
}
