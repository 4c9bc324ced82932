//! Follower lifecycle: owns the chain-sync client and the job queue and
//! sequences their startup and shutdown.
//!
//! ```text
//! Created ──initialize──▶ Initialized ──start──▶ Started ──shutdown──▶ ShuttingDown ──▶ Stopped
//! ```
//!
//! `start` brings the queue up before the subscription; `shutdown` tears the
//! subscription down before the queue. A publish therefore never targets a
//! stopped queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::FollowerError;
use crate::processor::EventProcessor;
use crate::queue::{JobOptions, JobQueue};
use crate::store::ProjectionStore;
use crate::transport::{ChainSyncClient, ChainSyncConnector};
use crate::types::Point;

/// Lifecycle state of a [`ChainFollower`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowerState {
    /// Constructed, no transport yet.
    Created,
    /// Transport connected and bound to the event processor.
    Initialized,
    /// Queue running and chain sync active.
    Started,
    /// Tearing down the subscription and the queue.
    ShuttingDown,
    /// Terminated.
    Stopped,
}

impl std::fmt::Display for FollowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Initialized => write!(f, "initialized"),
            Self::Started => write!(f, "started"),
            Self::ShuttingDown => write!(f, "shutting-down"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Follows the chain and maintains the minted-asset projection.
pub struct ChainFollower {
    store: Arc<dyn ProjectionStore>,
    processor: Arc<EventProcessor>,
    queue: Arc<dyn JobQueue>,
    connector: Box<dyn ChainSyncConnector>,
    client: Option<Box<dyn ChainSyncClient>>,
    state: FollowerState,
}

impl ChainFollower {
    pub fn new(
        store: Arc<dyn ProjectionStore>,
        queue: Arc<dyn JobQueue>,
        connector: Box<dyn ChainSyncConnector>,
    ) -> Self {
        let processor = Arc::new(EventProcessor::new(Arc::clone(&store), Arc::clone(&queue)));
        Self {
            store,
            processor,
            queue,
            connector,
            client: None,
            state: FollowerState::Created,
        }
    }

    /// Override the retry policy of published metadata-fetch jobs.
    ///
    /// Only allowed before [`ChainFollower::initialize`] binds the processor
    /// to the transport.
    pub fn set_job_options(&mut self, options: JobOptions) -> Result<(), FollowerError> {
        self.expect_state("set job options", FollowerState::Created)?;
        self.processor = Arc::new(
            EventProcessor::new(Arc::clone(&self.store), Arc::clone(&self.queue))
                .with_job_options(options),
        );
        Ok(())
    }

    pub fn state(&self) -> FollowerState {
        self.state
    }

    /// The event processor bound to the transport.
    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    /// Connect the chain-sync transport and bind it to the event processor.
    pub async fn initialize(&mut self, connection: &ConnectionConfig) -> Result<(), FollowerError> {
        self.expect_state("initialize", FollowerState::Created)?;
        info!(url = %connection.url(), "Initializing");

        let client = self
            .connector
            .connect(connection, self.processor.clone())
            .await?;
        self.client = Some(client);
        self.state = FollowerState::Initialized;

        info!("Initialized");
        Ok(())
    }

    /// Start the job queue, then sync from the best of `points`.
    ///
    /// Returns the intersection the transport selected.
    pub async fn start(&mut self, points: Vec<Point>) -> Result<Point, FollowerError> {
        self.expect_state("start", FollowerState::Initialized)?;
        let client = self.client.as_ref().ok_or_else(|| FollowerError::InvalidState {
            operation: "start",
            state: self.state,
        })?;
        info!(candidates = points.len(), "Starting");

        self.queue.start().await?;

        let intersection = match client.start_sync(points).await {
            Ok(point) => point,
            Err(e) => {
                error!(error = %e, "Chain sync failed to start, stopping job queue");
                if let Err(stop_err) = self.queue.stop().await {
                    warn!(error = %stop_err, "Job queue did not stop cleanly");
                }
                return Err(e);
            }
        };

        self.state = FollowerState::Started;
        info!(intersection = %intersection, "Started");
        Ok(intersection)
    }

    /// Stop the subscription, then the job queue.
    ///
    /// The queue is stopped even if the subscription reports an error; the
    /// first error is returned.
    pub async fn shutdown(&mut self) -> Result<(), FollowerError> {
        match self.state {
            FollowerState::Stopped => return Ok(()),
            FollowerState::Created | FollowerState::Initialized => {
                info!(state = %self.state, "Shutting down before start");
                self.client = None;
                self.state = FollowerState::Stopped;
                return Ok(());
            }
            FollowerState::ShuttingDown => {
                return Err(FollowerError::InvalidState {
                    operation: "shutdown",
                    state: self.state,
                })
            }
            FollowerState::Started => {}
        }

        info!("Shutting down");
        self.state = FollowerState::ShuttingDown;

        let sync_result = match self.client.take() {
            Some(client) => client.shutdown().await,
            None => Ok(()),
        };
        if let Err(e) = &sync_result {
            error!(error = %e, "Chain sync ended with an error");
        }

        let queue_result = self.queue.stop().await;
        if let Err(e) = &queue_result {
            error!(error = %e, "Job queue failed to stop");
        }

        self.state = FollowerState::Stopped;
        info!("Shutdown complete");
        sync_result.and(queue_result)
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: FollowerState,
    ) -> Result<(), FollowerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(FollowerError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use crate::transport::ChainSyncHandler;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct NullStore;

    #[async_trait]
    impl ProjectionStore for NullStore {
        async fn has_asset(&self, _asset_id: &str) -> Result<bool, FollowerError> {
            Ok(false)
        }
        async fn insert_assets(&self, _assets: &[Asset]) -> Result<(), FollowerError> {
            Ok(())
        }
        async fn delete_assets_after_slot(&self, _slot: u64) -> Result<u64, FollowerError> {
            Ok(0)
        }
    }

    struct LoggingQueue {
        log: CallLog,
        fail_stop: bool,
    }

    #[async_trait]
    impl JobQueue for LoggingQueue {
        async fn publish(
            &self,
            _name: &str,
            _payload: serde_json::Value,
            _options: JobOptions,
        ) -> Result<(), FollowerError> {
            self.log.lock().unwrap().push("queue.publish");
            Ok(())
        }
        async fn start(&self) -> Result<(), FollowerError> {
            self.log.lock().unwrap().push("queue.start");
            Ok(())
        }
        async fn stop(&self) -> Result<(), FollowerError> {
            self.log.lock().unwrap().push("queue.stop");
            if self.fail_stop {
                return Err(FollowerError::Queue("stop failed".into()));
            }
            Ok(())
        }
    }

    struct LoggingClient {
        log: CallLog,
        fail_start: bool,
        fail_shutdown: bool,
    }

    #[async_trait]
    impl ChainSyncClient for LoggingClient {
        async fn start_sync(&self, points: Vec<Point>) -> Result<Point, FollowerError> {
            self.log.lock().unwrap().push("sync.start");
            if self.fail_start {
                return Err(FollowerError::Transport("no intersection".into()));
            }
            Ok(points.into_iter().next().unwrap_or(Point::Origin))
        }
        async fn shutdown(&self) -> Result<(), FollowerError> {
            self.log.lock().unwrap().push("sync.shutdown");
            if self.fail_shutdown {
                return Err(FollowerError::Store("last event failed".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Faults {
        connect: bool,
        start_sync: bool,
        sync_shutdown: bool,
        queue_stop: bool,
    }

    struct LoggingConnector {
        log: CallLog,
        faults: Faults,
    }

    #[async_trait]
    impl ChainSyncConnector for LoggingConnector {
        async fn connect(
            &self,
            _config: &ConnectionConfig,
            _handler: Arc<dyn ChainSyncHandler>,
        ) -> Result<Box<dyn ChainSyncClient>, FollowerError> {
            self.log.lock().unwrap().push("connect");
            if self.faults.connect {
                return Err(FollowerError::Transport("connection refused".into()));
            }
            Ok(Box::new(LoggingClient {
                log: self.log.clone(),
                fail_start: self.faults.start_sync,
                fail_shutdown: self.faults.sync_shutdown,
            }))
        }
    }

    fn follower(faults: Faults) -> (ChainFollower, CallLog) {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(LoggingQueue {
            log: log.clone(),
            fail_stop: faults.queue_stop,
        });
        let connector = Box::new(LoggingConnector {
            log: log.clone(),
            faults,
        });
        (ChainFollower::new(Arc::new(NullStore), queue, connector), log)
    }

    fn calls(log: &CallLog) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn full_lifecycle_ordering() {
        let (mut f, log) = follower(Faults::default());
        assert_eq!(f.state(), FollowerState::Created);

        f.initialize(&ConnectionConfig::default()).await.unwrap();
        assert_eq!(f.state(), FollowerState::Initialized);

        let at = f.start(vec![Point::at(5, "h")]).await.unwrap();
        assert_eq!(at, Point::at(5, "h"));
        assert_eq!(f.state(), FollowerState::Started);

        f.shutdown().await.unwrap();
        assert_eq!(f.state(), FollowerState::Stopped);

        assert_eq!(
            calls(&log),
            vec!["connect", "queue.start", "sync.start", "sync.shutdown", "queue.stop"]
        );
    }

    #[tokio::test]
    async fn start_requires_initialize() {
        let (mut f, log) = follower(Faults::default());
        let err = f.start(vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            FollowerError::InvalidState { state: FollowerState::Created, .. }
        ));
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn initialize_twice_rejected() {
        let (mut f, _log) = follower(Faults::default());
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        assert!(f.initialize(&ConnectionConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn connect_failure_surfaces() {
        let (mut f, _log) = follower(Faults { connect: true, ..Default::default() });
        let err = f.initialize(&ConnectionConfig::default()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(f.state(), FollowerState::Created);
    }

    #[tokio::test]
    async fn failed_sync_start_stops_queue() {
        let (mut f, log) = follower(Faults { start_sync: true, ..Default::default() });
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        let err = f.start(vec![]).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(f.state(), FollowerState::Initialized);
        assert_eq!(calls(&log), vec!["connect", "queue.start", "sync.start", "queue.stop"]);
    }

    #[tokio::test]
    async fn queue_stopped_even_if_sync_shutdown_fails() {
        let (mut f, log) = follower(Faults { sync_shutdown: true, ..Default::default() });
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        f.start(vec![]).await.unwrap();
        let err = f.shutdown().await.unwrap_err();
        assert!(err.is_store());
        assert_eq!(f.state(), FollowerState::Stopped);
        assert_eq!(calls(&log).last(), Some(&"queue.stop"));
    }

    #[tokio::test]
    async fn queue_stop_error_reported() {
        let (mut f, _log) = follower(Faults { queue_stop: true, ..Default::default() });
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        f.start(vec![]).await.unwrap();
        assert!(f.shutdown().await.unwrap_err().is_queue());
    }

    #[tokio::test]
    async fn shutdown_before_start_touches_nothing() {
        let (mut f, log) = follower(Faults::default());
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        f.shutdown().await.unwrap();
        assert_eq!(f.state(), FollowerState::Stopped);
        assert_eq!(calls(&log), vec!["connect"]);

        // idempotent once stopped
        f.shutdown().await.unwrap();
        assert!(f.start(vec![]).await.is_err());
    }

    #[tokio::test]
    async fn job_options_reach_processor() {
        let (mut f, _log) = follower(Faults::default());
        let opts = JobOptions { retry_delay_secs: 1, retry_limit: 1 };
        f.set_job_options(opts).unwrap();
        assert_eq!(f.processor().job_options(), opts);
    }

    #[tokio::test]
    async fn job_options_locked_after_initialize() {
        let (mut f, _log) = follower(Faults::default());
        f.initialize(&ConnectionConfig::default()).await.unwrap();
        let err = f
            .set_job_options(JobOptions { retry_delay_secs: 1, retry_limit: 1 })
            .unwrap_err();
        assert!(matches!(
            err,
            FollowerError::InvalidState { state: FollowerState::Initialized, .. }
        ));
        assert_eq!(f.processor().job_options(), JobOptions::METADATA_FETCH);
    }
}
