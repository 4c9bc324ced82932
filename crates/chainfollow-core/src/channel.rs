//! In-process chain-sync transport fed by a Tokio channel.
//!
//! Hosts that bridge an external chain-sync client (or replay a recorded
//! stream) push [`ChainSyncEvent`]s into the sender; a single background task
//! delivers them to the handler one at a time, waiting on each event's
//! [`RequestNext`] before reading the next one.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::FollowerError;
use crate::transport::{
    ChainSyncClient, ChainSyncConnector, ChainSyncEvent, ChainSyncHandler, RequestNext,
};
use crate::types::Point;

/// Connector whose events come from an in-process channel.
///
/// Only one client can be connected per connector.
pub struct ChannelConnector {
    events: Mutex<Option<(mpsc::Receiver<ChainSyncEvent>, watch::Sender<bool>)>>,
    finished: watch::Receiver<bool>,
}

impl ChannelConnector {
    /// Create a connector and the sender that feeds it.
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<ChainSyncEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (done_tx, done_rx) = watch::channel(false);
        let connector = Self {
            events: Mutex::new(Some((rx, done_tx))),
            finished: done_rx,
        };
        (connector, tx)
    }

    /// Handle that resolves once the connected client's delivery task ends.
    pub fn finished(&self) -> SyncFinished {
        SyncFinished(self.finished.clone())
    }
}

/// Completion signal of a channel subscription.
///
/// Also resolves if the client is dropped without ever starting.
#[derive(Clone)]
pub struct SyncFinished(watch::Receiver<bool>);

impl SyncFinished {
    pub async fn wait(mut self) {
        loop {
            let done = *self.0.borrow_and_update();
            if done || self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl ChainSyncConnector for ChannelConnector {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        handler: Arc<dyn ChainSyncHandler>,
    ) -> Result<Box<dyn ChainSyncClient>, FollowerError> {
        let (events, done) = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| FollowerError::Transport("channel connector already used".into()))?;
        debug!(url = %config.url(), "channel transport connected");
        Ok(Box::new(ChannelSyncClient::with_done(handler, events, done)))
    }
}

struct RunningSync {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), FollowerError>>,
}

/// Client half of the channel transport.
pub struct ChannelSyncClient {
    handler: Arc<dyn ChainSyncHandler>,
    events: Mutex<Option<(mpsc::Receiver<ChainSyncEvent>, watch::Sender<bool>)>>,
    running: Mutex<Option<RunningSync>>,
}

impl ChannelSyncClient {
    pub fn new(handler: Arc<dyn ChainSyncHandler>, events: mpsc::Receiver<ChainSyncEvent>) -> Self {
        Self::with_done(handler, events, watch::channel(false).0)
    }

    fn with_done(
        handler: Arc<dyn ChainSyncHandler>,
        events: mpsc::Receiver<ChainSyncEvent>,
        done: watch::Sender<bool>,
    ) -> Self {
        Self {
            handler,
            events: Mutex::new(Some((events, done))),
            running: Mutex::new(None),
        }
    }

    /// Returns `true` once the delivery task has ended (or was never started).
    pub fn is_finished(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .map_or(true, |r| r.task.is_finished())
    }
}

/// Pick the candidate with the highest slot; genesis if none.
pub fn select_intersection(points: &[Point]) -> Point {
    points
        .iter()
        .max_by_key(|p| p.slot())
        .cloned()
        .unwrap_or(Point::Origin)
}

#[async_trait]
impl ChainSyncClient for ChannelSyncClient {
    async fn start_sync(&self, points: Vec<Point>) -> Result<Point, FollowerError> {
        let (events, done) = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| FollowerError::Transport("sync already started".into()))?;

        let intersection = select_intersection(&points);
        info!(intersection = %intersection, candidates = points.len(), "Starting chain sync");

        let (stop_tx, stop_rx) = oneshot::channel();
        let handler = Arc::clone(&self.handler);
        let task = tokio::spawn(async move {
            let result = run_sync(handler, events, stop_rx).await;
            let _ = done.send(true);
            result
        });
        *self.running.lock().unwrap() = Some(RunningSync { stop_tx, task });
        Ok(intersection)
    }

    async fn shutdown(&self) -> Result<(), FollowerError> {
        let running = self.running.lock().unwrap().take();
        let Some(RunningSync { stop_tx, task }) = running else {
            return Ok(());
        };
        // The task may have ended on its own already.
        let _ = stop_tx.send(());
        match task.await {
            Ok(result) => result,
            Err(e) => Err(FollowerError::Transport(format!("sync task failed: {e}"))),
        }
    }
}

/// Deliver events until the channel closes, shutdown is signalled, or an
/// event fails.
async fn run_sync(
    handler: Arc<dyn ChainSyncHandler>,
    mut events: mpsc::Receiver<ChainSyncEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<(), FollowerError> {
    let mut delivered = 0u64;
    loop {
        // Shutdown is only observed between events.
        let event = tokio::select! {
            biased;
            _ = &mut stop_rx => {
                debug!(delivered, "chain sync stopped");
                return Ok(());
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    info!(delivered, "chain sync source closed");
                    return Ok(());
                }
            },
        };

        let (next, requested) = RequestNext::channel();
        if let Err(e) = handler.dispatch(event, next).await {
            error!(error = %e, delivered, "event processing failed, halting chain sync");
            return Err(e);
        }
        if !requested.wait().await {
            warn!(delivered, "handler did not request the next event, halting chain sync");
            return Err(FollowerError::Transport(
                "handler dropped the continuation".into(),
            ));
        }
        delivered += 1;
    }
}
