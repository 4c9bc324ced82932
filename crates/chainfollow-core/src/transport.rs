//! Chain-sync transport contract.
//!
//! The transport is a cooperative producer: it hands each event to a
//! [`ChainSyncHandler`] together with a [`RequestNext`] continuation and does
//! not deliver the next event until that continuation fires.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::ConnectionConfig;
use crate::error::FollowerError;
use crate::types::{Block, Point, Tip};

// ─── RequestNext ──────────────────────────────────────────────────────────────

/// Continuation passed with every event.
///
/// Call [`RequestNext::request`] once the event's side effects are durable.
/// Dropping it instead tells the transport the event was not processed.
#[derive(Debug)]
pub struct RequestNext {
    tx: oneshot::Sender<()>,
}

/// Transport side of a [`RequestNext`].
#[derive(Debug)]
pub struct NextRequested {
    rx: oneshot::Receiver<()>,
}

impl RequestNext {
    /// Create a continuation and the receiver the transport waits on.
    pub fn channel() -> (Self, NextRequested) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, NextRequested { rx })
    }

    /// Signal the transport to deliver the next event.
    pub fn request(self) {
        // The transport may already be gone during shutdown.
        let _ = self.tx.send(());
    }
}

impl NextRequested {
    /// Resolves to `true` if the handler requested the next event, `false` if
    /// the continuation was dropped.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}

// ─── Events ───────────────────────────────────────────────────────────────────

/// A single chain-sync event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChainSyncEvent {
    RollBackward {
        point: Point,
        #[serde(default)]
        tip: Option<Tip>,
    },
    RollForward {
        block: Block,
        #[serde(default)]
        tip: Option<Tip>,
    },
}

// ─── Traits ───────────────────────────────────────────────────────────────────

/// Receives chain-sync events.
#[async_trait]
pub trait ChainSyncHandler: Send + Sync {
    /// The chain was rolled back to `point`.
    async fn roll_backward(
        &self,
        point: Point,
        tip: Option<Tip>,
        next: RequestNext,
    ) -> Result<(), FollowerError>;

    /// A new block was applied on top of the chain.
    async fn roll_forward(
        &self,
        block: Block,
        tip: Option<Tip>,
        next: RequestNext,
    ) -> Result<(), FollowerError>;

    /// Dispatch an event to the matching callback.
    async fn dispatch(&self, event: ChainSyncEvent, next: RequestNext) -> Result<(), FollowerError> {
        match event {
            ChainSyncEvent::RollBackward { point, tip } => self.roll_backward(point, tip, next).await,
            ChainSyncEvent::RollForward { block, tip } => self.roll_forward(block, tip, next).await,
        }
    }
}

/// A connected chain-sync client.
#[async_trait]
pub trait ChainSyncClient: Send + Sync {
    /// Begin syncing from the best of `points` and return the selected intersection.
    async fn start_sync(&self, points: Vec<Point>) -> Result<Point, FollowerError>;

    /// Stop delivering events. An in-flight handler is allowed to finish.
    async fn shutdown(&self) -> Result<(), FollowerError>;
}

/// Builds a [`ChainSyncClient`] bound to a handler.
#[async_trait]
pub trait ChainSyncConnector: Send + Sync {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        handler: Arc<dyn ChainSyncHandler>,
    ) -> Result<Box<dyn ChainSyncClient>, FollowerError>;
}
