//! Deferred job queue contract and the metadata-fetch job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FollowerError;

/// Name of the job scheduled once per newly inserted asset.
pub const METADATA_FETCH_JOB: &str = "asset-metadata-fetch-initial";

/// Retry policy attached to a published job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Delay between attempts, in seconds.
    #[serde(rename = "retryDelay")]
    pub retry_delay_secs: u64,
    /// Maximum number of retries before the job is dropped.
    pub retry_limit: u32,
}

impl JobOptions {
    /// Six hours between attempts, 365 attempts: roughly three months.
    pub const METADATA_FETCH: JobOptions = JobOptions {
        retry_delay_secs: 21_600,
        retry_limit: 365,
    };

    /// Wall-clock span covered by all retries.
    pub fn retry_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.retry_delay_secs
                .saturating_mul(u64::from(self.retry_limit)),
        )
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::METADATA_FETCH
    }
}

/// Payload of [`METADATA_FETCH_JOB`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFetchJob {
    pub asset_id: String,
}

impl MetadataFetchJob {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

/// A durable job queue with per-job retry policy.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue one job.
    async fn publish(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<(), FollowerError>;

    /// Start accepting publishes and running workers.
    async fn start(&self) -> Result<(), FollowerError>;

    /// Stop the queue.
    async fn stop(&self) -> Result<(), FollowerError>;

    /// Enqueue a [`METADATA_FETCH_JOB`] for one asset.
    async fn publish_metadata_fetch(
        &self,
        job: &MetadataFetchJob,
        options: JobOptions,
    ) -> Result<(), FollowerError> {
        let payload = serde_json::to_value(job)?;
        self.publish(METADATA_FETCH_JOB, payload, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_fetch_policy() {
        let opts = JobOptions::default();
        assert_eq!(opts.retry_delay_secs, 21_600);
        assert_eq!(opts.retry_limit, 365);
        // ~91 days
        assert_eq!(opts.retry_window().as_secs() / 86_400, 91);
    }

    #[test]
    fn retry_window_saturates() {
        let opts = JobOptions { retry_delay_secs: u64::MAX, retry_limit: 2 };
        assert_eq!(opts.retry_window().as_secs(), u64::MAX);
    }

    #[test]
    fn payload_wire_shape() {
        let v = serde_json::to_value(MetadataFetchJob::new("aabb")).unwrap();
        assert_eq!(v, serde_json::json!({ "assetId": "aabb" }));

        let o = serde_json::to_value(JobOptions::METADATA_FETCH).unwrap();
        assert_eq!(o, serde_json::json!({ "retryDelay": 21600, "retryLimit": 365 }));
    }
}
