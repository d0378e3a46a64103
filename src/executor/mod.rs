//! # Executor Link
//!
//! Push notifications toward the external executor.
//!
//! The polling surface (`pending_steps`) is always authoritative. A link only
//! tells a connected executor that a step just became pending, so a socket
//! bridge can forward it without waiting for the next poll. Missed or lagged
//! notifications are recovered by polling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::models::{HttpMethod, Platform, PublicationStep};

/// What an executor needs to perform one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAnnouncement {
    pub step_id: Uuid,
    pub run_id: Uuid,
    pub platform: Platform,
    pub label: String,
    pub method: HttpMethod,
    pub path: String,
    pub payload: Value,
    pub retry_count: i32,
}

impl From<&PublicationStep> for StepAnnouncement {
    fn from(step: &PublicationStep) -> Self {
        Self {
            step_id: step.id,
            run_id: step.run_id,
            platform: step.platform,
            label: step.label.clone(),
            method: step.method,
            path: step.path.clone(),
            payload: step.payload.clone(),
            retry_count: step.retry_count,
        }
    }
}

#[async_trait]
pub trait ExecutorLink: Send + Sync + Debug {
    /// Called after a step is committed as pending (new or requeued)
    async fn announce(&self, announcement: StepAnnouncement);
}

/// Polling-only deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutorLink;

#[async_trait]
impl ExecutorLink for NoopExecutorLink {
    async fn announce(&self, _announcement: StepAnnouncement) {}
}

/// In-process fan-out; a WebSocket bridge subscribes per platform
#[derive(Debug, Clone)]
pub struct BroadcastExecutorLink {
    sender: broadcast::Sender<StepAnnouncement>,
}

impl BroadcastExecutorLink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self, platform: Platform) -> PlatformSubscription {
        PlatformSubscription {
            platform,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for BroadcastExecutorLink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ExecutorLink for BroadcastExecutorLink {
    async fn announce(&self, announcement: StepAnnouncement) {
        if self.sender.send(announcement).is_err() {
            trace!("No executor subscribed, step stays available to polling");
        }
    }
}

/// Announcements for a single platform
#[derive(Debug)]
pub struct PlatformSubscription {
    platform: Platform,
    receiver: broadcast::Receiver<StepAnnouncement>,
}

impl PlatformSubscription {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Next announcement for this platform, `None` once the link is dropped
    pub async fn next(&mut self) -> Option<StepAnnouncement> {
        loop {
            match self.receiver.recv().await {
                Ok(announcement) if announcement.platform == self.platform => {
                    return Some(announcement)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        platform = %self.platform,
                        skipped = skipped,
                        "Executor subscription lagged, poll to catch up"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
