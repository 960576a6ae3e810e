//! Outbound message delivery seam.
//!
//! The chat surface itself lives outside this crate; implementors post and
//! edit messages and report whether the workspace token is still usable.

use crate::render::RenderView;
use crate::types::{ChannelId, MessageHandle};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Workspace token is missing or invalid")]
    InvalidToken,

    #[error("Delivery failed: {0}")]
    Api(String),
}

#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Post a new message; returns the handle used for later edits
    async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
        view: &RenderView,
    ) -> DeliveryResult<MessageHandle>;

    /// Replace the content of a previously posted message
    async fn update_message(
        &self,
        handle: &MessageHandle,
        channel: &ChannelId,
        text: &str,
        view: &RenderView,
    ) -> DeliveryResult<()>;

    /// Whether the workspace token can be used right now
    async fn has_valid_token(&self) -> bool {
        true
    }

    /// Name of this delivery backend
    fn name(&self) -> &str;
}

/// Delivery that only writes views to the log. Used when no chat backend is wired up.
#[derive(Debug, Default)]
pub struct LogDelivery {
    next_handle: AtomicU64,
}

impl LogDelivery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageDelivery for LogDelivery {
    async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
        view: &RenderView,
    ) -> DeliveryResult<MessageHandle> {
        let handle = format!("log-{}", self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let json = serde_json::to_string(view).map_err(|e| DeliveryError::Api(e.to_string()))?;
        tracing::info!(channel = %channel, handle = %handle, view = %json, "{}", text);
        Ok(handle)
    }

    async fn update_message(
        &self,
        handle: &MessageHandle,
        channel: &ChannelId,
        text: &str,
        view: &RenderView,
    ) -> DeliveryResult<()> {
        let json = serde_json::to_string(view).map_err(|e| DeliveryError::Api(e.to_string()))?;
        tracing::info!(channel = %channel, handle = %handle, view = %json, "{}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
