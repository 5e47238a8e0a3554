//! What the observer needs from its surroundings.

use std::time::Duration;

use async_trait::async_trait;

use crate::classifier::VideoMetadata;
use crate::error::EngineError;
use crate::protocol::{EngineRequest, EngineResponse};
use crate::service::EngineHandle;

/// Opaque identity of a media element. A new value means the page swapped
/// the element and listeners must be re-attached.
pub type MediaElementId = u64;

/// Read access to the viewed page. Selector logic lives behind this.
pub trait PageSource: Send + Sync {
    fn current_url(&self) -> String;
    fn is_visible(&self) -> bool;
    /// `None` until the page has rendered a title.
    fn video_metadata(&self) -> Option<VideoMetadata>;
    fn media_element(&self) -> Option<MediaElementId>;
}

/// Message channel to the accounting engine.
#[async_trait]
pub trait EngineLink: Send + Sync {
    async fn send(
        &self,
        request: EngineRequest,
        timeout: Duration,
    ) -> Result<EngineResponse, EngineError>;
}

#[async_trait]
impl EngineLink for EngineHandle {
    async fn send(
        &self,
        request: EngineRequest,
        timeout: Duration,
    ) -> Result<EngineResponse, EngineError> {
        self.request_with_timeout(request, timeout).await
    }
}

/// The two-button prompt shown when the video pauses.
pub trait PausePrompt: Send + Sync {
    fn show(&self);
    fn dismiss(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChoice {
    PauseTimer,
    KeepTimer,
}

/// Bounded polling for page metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(500),
        }
    }
}

impl RetryBudget {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Upper bound on how long detection can take.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}
