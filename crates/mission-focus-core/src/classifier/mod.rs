//! Two-tier video classifier.
//!
//! The keyword tier runs locally and synchronously. On a miss the remote
//! tier asks a language model, bounded by a timeout and a cancellation
//! token. Any failure along the way lands on `unproductive`.

mod keywords;
mod remote;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::accounting::Category;
use crate::error::ClassifierError;

pub use keywords::{
    keyword_category, keyword_verdict, normalize_focus_areas, parse_focus_areas, KEYWORD_BUCKETS,
};
pub use remote::{
    build_prompt, parse_verdict, GeminiClassifier, RemoteClassifier, DEFAULT_GEMINI_ENDPOINT,
    DEFAULT_GEMINI_MODEL,
};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(8);

/// Title and description scraped from a watch page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }

    /// Lowercased `title description` blob used for matching.
    pub fn normalized_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

#[derive(Clone)]
pub struct Classifier {
    remote: Option<Arc<dyn RemoteClassifier>>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(remote: Arc<dyn RemoteClassifier>) -> Self {
        Self {
            remote: Some(remote),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Keyword tier only; every miss is unproductive.
    pub fn local_only() -> Self {
        Self {
            remote: None,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Full two-tier decision. Never fails.
    pub async fn classify(
        &self,
        metadata: &VideoMetadata,
        focus_areas: &[String],
        cancel: &CancellationToken,
    ) -> Category {
        if let Some(category) = keyword_category(metadata, focus_areas) {
            tracing::debug!(title = %metadata.title, "keyword match");
            return category;
        }
        match self.classify_remote(metadata, focus_areas, cancel).await {
            Ok(category) => category,
            Err(e) => {
                tracing::warn!(title = %metadata.title, "remote classification failed: {e}");
                Category::Unproductive
            }
        }
    }

    /// Remote tier alone, with its failure reason.
    pub async fn classify_remote(
        &self,
        metadata: &VideoMetadata,
        focus_areas: &[String],
        cancel: &CancellationToken,
    ) -> Result<Category, ClassifierError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(ClassifierError::MissingCredential)?;
        let prompt = build_prompt(metadata, focus_areas);

        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(ClassifierError::Cancelled),
            res = tokio::time::timeout(self.timeout, remote.complete(&prompt)) => {
                res.map_err(|_| ClassifierError::Timeout(self.timeout))??
            }
        };

        parse_verdict(&text).ok_or(ClassifierError::Unparseable(text))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::local_only()
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("remote", &self.remote.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
