//! Content observer: the per-page half of the system.
//!
//! Watches the viewed page for video navigations, waits (within a
//! [`RetryBudget`]) for metadata to render, classifies it and reports the
//! category to the engine. It also relays media play/pause and drives the
//! pause prompt.
//!
//! ```text
//! Unobserved -> Detecting -> Classified
//!      ^            |            |
//!      +------------+------------+  (navigation away / budget spent)
//! ```

mod page;

pub use page::{
    EngineLink, MediaElementId, PageSource, PauseChoice, PausePrompt, RetryBudget,
};

use std::sync::Arc;
use std::time::Duration;

use crate::accounting::Category;
use crate::classifier::{keyword_category, VideoMetadata};
use crate::protocol::{is_video_url, EngineRequest, EngineResponse, FocusAreas, ObserverResponse};
use crate::storage::ObserverConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverState {
    Unobserved,
    Detecting { url: String },
    Classified { url: String, category: Category },
}

#[derive(Debug, Clone)]
pub struct ObserverOptions {
    pub budget: RetryBudget,
    pub focus_areas: Vec<String>,
    pub message_timeout: Duration,
    pub classify_timeout: Duration,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            budget: RetryBudget::default(),
            focus_areas: Vec::new(),
            message_timeout: Duration::from_millis(4000),
            classify_timeout: Duration::from_millis(7000),
        }
    }
}

impl ObserverOptions {
    pub fn from_config(config: &ObserverConfig, focus_areas: Vec<String>) -> Self {
        Self {
            budget: RetryBudget::new(
                config.retry_attempts,
                Duration::from_millis(config.retry_interval_ms),
            ),
            focus_areas,
            message_timeout: Duration::from_millis(config.message_timeout_ms),
            classify_timeout: Duration::from_millis(config.classify_timeout_ms),
        }
    }
}

pub struct ContentObserver {
    page: Arc<dyn PageSource>,
    engine: Arc<dyn EngineLink>,
    prompt: Arc<dyn PausePrompt>,
    options: ObserverOptions,
    state: ObserverState,
    media: Option<MediaElementId>,
    pause_prompted: bool,
}

impl ContentObserver {
    pub fn new(
        page: Arc<dyn PageSource>,
        engine: Arc<dyn EngineLink>,
        prompt: Arc<dyn PausePrompt>,
        options: ObserverOptions,
    ) -> Self {
        Self {
            page,
            engine,
            prompt,
            options,
            state: ObserverState::Unobserved,
            media: None,
            pause_prompted: false,
        }
    }

    // ── Queries ──

    pub fn state(&self) -> &ObserverState {
        &self.state
    }

    pub fn media_element(&self) -> Option<MediaElementId> {
        self.media
    }

    pub fn is_prompt_open(&self) -> bool {
        self.pause_prompted
    }

    // ── Commands ──

    /// React to the page's location changing (or to first load).
    ///
    /// Returns the category reported to the engine, if any.
    pub async fn on_navigation(&mut self) -> Option<Category> {
        let url = self.page.current_url();
        if !is_video_url(&url) {
            self.state = ObserverState::Unobserved;
            return None;
        }
        if let ObserverState::Classified { url: done, .. } = &self.state {
            if *done == url {
                return None;
            }
        }
        if !self.page.is_visible() {
            tracing::debug!(%url, "page hidden, detection skipped");
            return None;
        }

        self.pause_prompted = false;
        self.state = ObserverState::Detecting { url: url.clone() };
        let Some(metadata) = self.wait_for_metadata(&url).await else {
            tracing::debug!(%url, "no metadata within retry budget");
            self.state = ObserverState::Unobserved;
            return None;
        };

        self.refresh_media();
        let category = self.classify(&metadata).await;
        self.send(EngineRequest::Categorize { category }).await;
        self.state = ObserverState::Classified { url, category };
        Some(category)
    }

    /// Re-read the media element; a new element drops the old listeners.
    /// Returns whether listeners were (re-)attached.
    pub fn refresh_media(&mut self) -> bool {
        let current = self.page.media_element();
        if current == self.media {
            return false;
        }
        self.media = current;
        self.pause_prompted = false;
        current.is_some()
    }

    pub async fn on_media_pause(&mut self, element: MediaElementId) {
        if self.media != Some(element) || self.pause_prompted {
            return;
        }
        self.pause_prompted = true;
        self.send(EngineRequest::MediaPaused).await;
        self.prompt.show();
    }

    pub async fn on_media_play(&mut self, element: MediaElementId) {
        if self.media != Some(element) {
            return;
        }
        self.pause_prompted = false;
        self.prompt.dismiss();
        self.send(EngineRequest::MediaResumed).await;
    }

    /// The user answered the pause prompt. The prompt closes, but stays
    /// "shown" for this pause until the video plays again.
    pub async fn on_prompt_choice(&mut self, choice: PauseChoice) {
        let request = match choice {
            PauseChoice::PauseTimer => EngineRequest::PauseTimer,
            PauseChoice::KeepTimer => EngineRequest::KeepTimer,
        };
        self.send(request).await;
        self.prompt.dismiss();
    }

    /// Answer the engine's quick `checkVideo` probe with the keyword tier.
    pub fn handle_check_video(&self) -> ObserverResponse {
        let category = self
            .page
            .video_metadata()
            .filter(|m| !m.is_empty())
            .map(|m| {
                keyword_category(&m, &self.options.focus_areas).unwrap_or(Category::Unproductive)
            });
        ObserverResponse { category }
    }

    // ── Internal ──

    async fn wait_for_metadata(&self, url: &str) -> Option<VideoMetadata> {
        let budget = self.options.budget;
        for attempt in 0..budget.attempts {
            if attempt > 0 {
                tokio::time::sleep(budget.interval).await;
            }
            if self.page.current_url() != url {
                // Superseded by a newer navigation.
                return None;
            }
            if let Some(metadata) = self.page.video_metadata().filter(|m| !m.is_empty()) {
                return Some(metadata);
            }
        }
        None
    }

    async fn classify(&self, metadata: &VideoMetadata) -> Category {
        if let Some(category) = keyword_category(metadata, &self.options.focus_areas) {
            return category;
        }
        let request = EngineRequest::Classify {
            metadata: metadata.clone(),
            focus_areas: Some(FocusAreas::List(self.options.focus_areas.clone())),
        };
        match self
            .engine
            .send(request, self.options.classify_timeout)
            .await
        {
            Ok(EngineResponse::Classified {
                category: Some(category),
            }) => category,
            Ok(_) => Category::Unproductive,
            Err(e) => {
                tracing::debug!("remote classification unavailable: {e}");
                Category::Unproductive
            }
        }
    }

    async fn send(&self, request: EngineRequest) {
        let action = request.name();
        if let Err(e) = self.engine.send(request, self.options.message_timeout).await {
            tracing::warn!(action, "engine message failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const WATCH: &str = "https://www.youtube.com/watch?v=abc";

    #[derive(Default)]
    struct FakePage {
        url: Mutex<String>,
        hidden: Mutex<bool>,
        metadata: Mutex<Option<VideoMetadata>>,
        media: Mutex<Option<MediaElementId>>,
        reads: Mutex<u32>,
        /// Metadata appears after this many reads.
        ready_after: Mutex<u32>,
    }

    impl FakePage {
        fn at(url: &str, metadata: Option<VideoMetadata>) -> Arc<Self> {
            let page = Self::default();
            *page.url.lock().unwrap() = url.to_string();
            *page.metadata.lock().unwrap() = metadata;
            *page.media.lock().unwrap() = Some(1);
            Arc::new(page)
        }
    }

    impl PageSource for FakePage {
        fn current_url(&self) -> String {
            self.url.lock().unwrap().clone()
        }
        fn is_visible(&self) -> bool {
            !*self.hidden.lock().unwrap()
        }
        fn video_metadata(&self) -> Option<VideoMetadata> {
            let mut reads = self.reads.lock().unwrap();
            *reads += 1;
            if *reads <= *self.ready_after.lock().unwrap() {
                return None;
            }
            self.metadata.lock().unwrap().clone()
        }
        fn media_element(&self) -> Option<MediaElementId> {
            *self.media.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct FakeEngine {
        sent: Mutex<Vec<EngineRequest>>,
        remote_answer: Option<Category>,
        unreachable: bool,
    }

    impl FakeEngine {
        fn sent(&self) -> Vec<EngineRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EngineLink for FakeEngine {
        async fn send(
            &self,
            request: EngineRequest,
            timeout: Duration,
        ) -> Result<EngineResponse, EngineError> {
            self.sent.lock().unwrap().push(request.clone());
            if self.unreachable {
                tokio::time::sleep(timeout).await;
                return Err(EngineError::Timeout(timeout));
            }
            Ok(match request {
                EngineRequest::Classify { .. } => EngineResponse::Classified {
                    category: self.remote_answer,
                },
                _ => EngineResponse::ok(),
            })
        }
    }

    #[derive(Default)]
    struct FakePrompt {
        shown: Mutex<u32>,
        dismissed: Mutex<u32>,
    }

    impl PausePrompt for FakePrompt {
        fn show(&self) {
            *self.shown.lock().unwrap() += 1;
        }
        fn dismiss(&self) {
            *self.dismissed.lock().unwrap() += 1;
        }
    }

    fn observer(
        page: Arc<FakePage>,
        engine: Arc<FakeEngine>,
        focus: &[&str],
    ) -> (ContentObserver, Arc<FakePrompt>) {
        let prompt = Arc::new(FakePrompt::default());
        let options = ObserverOptions {
            focus_areas: focus.iter().map(|s| s.to_string()).collect(),
            ..ObserverOptions::default()
        };
        (
            ContentObserver::new(page, engine, prompt.clone(), options),
            prompt,
        )
    }

    fn categorized(engine: &FakeEngine) -> Vec<Category> {
        engine
            .sent()
            .into_iter()
            .filter_map(|r| match r {
                EngineRequest::Categorize { category } => Some(category),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn keyword_hit_categorizes_without_remote() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Chess openings", "")));
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, _) = observer(page, engine.clone(), &["chess"]);

        assert_eq!(obs.on_navigation().await, Some(Category::Productive));
        assert_eq!(
            engine.sent(),
            vec![EngineRequest::Categorize { category: Category::Productive }]
        );
        assert!(matches!(obs.state(), ObserverState::Classified { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn keyword_miss_uses_remote_answer() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Funny cats", "")));
        let engine = Arc::new(FakeEngine {
            remote_answer: Some(Category::Productive),
            ..FakeEngine::default()
        });
        let (mut obs, _) = observer(page, engine.clone(), &[]);

        assert_eq!(obs.on_navigation().await, Some(Category::Productive));
        assert!(matches!(engine.sent()[0], EngineRequest::Classify { .. }));
        assert_eq!(categorized(&engine), vec![Category::Productive]);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_engine_falls_back_to_unproductive() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Funny cats", "")));
        let engine = Arc::new(FakeEngine {
            unreachable: true,
            ..FakeEngine::default()
        });
        let (mut obs, _) = observer(page, engine.clone(), &[]);

        let started = tokio::time::Instant::now();
        assert_eq!(obs.on_navigation().await, Some(Category::Unproductive));
        // 7 s classify bound, then the 4 s bound on the categorize message.
        assert_eq!(started.elapsed(), Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_cutoff_emits_nothing() {
        let page = FakePage::at(WATCH, None);
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, _) = observer(page.clone(), engine.clone(), &[]);

        let started = tokio::time::Instant::now();
        assert_eq!(obs.on_navigation().await, None);
        assert_eq!(started.elapsed(), RetryBudget::default().max_wait());
        assert_eq!(*page.reads.lock().unwrap(), 20);
        assert!(engine.sent().is_empty());
        assert_eq!(obs.state(), &ObserverState::Unobserved);
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_arriving_late_is_picked_up() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Rust tutorial", "")));
        *page.ready_after.lock().unwrap() = 5;
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, _) = observer(page.clone(), engine.clone(), &[]);

        assert_eq!(obs.on_navigation().await, Some(Category::Productive));
        assert_eq!(*page.reads.lock().unwrap(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn same_url_hidden_page_and_non_video_are_skipped() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Rust tutorial", "")));
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, _) = observer(page.clone(), engine.clone(), &[]);

        obs.on_navigation().await;
        assert_eq!(obs.on_navigation().await, None);
        assert_eq!(engine.sent().len(), 1);

        *page.url.lock().unwrap() = "https://www.youtube.com/shorts/xyz".into();
        *page.hidden.lock().unwrap() = true;
        assert_eq!(obs.on_navigation().await, None);

        *page.url.lock().unwrap() = "https://www.youtube.com/feed".into();
        assert_eq!(obs.on_navigation().await, None);
        assert_eq!(obs.state(), &ObserverState::Unobserved);
        assert_eq!(engine.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_prompt_shown_once_until_play() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Rust tutorial", "")));
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, prompt) = observer(page, engine.clone(), &[]);
        obs.on_navigation().await;

        obs.on_media_pause(1).await;
        obs.on_media_pause(1).await;
        assert_eq!(*prompt.shown.lock().unwrap(), 1);
        assert!(obs.is_prompt_open());

        obs.on_prompt_choice(PauseChoice::KeepTimer).await;
        obs.on_media_pause(1).await;
        assert_eq!(*prompt.shown.lock().unwrap(), 1);

        obs.on_media_play(1).await;
        assert!(!obs.is_prompt_open());
        obs.on_media_pause(1).await;
        assert_eq!(*prompt.shown.lock().unwrap(), 2);

        let tail: Vec<_> = engine.sent().into_iter().skip(1).collect();
        assert_eq!(
            tail,
            vec![
                EngineRequest::MediaPaused,
                EngineRequest::KeepTimer,
                EngineRequest::MediaResumed,
                EngineRequest::MediaPaused,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn swapped_media_element_is_reattached() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Rust tutorial", "")));
        let engine = Arc::new(FakeEngine::default());
        let (mut obs, prompt) = observer(page.clone(), engine.clone(), &[]);
        obs.on_navigation().await;
        assert_eq!(obs.media_element(), Some(1));

        *page.media.lock().unwrap() = Some(2);
        assert!(obs.refresh_media());
        assert!(!obs.refresh_media());

        obs.on_media_pause(1).await;
        assert_eq!(*prompt.shown.lock().unwrap(), 0);
        obs.on_media_pause(2).await;
        assert_eq!(*prompt.shown.lock().unwrap(), 1);
    }

    #[test]
    fn check_video_reports_keyword_tier() {
        let page = FakePage::at(WATCH, Some(VideoMetadata::new("Funny cats", "")));
        let (obs, _) = observer(page.clone(), Arc::new(FakeEngine::default()), &["cats"]);
        assert_eq!(obs.handle_check_video().category, Some(Category::Productive));

        let (obs, _) = observer(page.clone(), Arc::new(FakeEngine::default()), &[]);
        assert_eq!(obs.handle_check_video().category, Some(Category::Unproductive));

        *page.metadata.lock().unwrap() = None;
        assert_eq!(obs.handle_check_video().category, None);
    }
}
