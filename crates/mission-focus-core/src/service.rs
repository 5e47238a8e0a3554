//! The engine service: one tokio task that owns the [`AccountingEngine`].
//!
//! Every mutation reaches the engine as a message on an mpsc channel, and
//! the per-second tick, the hourly day check and inbound messages are
//! multiplexed with `tokio::select!`. No two operations ever interleave.
//! Remote classification is spawned so it never holds up ticks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::accounting::{day_key, AccountingEngine, Category, Limits, Snapshot, TabId};
use crate::classifier::{Classifier, DEFAULT_REMOTE_TIMEOUT};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::events::Event;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::protocol::{is_video_url, EngineRequest, EngineResponse};
use crate::storage::{Config, StateStore};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DAY_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Slack added on top of the classifier's remote timeout for `classify`.
pub const CLASSIFY_REPLY_MARGIN: Duration = Duration::from_secs(2);

const CHANNEL_CAPACITY: usize = 64;

/// Asks the observer in a tab for a quick keyword read of its video.
#[async_trait]
pub trait TabProbe: Send + Sync {
    async fn check_video(&self, tab: TabId) -> Option<Category>;
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub limits: Limits,
    pub focus_areas: Vec<String>,
    pub user_identity: Option<String>,
    pub probe_timeout: Duration,
    pub tick_interval: Duration,
    pub day_check_interval: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            focus_areas: Vec::new(),
            user_identity: None,
            probe_timeout: DEFAULT_REQUEST_TIMEOUT,
            tick_interval: TICK_INTERVAL,
            day_check_interval: DAY_CHECK_INTERVAL,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: config.limits(),
            focus_areas: config.focus_areas.clone(),
            user_identity: config.user_identity.clone(),
            probe_timeout: Duration::from_millis(config.observer.message_timeout_ms),
            ..Self::default()
        }
    }
}

enum Wake {
    Tick,
    DayCheck,
    Command(Command),
}

enum Command {
    Request {
        request: EngineRequest,
        reply: oneshot::Sender<EngineResponse>,
    },
    RecordSync(DateTime<Utc>),
}

/// Cloneable sender side of the engine service.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    timeout: Duration,
    classify_timeout: Duration,
}

/// A request already queued on the engine, waiting for its reply.
#[must_use]
pub struct PendingReply {
    rx: oneshot::Receiver<EngineResponse>,
}

impl PendingReply {
    pub async fn wait(self, timeout: Duration) -> Result<EngineResponse, EngineError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(reply) => reply.map_err(|_| EngineError::Closed),
            Err(_) => Err(EngineError::Timeout(timeout)),
        }
    }
}

impl EngineHandle {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound for `classify` replies. Must outlast the classifier's own
    /// remote timeout or slow remote answers are lost.
    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    /// How long a caller should wait for the reply to `request`.
    pub fn timeout_for(&self, request: &EngineRequest) -> Duration {
        match request {
            EngineRequest::Classify { .. } => self.classify_timeout,
            // The engine waits on the tab's observer before answering.
            EngineRequest::TabActivated { .. } | EngineRequest::TabUpdated { .. } => {
                self.timeout + DEFAULT_REQUEST_TIMEOUT
            }
            _ => self.timeout,
        }
    }

    pub async fn request(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        let timeout = self.timeout_for(&request);
        self.request_with_timeout(request, timeout).await
    }

    /// Queue `request` behind everything sent before it. Requests are
    /// applied in the order their `enqueue` calls complete.
    pub async fn enqueue(&self, request: EngineRequest) -> Result<PendingReply, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Request { request, reply })
            .await
            .map_err(|_| EngineError::Closed)?;
        Ok(PendingReply { rx })
    }

    /// Send one request and wait for its reply, giving up after `timeout`.
    pub async fn request_with_timeout(
        &self,
        request: EngineRequest,
        timeout: Duration,
    ) -> Result<EngineResponse, EngineError> {
        let exchange = async {
            let pending = self.enqueue(request).await?;
            pending.rx.await.map_err(|_| EngineError::Closed)
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| EngineError::Timeout(timeout))?
    }

    pub async fn snapshot(&self) -> Result<Snapshot, EngineError> {
        match self.request(EngineRequest::GetTime).await? {
            EngineResponse::Time(snapshot) => Ok(snapshot),
            // The loop always answers getTime with a snapshot.
            _ => Err(EngineError::Closed),
        }
    }

    pub async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), EngineError> {
        self.tx
            .send(Command::RecordSync(at))
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct EngineService {
    engine: AccountingEngine,
    store: Box<dyn StateStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    classifier: Classifier,
    probe: Option<Arc<dyn TabProbe>>,
    options: ServiceOptions,
    rx: mpsc::Receiver<Command>,
}

impl EngineService {
    /// Restore the persisted record (or start fresh) and build the service
    /// with its handle. A failed load is logged and treated as no record.
    pub fn new(
        options: ServiceOptions,
        store: Box<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, EngineHandle) {
        let now = clock.now();
        let today = day_key(&now);
        let mut engine = match store.load() {
            Ok(Some(state)) => {
                tracing::info!(day = %state.day, today = %today, "restored accounting state");
                AccountingEngine::restore(state, options.limits, now)
            }
            Ok(None) => AccountingEngine::new(options.limits, now),
            Err(e) => {
                tracing::warn!("failed to load accounting state, starting fresh: {e}");
                AccountingEngine::new(options.limits, now)
            }
        };
        if options.user_identity.is_some() {
            engine.set_identity(options.user_identity.clone());
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let service = Self {
            engine,
            store,
            clock,
            notifier: Arc::new(TracingNotifier),
            classifier: Classifier::local_only(),
            probe: None,
            options,
            rx,
        };
        let handle = EngineHandle {
            tx,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            classify_timeout: DEFAULT_REMOTE_TIMEOUT + CLASSIFY_REPLY_MARGIN,
        };
        (service, handle)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn TabProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Drive the engine until `cancel` fires or every handle is dropped.
    /// The open interval is stopped and persisted on the way out.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.options.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut day_check = tokio::time::interval(self.options.day_check_interval);
        day_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.persist();
        tracing::info!(day = %self.engine.state().day, "engine service started");

        loop {
            let wake = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tick.tick() => Wake::Tick,
                _ = day_check.tick() => Wake::DayCheck,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => break,
                },
            };
            match wake {
                Wake::Tick => {
                    let events = self.engine.tick(self.clock.now());
                    self.dispatch(events);
                }
                Wake::DayCheck => {
                    let events = self.engine.check_day(self.clock.now());
                    self.dispatch(events);
                }
                Wake::Command(cmd) => self.handle(cmd, &cancel).await,
            }
            self.persist();
        }

        let events = self.engine.stop(self.clock.now());
        self.dispatch(events);
        self.persist();
        tracing::info!("engine service stopped");
    }

    // ── Commands ──

    async fn handle(&mut self, cmd: Command, cancel: &CancellationToken) {
        match cmd {
            Command::RecordSync(at) => self.engine.record_sync(at),
            Command::Request { request, reply } => {
                tracing::debug!(action = request.name(), "engine request");
                self.apply(request, reply, cancel).await;
            }
        }
    }

    /// Apply one request and answer it. The requester may have given up
    /// already; a dropped reply is not an error.
    async fn apply(
        &mut self,
        request: EngineRequest,
        reply: oneshot::Sender<EngineResponse>,
        cancel: &CancellationToken,
    ) {
        let now = self.clock.now();
        let events = match request {
            EngineRequest::Categorize { category } => self.engine.categorize(category, now),
            EngineRequest::PauseTimer => self.engine.pause_timer(now),
            EngineRequest::KeepTimer => self.engine.keep_timer(now),
            EngineRequest::MediaPaused => self.engine.media_paused(now),
            EngineRequest::MediaResumed => self.engine.media_resumed(now),
            EngineRequest::ResetTime => self.engine.reset_day(now),
            EngineRequest::GetTime => {
                let events = self.engine.check_day(now);
                self.dispatch(events);
                let _ = reply.send(EngineResponse::Time(self.engine.snapshot()));
                return;
            }
            EngineRequest::Classify {
                metadata,
                focus_areas,
            } => {
                let focus_areas = focus_areas
                    .map(|f| f.into_terms())
                    .unwrap_or_else(|| self.options.focus_areas.clone());
                let classifier = self.classifier.clone();
                let cancel = cancel.child_token();
                tokio::spawn(async move {
                    let category = tokio::select! {
                        _ = cancel.cancelled() => None,
                        c = classifier.classify(&metadata, &focus_areas, &cancel) => Some(c),
                    };
                    let _ = reply.send(EngineResponse::Classified { category });
                });
                return;
            }
            EngineRequest::TabActivated { tab_id, url } => {
                self.engine.set_active_tab(Some(tab_id));
                self.follow_tab(tab_id, &url).await
            }
            EngineRequest::TabUpdated { tab_id, url } => {
                if self.engine.active_tab() == Some(tab_id) {
                    self.follow_tab(tab_id, &url).await
                } else {
                    Vec::new()
                }
            }
            EngineRequest::TabClosed { tab_id } => {
                if self.engine.active_tab() == Some(tab_id) {
                    self.engine.set_active_tab(None);
                    self.engine.stop(now)
                } else {
                    Vec::new()
                }
            }
        };
        self.dispatch(events);
        let _ = reply.send(EngineResponse::ok());
    }

    /// The focused tab shows `url`: re-read its category or stop.
    async fn follow_tab(&mut self, tab: TabId, url: &str) -> Vec<Event> {
        let category = if is_video_url(url) {
            probe_tab(self.probe.clone(), self.options.probe_timeout, tab).await
        } else {
            None
        };

        let now = self.clock.now();
        let mut events = self.engine.stop(now);
        if let Some(category) = category {
            events.extend(self.engine.categorize(category, now));
        }
        events
    }

    // ── Internal ──

    fn dispatch(&self, events: Vec<Event>) {
        for event in events {
            match &event {
                Event::AlertRaised { alert, .. } => {
                    tracing::info!(?alert, "alert raised");
                    self.notifier.notify(&Notification::from_alert(alert));
                }
                Event::DayRolledOver {
                    previous_day,
                    day,
                    productive_minutes,
                    unproductive_minutes,
                    ..
                } => {
                    tracing::info!(
                        %previous_day,
                        %day,
                        productive_minutes,
                        unproductive_minutes,
                        "day rolled over"
                    );
                }
                Event::Flushed { .. } => tracing::trace!(?event, "engine event"),
                _ => tracing::debug!(?event, "engine event"),
            }
        }
    }

    /// Save when dirty. A failed save re-arms the dirty flag so the next
    /// iteration retries; in-memory state is never rolled back.
    fn persist(&mut self) {
        if !self.engine.take_dirty() {
            return;
        }
        if let Err(e) = self.store.save(self.engine.state()) {
            tracing::warn!("failed to persist accounting state: {e}");
            self.engine.mark_dirty();
        }
    }
}

/// Ask the tab's observer for a quick read, bounded by `timeout`.
/// Free function: the service is not `Sync`, so no `&self` may live
/// across this await.
async fn probe_tab(
    probe: Option<Arc<dyn TabProbe>>,
    timeout: Duration,
    tab: TabId,
) -> Option<Category> {
    let probe = probe?;
    match tokio::time::timeout(timeout, probe.check_video(tab)).await {
        Ok(category) => category,
        Err(_) => {
            tracing::debug!(tab, "checkVideo timed out");
            None
        }
    }
}
