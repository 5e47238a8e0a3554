//! Observer and engine service wired together in-process.
//!
//! Time runs on a paused tokio clock for the loops and a ManualClock for
//! the wall-clock deltas the engine credits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use mission_focus_core::accounting::{Category, TabId, TimerState};
use mission_focus_core::classifier::VideoMetadata;
use mission_focus_core::notify::{NotificationKind, RecordingNotifier};
use mission_focus_core::observer::{
    ContentObserver, MediaElementId, ObserverOptions, PageSource, PauseChoice, PausePrompt,
};
use mission_focus_core::storage::MemoryStore;
use mission_focus_core::{
    EngineHandle, EngineRequest, EngineService, Limits, ManualClock, ServiceOptions, TabProbe,
};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct Page {
    url: Mutex<String>,
    metadata: Mutex<Option<VideoMetadata>>,
}

impl Page {
    fn show(&self, url: &str, title: &str) {
        *self.url.lock().unwrap() = url.to_string();
        *self.metadata.lock().unwrap() = Some(VideoMetadata::new(title, ""));
    }
}

impl PageSource for Page {
    fn current_url(&self) -> String {
        self.url.lock().unwrap().clone()
    }
    fn is_visible(&self) -> bool {
        true
    }
    fn video_metadata(&self) -> Option<VideoMetadata> {
        self.metadata.lock().unwrap().clone()
    }
    fn media_element(&self) -> Option<MediaElementId> {
        Some(1)
    }
}

struct NoPrompt;

impl PausePrompt for NoPrompt {
    fn show(&self) {}
    fn dismiss(&self) {}
}

/// Routes the engine's checkVideo probe to the observer in the tab.
struct ObserverProbe(Arc<tokio::sync::Mutex<ContentObserver>>);

#[async_trait]
impl TabProbe for ObserverProbe {
    async fn check_video(&self, _tab: TabId) -> Option<Category> {
        self.0.lock().await.handle_check_video().category
    }
}

struct Rig {
    handle: EngineHandle,
    clock: ManualClock,
    page: Arc<Page>,
    observer: Arc<tokio::sync::Mutex<ContentObserver>>,
    notifier: RecordingNotifier,
    store: MemoryStore,
    cancel: CancellationToken,
}

fn rig(limits: Limits) -> Rig {
    let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 6, 3, 20, 0, 0).unwrap());
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::new();
    let options = ServiceOptions {
        limits,
        ..ServiceOptions::default()
    };
    let (service, handle) =
        EngineService::new(options, Box::new(store.clone()), Arc::new(clock.clone()));

    let page = Arc::new(Page::default());
    let observer = Arc::new(tokio::sync::Mutex::new(ContentObserver::new(
        page.clone(),
        Arc::new(handle.clone()),
        Arc::new(NoPrompt),
        ObserverOptions {
            focus_areas: vec!["chess".into()],
            ..ObserverOptions::default()
        },
    )));

    let service = service
        .with_notifier(Arc::new(notifier.clone()))
        .with_probe(Arc::new(ObserverProbe(observer.clone())));
    let cancel = CancellationToken::new();
    tokio::spawn(service.run(cancel.clone()));

    Rig {
        handle,
        clock,
        page,
        observer,
        notifier,
        store,
        cancel,
    }
}

impl Rig {
    /// Let `secs` of wall clock pass and give the loop a tick to flush.
    async fn elapse(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_watch_switch_and_leave_scenario() {
    let rig = rig(Limits::default());

    rig.page.show("https://www.youtube.com/watch?v=p", "Chess endgames");
    let category = rig.observer.lock().await.on_navigation().await;
    assert_eq!(category, Some(Category::Productive));
    rig.elapse(90).await;

    rig.page.show("https://www.youtube.com/watch?v=u", "Funny cats compilation");
    let category = rig.observer.lock().await.on_navigation().await;
    assert_eq!(category, Some(Category::Unproductive));
    rig.elapse(60).await;

    rig.handle
        .request(EngineRequest::TabUpdated {
            tab_id: 1,
            url: "https://example.com".into(),
        })
        .await
        .unwrap();
    rig.handle
        .request(EngineRequest::TabActivated {
            tab_id: 1,
            url: "https://example.com".into(),
        })
        .await
        .unwrap();

    let snapshot = rig.handle.snapshot().await.unwrap();
    assert!(approx(snapshot.productive_minutes, 1.5));
    assert!(approx(snapshot.unproductive_minutes, 1.0));
    assert_eq!(snapshot.timer, TimerState::Idle);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_pause_choice_controls_accrual() {
    let rig = rig(Limits::default());
    rig.page.show("https://www.youtube.com/watch?v=p", "Chess endgames");
    rig.observer.lock().await.on_navigation().await;
    rig.elapse(60).await;

    {
        let mut obs = rig.observer.lock().await;
        obs.on_media_pause(1).await;
        obs.on_prompt_choice(PauseChoice::PauseTimer).await;
    }
    rig.elapse(300).await;
    assert!(approx(rig.handle.snapshot().await.unwrap().productive_minutes, 1.0));

    rig.observer.lock().await.on_media_play(1).await;
    rig.elapse(30).await;
    {
        let mut obs = rig.observer.lock().await;
        obs.on_media_pause(1).await;
        obs.on_prompt_choice(PauseChoice::KeepTimer).await;
    }
    rig.elapse(30).await;

    let snapshot = rig.handle.snapshot().await.unwrap();
    assert!(approx(snapshot.productive_minutes, 2.0));
    assert_eq!(snapshot.timer, TimerState::Accruing(Category::Productive));
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_tab_activation_probes_observer() {
    let rig = rig(Limits::default());
    rig.page.show("https://www.youtube.com/shorts/abc", "Chess puzzle rush");

    rig.handle
        .request(EngineRequest::TabActivated {
            tab_id: 4,
            url: "https://www.youtube.com/shorts/abc".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        rig.handle.snapshot().await.unwrap().timer,
        TimerState::Accruing(Category::Productive)
    );
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_limit_alert_reaches_notifier_once() {
    let rig = rig(Limits::new(120.0, 1.0));
    rig.page.show("https://www.youtube.com/watch?v=u", "Funny cats compilation");
    rig.observer.lock().await.on_navigation().await;

    rig.elapse(36).await;
    assert!(rig.notifier.kinds().is_empty());
    rig.elapse(36).await;
    rig.elapse(36).await;
    assert_eq!(rig.notifier.kinds(), vec![NotificationKind::UnproductiveLimit]);

    rig.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let saved = rig.store.saved().unwrap();
    assert!(saved.alert_flags.unproductive_limit_hit);
    assert!(approx(saved.unproductive_minutes, 1.8));
}
