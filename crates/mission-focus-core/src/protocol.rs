//! Messages exchanged between the page observer, the browser host and the
//! accounting engine.
//!
//! Requests are tagged by `action` with camelCase fields, matching what
//! the extension sends.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::accounting::{Category, Snapshot, TabId};
use crate::classifier::{normalize_focus_areas, parse_focus_areas, VideoMetadata};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineRequest {
    Categorize {
        category: Category,
    },
    /// Run the full classifier. Missing focus areas fall back to the
    /// configured ones.
    Classify {
        metadata: VideoMetadata,
        #[serde(default)]
        focus_areas: Option<FocusAreas>,
    },
    GetTime,
    ResetTime,
    MediaPaused,
    MediaResumed,
    PauseTimer,
    KeepTimer,
    TabActivated {
        tab_id: TabId,
        url: String,
    },
    TabUpdated {
        tab_id: TabId,
        url: String,
    },
    TabClosed {
        tab_id: TabId,
    },
}

impl EngineRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EngineRequest::Categorize { .. } => "categorize",
            EngineRequest::Classify { .. } => "classify",
            EngineRequest::GetTime => "getTime",
            EngineRequest::ResetTime => "resetTime",
            EngineRequest::MediaPaused => "mediaPaused",
            EngineRequest::MediaResumed => "mediaResumed",
            EngineRequest::PauseTimer => "pauseTimer",
            EngineRequest::KeepTimer => "keepTimer",
            EngineRequest::TabActivated { .. } => "tabActivated",
            EngineRequest::TabUpdated { .. } => "tabUpdated",
            EngineRequest::TabClosed { .. } => "tabClosed",
        }
    }
}

/// Focus areas as either a list or the options page's comma string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FocusAreas {
    List(Vec<String>),
    Csv(String),
}

impl FocusAreas {
    pub fn into_terms(self) -> Vec<String> {
        match self {
            FocusAreas::List(list) => normalize_focus_areas(list),
            FocusAreas::Csv(raw) => parse_focus_areas(&raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineResponse {
    Time(Snapshot),
    Ack { success: bool },
    Classified { category: Option<Category> },
}

impl EngineResponse {
    pub fn ok() -> Self {
        EngineResponse::Ack { success: true }
    }
}

/// Requests the engine sends to the observer in a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ObserverRequest {
    CheckVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverResponse {
    pub category: Option<Category>,
}

/// Whether `raw` is a YouTube watch or shorts page.
pub fn is_video_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let youtube = host == "youtube.com" || host.ends_with(".youtube.com");
    let path = url.path();
    youtube && (path == "/watch" || path.starts_with("/watch/") || path.starts_with("/shorts/"))
}
