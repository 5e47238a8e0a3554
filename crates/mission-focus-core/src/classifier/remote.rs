//! Remote tier: ask a language model for a one-word verdict.

use async_trait::async_trait;
use indoc::formatdoc;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::VideoMetadata;
use crate::accounting::Category;
use crate::error::ClassifierError;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const DESCRIPTION_LIMIT: usize = 500;

/// A text-completion backend. Implementations return the raw answer text;
/// interpretation happens in [`parse_verdict`].
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiClassifier {
    http: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl GeminiClassifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClassifierError> {
        Self::with_endpoint(DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, api_key)
    }

    /// Point the client at another endpoint and model (proxies, tests).
    pub fn with_endpoint(
        endpoint: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            endpoint,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn request_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self
            .endpoint
            .join(&format!("models/{}:generateContent", self.model))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl RemoteClassifier for GeminiClassifier {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let url = self.request_url()?;
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.0, "maxOutputTokens": 40 }
        });

        let resp = self.http.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Http { status, body });
        }

        let data: Value = resp.json().await?;
        Ok(extract_text(&data).unwrap_or_default())
    }
}

/// Pull the answer text out of the response shapes seen in the wild.
fn extract_text(data: &Value) -> Option<String> {
    data.pointer("/candidates/0/content/parts/0/text")
        .or_else(|| data.pointer("/output/0/content/text"))
        .or_else(|| data.get("response"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn build_prompt(metadata: &VideoMetadata, focus_areas: &[String]) -> String {
    let description: String = metadata.description.chars().take(DESCRIPTION_LIMIT).collect();
    formatdoc! {"
        Analyze whether this YouTube video matches the user's focus areas: {areas}
        VIDEO TITLE: {title}
        VIDEO DESCRIPTION: {description}
        Rules:
        - Reply ONLY with the single word \"productive\" if content matches ANY focus area.
        - Reply ONLY with the single word \"unproductive\" otherwise.
        Return only that one word.",
        areas = focus_areas.join(", "),
        title = metadata.title,
        description = description,
    }
}

/// Interpret a model answer. An exact token wins; otherwise the answer must
/// mention exactly one of the two category words.
pub fn parse_verdict(text: &str) -> Option<Category> {
    let normalized = text.trim().to_lowercase();
    match normalized.as_str() {
        "productive" => return Some(Category::Productive),
        "unproductive" => return Some(Category::Unproductive),
        "" => return None,
        _ => {}
    }

    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    let productive = words.contains(&"productive");
    let unproductive = words.contains(&"unproductive");
    match (productive, unproductive) {
        (true, false) => Some(Category::Productive),
        (false, true) => Some(Category::Unproductive),
        _ => None,
    }
}
