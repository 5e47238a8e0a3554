//! HTTP client for the ranking backend.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::types::{
    BackendErrorBody, Leaderboard, Profile, ProfileEnvelope, RankingStatus, TimeUpdate,
};
use crate::error::SyncError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reject anything that is not shaped like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), SyncError> {
    let invalid = || SyncError::InvalidIdentity(email.to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
    if !clean(local) || !clean(domain) {
        return Err(invalid());
    }
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(invalid());
    }
    Ok(())
}

/// Leaderboard-style masking: `alice@example.com` -> `ali***@example.com`.
pub fn mask_identity(email: &str) -> String {
    let (local, domain) = email.split_once('@').unwrap_or((email, ""));
    let prefix: String = local.chars().take(3).collect();
    if domain.is_empty() {
        format!("{prefix}***")
    } else {
        format!("{prefix}***@{domain}")
    }
}

#[derive(Debug, Clone)]
pub struct RankingClient {
    http: Client,
    base: Url,
}

impl RankingClient {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Register or log in. Idempotent on the backend side.
    pub async fn register(&self, email: &str) -> Result<Profile, SyncError> {
        validate_email(email)?;
        let url = self.base.join("api/register")?;
        let resp = self.http.post(url).json(&json!({ "email": email })).send().await?;
        let envelope: ProfileEnvelope = decode(resp).await?;
        Ok(envelope.user)
    }

    /// Overwrite today's totals for `email`.
    pub async fn update_time(
        &self,
        email: &str,
        productive_minutes: f64,
        unproductive_minutes: f64,
    ) -> Result<Profile, SyncError> {
        let url = self.base.join("api/update-time")?;
        let body = TimeUpdate {
            email,
            productive_time: productive_minutes,
            unproductive_time: unproductive_minutes,
        };
        let resp = self.http.post(url).json(&body).send().await?;
        let envelope: ProfileEnvelope = decode(resp).await?;
        Ok(envelope.user)
    }

    pub async fn ranking(&self, email: &str) -> Result<RankingStatus, SyncError> {
        let mut url = self.base.join("api/ranking/")?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(email);
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    pub async fn leaderboard(&self, limit: u32) -> Result<Leaderboard, SyncError> {
        let mut url = self.base.join("api/leaderboard")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<BackendErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(SyncError::Backend {
        status: status.as_u16(),
        message,
    })
}
