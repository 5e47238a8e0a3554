//! Background push/poll loop against the ranking backend.
//!
//! Runs beside the engine service and only talks to it through an
//! [`EngineHandle`]. Failures are logged and retried on the next interval;
//! they never reach local accounting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::client::RankingClient;
use crate::error::SyncError;
use crate::notify::{Notification, Notifier};
use crate::service::EngineHandle;

pub struct SyncScheduler {
    client: RankingClient,
    engine: EngineHandle,
    notifier: Arc<dyn Notifier>,
    sync_interval: Duration,
    rank_interval: Duration,
}

impl SyncScheduler {
    pub fn new(client: RankingClient, engine: EngineHandle, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            engine,
            notifier,
            sync_interval: Duration::from_secs(30),
            rank_interval: Duration::from_secs(60),
        }
    }

    pub fn with_intervals(mut self, sync_interval: Duration, rank_interval: Duration) -> Self {
        self.sync_interval = sync_interval;
        self.rank_interval = rank_interval;
        self
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut push = tokio::time::interval(self.sync_interval);
        push.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut rank = tokio::time::interval(self.rank_interval);
        rank.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Give the first push a head start over the first rank poll.
        rank.reset();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = push.tick() => {
                    // In-flight HTTP calls are abandoned on cancel.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = self.push_once() => {
                            if let Err(e) = result {
                                log_failure("push", &e);
                            }
                        }
                    }
                }
                _ = rank.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = self.check_rank_once() => {
                            if let Err(e) = result {
                                log_failure("rank check", &e);
                            }
                        }
                    }
                }
            }
            if self.engine.is_closed() {
                break;
            }
        }
        tracing::debug!("sync scheduler stopped");
    }

    /// Push today's totals. Registers the identity once if the backend does
    /// not know it yet.
    pub async fn push_once(&self) -> Result<(), SyncError> {
        let snapshot = self.engine.snapshot().await?;
        let email = snapshot.user_identity.ok_or(SyncError::NoIdentity)?;

        let pushed = self
            .client
            .update_time(&email, snapshot.productive_minutes, snapshot.unproductive_minutes)
            .await;
        match pushed {
            Err(SyncError::Backend { status: 404, .. }) => {
                tracing::info!("identity unknown to backend, registering");
                self.client.register(&email).await?;
                self.client
                    .update_time(&email, snapshot.productive_minutes, snapshot.unproductive_minutes)
                    .await?;
            }
            other => {
                other?;
            }
        }

        // Engine gone means shutdown; the push itself succeeded.
        let _ = self.engine.record_sync(Utc::now()).await;
        tracing::debug!(
            productive = snapshot.productive_minutes,
            unproductive = snapshot.unproductive_minutes,
            "pushed totals"
        );
        Ok(())
    }

    /// Poll rank and announce a first place the backend flags as new.
    pub async fn check_rank_once(&self) -> Result<(), SyncError> {
        let snapshot = self.engine.snapshot().await?;
        let email = snapshot.user_identity.ok_or(SyncError::NoIdentity)?;

        let status = self.client.ranking(&email).await?;
        tracing::debug!(rank = status.rank, total = status.total, "rank checked");
        if status.should_notify {
            self.notifier.notify(&Notification::top_rank(status.total));
        }
        Ok(())
    }
}

fn log_failure(what: &str, err: &SyncError) {
    match err {
        SyncError::NoIdentity => tracing::trace!("{what} skipped: no identity"),
        e => tracing::warn!("{what} failed: {e}"),
    }
}
