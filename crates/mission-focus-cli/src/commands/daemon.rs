use std::sync::Arc;
use std::time::Duration;

use mission_focus_core::service::CLASSIFY_REPLY_MARGIN;
use mission_focus_core::sync::{mask_identity, RankingClient, SyncScheduler};
use mission_focus_core::{
    Config, EngineService, Notification, Notifier, ServiceOptions, SystemClock,
};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{build_classifier, open_store, CmdResult};
use crate::bridge::{self, BridgeNotifier, BridgeProbe};

/// Host the engine on stdin/stdout until the extension disconnects or the
/// process is interrupted.
pub fn run() -> CmdResult {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve());
    // A blocked stdin read would otherwise hold shutdown open.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn serve() -> CmdResult {
    let mut config = Config::load_or_default();
    let store = open_store()?;
    let classifier = build_classifier(&config, true)?;
    tracing::info!(remote = classifier.has_remote(), "classifier ready");

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let probe = BridgeProbe::new(out_tx.clone());
    let notifier: Arc<dyn Notifier> = Arc::new(BridgeNotifier::new(out_tx.clone()));

    let (service, handle) = EngineService::new(
        ServiceOptions::from_config(&config),
        Box::new(store),
        Arc::new(SystemClock),
    );
    let handle =
        handle.with_classify_timeout(config.classifier_timeout() + CLASSIFY_REPLY_MARGIN);
    let service = service
        .with_notifier(notifier.clone())
        .with_classifier(classifier)
        .with_probe(Arc::new(probe.clone()));

    let cancel = CancellationToken::new();
    let engine_task = tokio::spawn(service.run(cancel.clone()));
    let writer_task = tokio::spawn(bridge::write_loop(tokio::io::stdout(), out_rx));

    if !config.setup_complete {
        notifier.notify(&Notification::welcome());
        config.setup_complete = true;
        if let Err(e) = config.save() {
            tracing::warn!("failed to record setup completion: {e}");
        }
    }

    match (&config.user_identity, config.sync.enabled) {
        (Some(email), true) => {
            let client = RankingClient::new(&config.sync.backend_url)?;
            let scheduler = SyncScheduler::new(client, handle.clone(), notifier.clone())
                .with_intervals(config.sync_interval(), config.rank_interval());
            tracing::info!(identity = %mask_identity(email), "leaderboard sync enabled");
            tokio::spawn(scheduler.run(cancel.child_token()));
        }
        (None, true) => tracing::info!("no identity configured, leaderboard sync off"),
        (_, false) => tracing::info!("leaderboard sync disabled"),
    }

    let reader = bridge::read_loop(
        BufReader::new(tokio::io::stdin()),
        handle,
        probe,
        out_tx,
        cancel.clone(),
    );
    tokio::select! {
        _ = reader => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    cancel.cancel();
    if let Err(e) = engine_task.await {
        tracing::warn!("engine task failed: {e}");
    }
    // The notifier held by the stopped service was the last sender besides
    // ours; dropping it lets the writer drain and exit.
    drop(notifier);
    if let Err(e) = writer_task.await {
        tracing::warn!("writer task failed: {e}");
    }
    Ok(())
}
