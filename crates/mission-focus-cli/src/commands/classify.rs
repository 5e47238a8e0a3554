use mission_focus_core::classifier::keyword_category;
use mission_focus_core::{Config, VideoMetadata};
use tokio_util::sync::CancellationToken;

use super::{block_on, build_classifier, CmdResult};

/// Print the category the daemon would report for this metadata.
pub fn run(title: &str, description: &str, no_remote: bool) -> CmdResult {
    let config = Config::load_or_default();
    let metadata = VideoMetadata::new(title, description);
    if metadata.is_empty() {
        return Err("title must not be empty".into());
    }

    let tier = if keyword_category(&metadata, &config.focus_areas).is_some() {
        "keyword"
    } else if no_remote {
        "default"
    } else {
        "remote"
    };

    let classifier = build_classifier(&config, !no_remote)?;
    if tier == "remote" && !classifier.has_remote() {
        tracing::info!("no classifier key configured, remote tier skipped");
    }
    let category = block_on(async {
        classifier
            .classify(&metadata, &config.focus_areas, &CancellationToken::new())
            .await
    })?;

    println!("{}", category.as_str());
    tracing::debug!(tier, "classified");
    Ok(())
}
