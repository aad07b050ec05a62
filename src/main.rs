//! Iran News Radar headless runner.
//! Loads the feed/lexicon config, refreshes every feed on a timer and logs
//! each published result set. Rendering is left to whatever consumes the library.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iran_news_radar::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use iran_news_radar::{relevance_level, Radar, RadarConfig, ResultSet};

/// Compact logs by default, JSON when RADAR_LOG_JSON=1.
/// Filter comes from RUST_LOG, else `iran_news_radar=info,ingest=info,warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("iran_news_radar=info,ingest=info,warn"));

    let json = std::env::var("RADAR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn log_snapshot(radar: &Radar, set: &ResultSet) {
    let groups = set.groups(radar.groups());

    tracing::info!(
        cycle = %set.cycle,
        articles = set.articles.len(),
        sources = set.success_count,
        groups = ?groups,
        "snapshot published"
    );
    for label in &set.failed_labels {
        tracing::warn!(feed = %label, "feed could not be loaded this cycle");
    }
    for a in set.sorted_by_relevance().into_iter().take(5) {
        tracing::info!(
            score = a.score_or_zero(),
            level = relevance_level(a.score_or_zero()),
            source = %a.source,
            title = %a.title,
            "top article"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = RadarConfig::load_default().context("loading radar config")?;
    tracing::info!(
        feeds = cfg.feeds.len(),
        keywords = cfg.keywords.len(),
        interval_secs = cfg.refresh.interval_secs,
        "radar config loaded"
    );

    let radar = Arc::new(Radar::from_config(&cfg).context("building transports")?);

    let logger = radar.clone();
    let handle = spawn_refresh_scheduler(
        radar.clone(),
        RefreshSchedulerCfg::from(cfg.refresh),
        move |set| log_snapshot(&logger, &set),
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("shutting down");
    handle.abort();
    Ok(())
}
