// src/ingest/mod.rs
pub mod normalize;
pub mod scheduler;
pub mod transport;
pub mod types;

use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::board::CycleId;
use crate::ingest::normalize::normalize_payload;
use crate::ingest::transport::TransportChain;
use crate::ingest::types::{Article, FeedSource, FetchOutcome};
use crate::relevance::RelevanceScorer;
use crate::results::ResultSet;

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Articles parsed from successful feeds.");
        describe_counter!(
            "ingest_kept_total",
            "Articles kept after dedup + relevance filtering."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Articles dropped by the relevance verdict."
        );
        describe_counter!("ingest_dedup_total", "Articles dropped as duplicates.");
        describe_counter!(
            "ingest_transport_rejected_total",
            "Transport attempts that failed acceptance."
        );
        describe_counter!(
            "ingest_feed_unavailable_total",
            "Feeds whose whole transport chain failed."
        );
        describe_counter!(
            "ingest_stale_cycles_total",
            "Refresh cycles discarded because a newer one was issued."
        );
        describe_counter!("ingest_runs_total", "Scheduler ticks that started a cycle.");
        describe_histogram!("ingest_parse_ms", "Markup parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when a refresh cycle last completed."
        );
    });
}

/// Transport chain plus normalizer for one source.
pub async fn fetch_feed(chain: &TransportChain, source: &FeedSource) -> FetchOutcome {
    match chain.fetch(&source.url).await {
        Ok(payload) => FetchOutcome::Success {
            label: source.label.clone(),
            articles: normalize_payload(&payload, &source.label),
        },
        Err(error) => {
            counter!("ingest_feed_unavailable_total").increment(1);
            tracing::warn!(feed = %source.label, error = %error, "feed unavailable");
            FetchOutcome::Failure {
                label: source.label.clone(),
                error,
            }
        }
    }
}

/// Merge per-feed outcomes in the given (declared) order: dedup by
/// link-or-title, score, keep relevant ones.
/// Returns (result set, filtered count, dedup count).
pub fn merge_outcomes(
    cycle: CycleId,
    outcomes: Vec<FetchOutcome>,
    scorer: &RelevanceScorer,
) -> (ResultSet, usize, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut articles: Vec<Article> = Vec::new();
    let mut failed_labels = Vec::new();
    let mut success_count = 0usize;
    let mut filtered = 0usize;
    let mut dedup = 0usize;

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Success { articles: items, .. } => {
                success_count += 1;
                counter!("ingest_events_total").increment(items.len() as u64);
                for article in items {
                    // Dedup runs before the verdict: an off-topic article still claims its key.
                    if !seen.insert(article.dedup_key().to_string()) {
                        dedup += 1;
                        continue;
                    }
                    let rel = scorer.evaluate(&article);
                    if rel.relevant {
                        articles.push(article.with_score(rel.score));
                    } else {
                        filtered += 1;
                    }
                }
            }
            FetchOutcome::Failure { label, .. } => failed_labels.push(label),
        }
    }

    let set = ResultSet {
        cycle,
        articles,
        success_count,
        failed_labels,
        completed_at: Utc::now(),
    };
    (set, filtered, dedup)
}

/// Run one refresh cycle: every feed concurrently, then a single ordered merge.
/// Never fails; a total outage is an empty set with `success_count == 0`.
pub async fn run_cycle(
    cycle: CycleId,
    feeds: &[FeedSource],
    chain: &TransportChain,
    scorer: &RelevanceScorer,
) -> ResultSet {
    ensure_metrics_described();

    // join_all yields outcomes in input order regardless of completion order.
    let outcomes = join_all(feeds.iter().map(|f| fetch_feed(chain, f))).await;

    let (set, filtered, dedup) = merge_outcomes(cycle, outcomes, scorer);

    counter!("ingest_kept_total").increment(set.articles.len() as u64);
    counter!("ingest_filtered_total").increment(filtered as u64);
    counter!("ingest_dedup_total").increment(dedup as u64);
    gauge!("ingest_pipeline_last_run_ts").set(set.completed_at.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        cycle = %cycle,
        kept = set.articles.len(),
        success = set.success_count,
        failed = set.failed_labels.len(),
        filtered,
        dedup,
        "refresh cycle finished"
    );
    set
}
