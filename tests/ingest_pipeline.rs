// tests/ingest_pipeline.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use iran_news_radar::ingest::run_cycle;
use iran_news_radar::ingest::transport::{Transport, TransportChain};
use iran_news_radar::ingest::types::RawPayload;
use iran_news_radar::relevance::{KeywordEntry, RelevanceThresholds};
use iran_news_radar::{CycleId, FeedError, FeedSource, RelevanceScorer};

/// Serves canned RSS per feed url after an optional delay; unknown urls are rejected.
struct CannedRelay {
    pages: HashMap<String, (u64, String)>,
}

#[async_trait]
impl Transport for CannedRelay {
    async fn fetch(&self, feed_url: &str) -> Result<RawPayload, FeedError> {
        match self.pages.get(feed_url) {
            Some((delay_ms, body)) => {
                if *delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                }
                Ok(RawPayload::Markup(body.clone()))
            }
            None => Err(FeedError::rejected("canned", "HTTP 503")),
        }
    }

    fn name(&self) -> &str {
        "canned"
    }
}

fn rss(items: &[(&str, &str)]) -> String {
    let mut out = String::from("<rss><channel>");
    for (title, link) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

fn scorer() -> RelevanceScorer {
    RelevanceScorer::new(
        &[KeywordEntry::new("iran", 10), KeywordEntry::new("tehran", 8)],
        RelevanceThresholds::default(),
    )
}

fn chain(pages: Vec<(&str, u64, String)>) -> TransportChain {
    let pages = pages
        .into_iter()
        .map(|(url, delay, body)| (url.to_string(), (delay, body)))
        .collect();
    let relay: Arc<dyn Transport> = Arc::new(CannedRelay { pages });
    TransportChain::new(vec![relay])
}

#[tokio::test]
async fn failed_feeds_are_reported_by_label() {
    let feeds = vec![
        FeedSource::new("https://a.test/rss", "A"),
        FeedSource::new("https://b.test/rss", "B"),
        FeedSource::new("https://c.test/rss", "C"),
        FeedSource::new("https://d.test/rss", "D"),
        FeedSource::new("https://e.test/rss", "E"),
    ];
    let chain = chain(vec![
        ("https://a.test/rss", 0, rss(&[("Iran a", "https://a.test/1")])),
        ("https://c.test/rss", 0, rss(&[("weather", "https://c.test/1")])),
        ("https://e.test/rss", 0, rss(&[])),
    ]);

    let set = run_cycle(CycleId(1), &feeds, &chain, &scorer()).await;

    assert_eq!(set.success_count, 3);
    assert_eq!(set.failed_labels, vec!["B".to_string(), "D".to_string()]);
    assert_eq!(set.articles.len(), 1);
    assert_eq!(set.articles[0].source, "A");
    assert_eq!(set.articles[0].score, Some(10));
}

#[tokio::test(start_paused = true)]
async fn merge_follows_declared_order_not_completion_order() {
    let feeds = vec![
        FeedSource::new("https://slow.test/rss", "Slow"),
        FeedSource::new("https://fast.test/rss", "Fast"),
        FeedSource::new("https://mid.test/rss", "Mid"),
    ];
    let chain = chain(vec![
        ("https://slow.test/rss", 300, rss(&[("Iran slow", "https://n.test/slow")])),
        ("https://fast.test/rss", 0, rss(&[("Iran fast", "https://n.test/fast")])),
        ("https://mid.test/rss", 50, rss(&[("Iran mid", "https://n.test/mid")])),
    ]);

    let set = run_cycle(CycleId(1), &feeds, &chain, &scorer()).await;

    let titles: Vec<_> = set.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Iran slow", "Iran fast", "Iran mid"]);
}

#[tokio::test(start_paused = true)]
async fn cross_feed_duplicates_keep_the_earlier_feed() {
    let feeds = vec![
        FeedSource::new("https://first.test/rss", "First"),
        FeedSource::new("https://second.test/rss", "Second"),
    ];
    let shared = "https://n.test/shared";
    let chain = chain(vec![
        ("https://first.test/rss", 200, rss(&[("Iran shared", shared)])),
        (
            "https://second.test/rss",
            0,
            rss(&[("Iran shared (copy)", shared), ("Tehran and Iran", "https://n.test/2")]),
        ),
    ]);

    let set = run_cycle(CycleId(1), &feeds, &chain, &scorer()).await;

    assert_eq!(set.articles.len(), 2);
    assert_eq!(set.articles[0].source, "First");
    assert_eq!(set.articles[0].title, "Iran shared");
    assert_eq!(set.articles[1].score, Some(18));
    let links: std::collections::HashSet<_> = set.articles.iter().map(|a| a.link.as_str()).collect();
    assert_eq!(links.len(), set.articles.len());
}

#[tokio::test]
async fn total_outage_is_an_empty_set_not_an_error() {
    let feeds = vec![
        FeedSource::new("https://a.test/rss", "A"),
        FeedSource::new("https://b.test/rss", "B"),
    ];
    let set = run_cycle(CycleId(7), &feeds, &chain(Vec::new()), &scorer()).await;
    assert!(set.is_empty());
    assert_eq!(set.success_count, 0);
    assert_eq!(set.failed_labels, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(set.cycle, CycleId(7));
}
