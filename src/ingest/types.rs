// src/ingest/types.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// One upstream feed endpoint and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub label: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// Top-level document returned by the rss2json-style digest endpoint.
/// Items stay untyped until the normalizer decodes them one by one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigestDocument {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// Payload accepted by a transport, tagged by shape so the normalizer
/// knows which parser applies.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Digest(DigestDocument),
    Markup(String),
}

/// Canonical article after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// Upstream timestamp text, parsed lazily via [`Article::published_at`].
    pub pub_date: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub source: String,
    /// Set by the relevance scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl Article {
    /// Empty-field article for the given source (used when an item is malformed).
    pub fn empty(source: &str) -> Self {
        Self {
            title: String::new(),
            link: String::new(),
            pub_date: String::new(),
            desc: String::new(),
            tags: Vec::new(),
            image: None,
            source: source.to_string(),
            score: None,
        }
    }

    /// Dedup key: link, or title when the link is blank.
    pub fn dedup_key(&self) -> &str {
        if self.link.is_empty() {
            &self.title
        } else {
            &self.link
        }
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = Some(score);
        self
    }

    /// Score or 0 when unscored.
    pub fn score_or_zero(&self) -> u32 {
        self.score.unwrap_or(0)
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_pub_date(&self.pub_date)
    }
}

/// Parse the date formats seen in RSS and digest payloads.
/// RFC 2822 (RSS), RFC 3339 (Atom-ish) and `YYYY-MM-DD HH:MM:SS` (digest, UTC).
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Per-feed result of one refresh cycle.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success { label: String, articles: Vec<Article> },
    Failure { label: String, error: FeedError },
}

impl FetchOutcome {
    pub fn label(&self) -> &str {
        match self {
            FetchOutcome::Success { label, .. } | FetchOutcome::Failure { label, .. } => label,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}
