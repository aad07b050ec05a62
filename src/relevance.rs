// src/relevance.rs
//! Keyword relevance: weighted substring scoring over an article haystack and
//! the anchor-gated verdict deciding whether the article is kept.
//!
//! - Haystack: lower-cased `title + " " + desc + " " + tags.join(" ")`.
//! - Score: sum of weights of every lexicon term present (presence, not count).
//! - Anchors: terms with weight >= `anchor_weight`.
//! - Verdict: anchored articles need `min_score`, the rest `unanchored_min_score`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ingest::types::Article;

pub const MIN_SCORE: u32 = 4;
pub const UNANCHORED_MIN_SCORE: u32 = 10;
pub const ANCHOR_WEIGHT: u32 = 10;

pub const ENV_DEV_LOG: &str = "RADAR_DEV_LOG";

/// One lexicon entry. Matched case-insensitively as a substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub term: String,
    pub weight: u32,
}

impl KeywordEntry {
    pub fn new(term: impl Into<String>, weight: u32) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RelevanceThresholds {
    #[serde(default = "default_min_score")]
    pub min_score: u32,
    #[serde(default = "default_unanchored_min_score")]
    pub unanchored_min_score: u32,
    #[serde(default = "default_anchor_weight")]
    pub anchor_weight: u32,
}

fn default_min_score() -> u32 {
    MIN_SCORE
}

fn default_unanchored_min_score() -> u32 {
    UNANCHORED_MIN_SCORE
}

fn default_anchor_weight() -> u32 {
    ANCHOR_WEIGHT
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            min_score: MIN_SCORE,
            unanchored_min_score: UNANCHORED_MIN_SCORE,
            anchor_weight: ANCHOR_WEIGHT,
        }
    }
}

impl RelevanceThresholds {
    /// The verdict rule on its own, given the anchor flag and score.
    pub fn passes(&self, has_anchor: bool, score: u32) -> bool {
        if has_anchor {
            score >= self.min_score
        } else {
            score >= self.unanchored_min_score
        }
    }
}

/// Visual intensity tier: 3 for >= 20, 2 for >= 10, else 1. Never used for filtering.
pub fn relevance_level(score: u32) -> u8 {
    if score >= 20 {
        3
    } else if score >= 10 {
        2
    } else {
        1
    }
}

/// Full evaluation of one article.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relevance {
    pub score: u32,
    pub has_anchor: bool,
    pub relevant: bool,
    pub matched: Vec<String>,
}

/// Compiled lexicon (terms lower-cased once) plus thresholds.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    terms: Vec<(String, u32)>,
    anchors: Vec<String>,
    thresholds: RelevanceThresholds,
}

impl RelevanceScorer {
    pub fn new(keywords: &[KeywordEntry], thresholds: RelevanceThresholds) -> Self {
        let terms: Vec<(String, u32)> = keywords
            .iter()
            .map(|k| (k.term.to_lowercase(), k.weight))
            .collect();
        let anchors = terms
            .iter()
            .filter(|(_, w)| *w >= thresholds.anchor_weight)
            .map(|(t, _)| t.clone())
            .collect();
        Self {
            terms,
            anchors,
            thresholds,
        }
    }

    pub fn from_config(cfg: &crate::config::RadarConfig) -> Self {
        Self::new(&cfg.keywords, cfg.relevance)
    }

    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    pub fn thresholds(&self) -> RelevanceThresholds {
        self.thresholds
    }

    /// Lower-cased matching corpus for an article.
    pub fn haystack(article: &Article) -> String {
        format!(
            "{} {} {}",
            article.title,
            article.desc,
            article.tags.join(" ")
        )
        .to_lowercase()
    }

    pub fn score_article(&self, article: &Article) -> u32 {
        self.score_haystack(&Self::haystack(article))
    }

    pub fn is_relevant(&self, article: &Article, score: u32) -> bool {
        let hay = Self::haystack(article);
        self.thresholds.passes(self.has_anchor(&hay), score)
    }

    /// Score, anchor flag, verdict and matched terms in one pass over the haystack.
    pub fn evaluate(&self, article: &Article) -> Relevance {
        let hay = Self::haystack(article);
        let mut score = 0u32;
        let mut matched = Vec::new();
        for (term, weight) in &self.terms {
            if hay.contains(term.as_str()) {
                score = score.saturating_add(*weight);
                matched.push(term.clone());
            }
        }
        let has_anchor = self.has_anchor(&hay);
        let relevant = self.thresholds.passes(has_anchor, score);

        dev_log_relevance(&hay, &matched, score, relevant);

        Relevance {
            score,
            has_anchor,
            relevant,
            matched,
        }
    }

    fn score_haystack(&self, hay: &str) -> u32 {
        self.terms
            .iter()
            .filter(|(term, _)| hay.contains(term.as_str()))
            .fold(0u32, |acc, (_, w)| acc.saturating_add(*w))
    }

    fn has_anchor(&self, hay: &str) -> bool {
        self.anchors.iter().any(|a| hay.contains(a.as_str()))
    }
}

// Dev logging gate: RADAR_DEV_LOG=1 and a debug build.
pub(crate) fn dev_logging_enabled() -> bool {
    cfg!(debug_assertions) && std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1")
}

/// Short stable id for a text, so logs never carry article bodies.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn dev_log_relevance(haystack: &str, matched: &[String], score: u32, relevant: bool) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(haystack);
    let matched_short: Vec<&String> = matched.iter().take(5).collect();
    info!(
        target: "relevance",
        %id, score, relevant,
        matched = ?matched_short
    );
}
