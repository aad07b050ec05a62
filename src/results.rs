// src/results.rs
//! # Result Set
//!
//! The relevant, deduplicated articles of one refresh cycle plus the feed
//! availability summary. Orderings and groupings are computed on demand and
//! never re-score or re-fetch.
//!
//! - Recency: newest first, unparsable dates last, stable.
//! - Relevance: highest score first, stable.
//! - Timeline: recency order split into fixed age buckets, headers only for
//!   buckets that actually occur.
//! - Source groups: explicit label → group table; unknown labels are their own group.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Borrow;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::board::CycleId;
use crate::ingest::types::Article;

#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub cycle: CycleId,
    pub articles: Vec<Article>,
    /// Feeds whose transport chain succeeded, whatever they contributed.
    pub success_count: usize,
    /// Labels of feeds whose chain was exhausted, in declared feed order.
    pub failed_labels: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Header numbers for the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub articles: usize,
    pub sources: usize,
    pub updated: DateTime<Utc>,
}

impl ResultSet {
    pub fn empty(cycle: CycleId) -> Self {
        Self {
            cycle,
            articles: Vec::new(),
            success_count: 0,
            failed_labels: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            articles: self.articles.len(),
            sources: self.success_count,
            updated: self.completed_at,
        }
    }

    pub fn sorted_by_recency(&self) -> Vec<&Article> {
        let mut v: Vec<&Article> = self.articles.iter().collect();
        sort_by_recency(&mut v);
        v
    }

    pub fn sorted_by_relevance(&self) -> Vec<&Article> {
        let mut v: Vec<&Article> = self.articles.iter().collect();
        sort_by_relevance(&mut v);
        v
    }

    /// Recency-ordered sections for the timeline view.
    pub fn timeline(&self, now: DateTime<Utc>) -> Vec<TimelineSection<'_>> {
        timeline(self.sorted_by_recency(), now)
    }

    /// Distinct source groups present in this set, sorted.
    pub fn groups(&self, table: &SourceGroups) -> Vec<String> {
        self.articles
            .iter()
            .map(|a| table.group_of(&a.source).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Articles visible under `filter`, in stored order.
    pub fn view<'a>(&'a self, table: &SourceGroups, filter: &GroupFilter) -> Vec<&'a Article> {
        self.articles
            .iter()
            .filter(|a| filter.matches(table.group_of(&a.source)))
            .collect()
    }
}

/// Newest first; articles without a parsable date go last. Stable.
pub fn sort_by_recency<A: Borrow<Article>>(items: &mut [A]) {
    // Reverse(None) sorts after every Reverse(Some(_)).
    items.sort_by_cached_key(|a| Reverse(a.borrow().published_at()));
}

/// Highest score first. Stable.
pub fn sort_by_relevance<A: Borrow<Article>>(items: &mut [A]) {
    items.sort_by(|a, b| b.borrow().score_or_zero().cmp(&a.borrow().score_or_zero()));
}

/* ----------------------------
Timeline buckets
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TimeBucket {
    PastHour,
    Hours1To4,
    Hours4To12,
    Hours12To24,
    Days1To3,
    Older,
}

impl TimeBucket {
    /// Bucket for an article age in hours. Negative ages (clock skew) count as
    /// the past hour; unknown ages as older.
    pub fn from_age_hours(hours: Option<f64>) -> Self {
        match hours {
            None => TimeBucket::Older,
            Some(h) if h < 1.0 => TimeBucket::PastHour,
            Some(h) if h < 4.0 => TimeBucket::Hours1To4,
            Some(h) if h < 12.0 => TimeBucket::Hours4To12,
            Some(h) if h < 24.0 => TimeBucket::Hours12To24,
            Some(h) if h < 72.0 => TimeBucket::Days1To3,
            Some(_) => TimeBucket::Older,
        }
    }

    pub fn for_article(article: &Article, now: DateTime<Utc>) -> Self {
        let hours = article
            .published_at()
            .map(|t| (now - t).num_milliseconds() as f64 / 3_600_000.0);
        Self::from_age_hours(hours)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeBucket::PastHour => "Last hour",
            TimeBucket::Hours1To4 => "1-4 hours ago",
            TimeBucket::Hours4To12 => "4-12 hours ago",
            TimeBucket::Hours12To24 => "12-24 hours ago",
            TimeBucket::Days1To3 => "1-3 days ago",
            TimeBucket::Older => "Older",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSection<'a> {
    pub bucket: TimeBucket,
    pub articles: Vec<&'a Article>,
}

/// Split already recency-sorted articles into sections, opening a new one each
/// time the bucket changes.
pub fn timeline(sorted: Vec<&Article>, now: DateTime<Utc>) -> Vec<TimelineSection<'_>> {
    let mut sections: Vec<TimelineSection<'_>> = Vec::new();
    for a in sorted {
        let bucket = TimeBucket::for_article(a, now);
        match sections.last_mut() {
            Some(s) if s.bucket == bucket => s.articles.push(a),
            _ => sections.push(TimelineSection {
                bucket,
                articles: vec![a],
            }),
        }
    }
    sections
}

/* ----------------------------
Source groups
---------------------------- */

/// Explicit label → group mapping.
#[derive(Debug, Clone, Default)]
pub struct SourceGroups {
    map: HashMap<String, String>,
}

impl SourceGroups {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn group_of<'a>(&'a self, label: &'a str) -> &'a str {
        self.map.get(label).map(String::as_str).unwrap_or(label)
    }
}

/// Which group the consumer is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupFilter {
    #[default]
    All,
    Only(String),
}

impl GroupFilter {
    pub fn matches(&self, group: &str) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Only(g) => g == group,
        }
    }

    /// Fall back to `All` when the selected group is gone after a refresh.
    pub fn retain_valid(self, groups: &[String]) -> Self {
        match self {
            GroupFilter::Only(g) if !groups.contains(&g) => GroupFilter::All,
            other => other,
        }
    }
}
