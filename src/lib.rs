// src/lib.rs
// Public library surface for the runner binary and integration tests.

pub mod board;
pub mod config;
pub mod error;
pub mod ingest;
pub mod radar;
pub mod relevance;
pub mod results;

// ---- Re-exports for stable public API ----
pub use crate::board::{CycleId, RefreshBoard};
pub use crate::config::RadarConfig;
pub use crate::error::FeedError;
pub use crate::ingest::types::{Article, FeedSource, FetchOutcome};
pub use crate::radar::Radar;
pub use crate::relevance::{relevance_level, RelevanceScorer};
pub use crate::results::{GroupFilter, ResultSet, SourceGroups, TimeBucket};
