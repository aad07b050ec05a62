// src/radar.rs
//! The radar service: feeds, transport chain, scorer and refresh board wired
//! together. `refresh()` is the unit of work for both the timer and manual
//! refreshes.

use std::sync::Arc;

use crate::board::RefreshBoard;
use crate::config::RadarConfig;
use crate::ingest::run_cycle;
use crate::ingest::transport::TransportChain;
use crate::ingest::types::FeedSource;
use crate::relevance::RelevanceScorer;
use crate::results::{ResultSet, SourceGroups};

pub struct Radar {
    feeds: Vec<FeedSource>,
    chain: TransportChain,
    scorer: RelevanceScorer,
    groups: SourceGroups,
    board: RefreshBoard,
}

impl Radar {
    pub fn new(
        feeds: Vec<FeedSource>,
        chain: TransportChain,
        scorer: RelevanceScorer,
        groups: SourceGroups,
    ) -> Self {
        Self {
            feeds,
            chain,
            scorer,
            groups,
            board: RefreshBoard::new(),
        }
    }

    /// HTTP transports built from the config tables.
    pub fn from_config(cfg: &RadarConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            cfg.feeds.clone(),
            TransportChain::from_config(cfg)?,
            RelevanceScorer::from_config(cfg),
            cfg.source_groups(),
        ))
    }

    /// Run one cycle and publish it. Returns the set if it was still the
    /// newest cycle when it finished, `None` if a later cycle superseded it.
    pub async fn refresh(&self) -> Option<Arc<ResultSet>> {
        let cycle = self.board.begin_cycle();
        let set = run_cycle(cycle, &self.feeds, &self.chain, &self.scorer).await;
        self.board.publish(set)
    }

    /// Last published snapshot (kept while a new cycle runs).
    pub fn current(&self) -> Option<Arc<ResultSet>> {
        self.board.current()
    }

    pub fn board(&self) -> &RefreshBoard {
        &self.board
    }

    pub fn groups(&self) -> &SourceGroups {
        &self.groups
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }
}
