// src/config.rs
//! Static radar configuration: feeds, keyword lexicon, thresholds, transports
//! and the source-group table.
//!
//! Resolution order:
//! 1) `$RADAR_CONFIG_PATH` (must exist)
//! 2) `config/radar.toml` in the working directory
//! 3) the copy embedded at build time
//!
//! `RADAR_MIN_SCORE` and `RADAR_REFRESH_SECS` override the loaded values.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;
use crate::relevance::{KeywordEntry, RelevanceThresholds};
use crate::results::SourceGroups;

pub const DEFAULT_CONFIG_PATH: &str = "config/radar.toml";
pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG_PATH";
pub const ENV_MIN_SCORE: &str = "RADAR_MIN_SCORE";
pub const ENV_REFRESH_SECS: &str = "RADAR_REFRESH_SECS";

static BUILTIN_TOML: &str = include_str!("../config/radar.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct RadarConfig {
    #[serde(default)]
    pub relevance: RelevanceThresholds,
    #[serde(default)]
    pub refresh: RefreshCfg,
    pub transports: TransportCfg,
    pub feeds: Vec<FeedSource>,
    pub keywords: Vec<KeywordEntry>,
    #[serde(default)]
    pub source_groups: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RefreshCfg {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    12
}

impl Default for RefreshCfg {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportCfg {
    /// Prefix the percent-encoded feed url is appended to.
    pub digest_endpoint: String,
    /// Relay url templates with `{url}` (encoded) or `{raw_url}` (verbatim).
    #[serde(default)]
    pub relays: Vec<String>,
    #[serde(default = "default_item_marker")]
    pub item_marker: String,
}

fn default_item_marker() -> String {
    "<item>".to_string()
}

impl RadarConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RadarConfig = toml::from_str(s).context("parsing radar config toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The configuration compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TOML).context("embedded config/radar.toml")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading radar config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve via env path, working-dir file, then the embedded copy;
    /// env overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let local = PathBuf::from(DEFAULT_CONFIG_PATH);
            if local.exists() {
                Self::load_from(&local)?
            } else {
                Self::builtin()?
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_env_u32(ENV_MIN_SCORE) {
            self.relevance.min_score = v;
        }
        if let Some(v) = parse_env_u64(ENV_REFRESH_SECS) {
            self.refresh.interval_secs = v.max(1);
        }
    }

    pub fn source_groups(&self) -> SourceGroups {
        SourceGroups::from_pairs(
            self.source_groups
                .iter()
                .map(|(label, group)| (label.clone(), group.clone())),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("at least one [[feeds]] entry is required");
        }
        for (i, f) in self.feeds.iter().enumerate() {
            if f.url.trim().is_empty() || f.label.trim().is_empty() {
                bail!("feed #{i} needs both url and label");
            }
        }
        for k in &self.keywords {
            if k.term.trim().is_empty() {
                bail!("keyword with empty term");
            }
            if k.weight == 0 {
                bail!("keyword `{}` must have a positive weight", k.term);
            }
        }
        for r in &self.transports.relays {
            if !r.contains("{url}") && !r.contains("{raw_url}") {
                bail!("relay template `{r}` has no {{url}} or {{raw_url}} placeholder");
            }
        }
        if self.transports.item_marker.is_empty() {
            bail!("transports.item_marker must not be empty");
        }
        if self.refresh.request_timeout_secs == 0 {
            bail!("refresh.request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

fn parse_env_u32(name: &str) -> Option<u32> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u32>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
