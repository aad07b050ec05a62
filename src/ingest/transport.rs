// src/ingest/transport.rs
//! Transport chain: ordered retrieval strategies for one feed url.
//!
//! 1) Digest endpoint (rss2json-style JSON), accepted on `status == "ok"` with items.
//! 2) Raw relays, tried strictly in order, accepted on 2xx plus an item marker.
//!
//! Every rejection is a `FeedError::TransportRejected`; only exhausting the whole
//! chain produces `FeedError::FeedUnavailable`.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RadarConfig, TransportCfg};
use crate::error::FeedError;
use crate::ingest::types::{DigestDocument, RawPayload};

pub const ALL_SOURCES_FAILED: &str = "all sources failed";

#[async_trait]
pub trait Transport: Send + Sync {
    /// Try to retrieve `feed_url`; a rejection lets the chain move on.
    async fn fetch(&self, feed_url: &str) -> Result<RawPayload, FeedError>;
    fn name(&self) -> &str;
}

/// Run `attempt` over `candidates` in order and return the first accepted value.
/// On exhaustion returns the last rejection, or `None` if there were no candidates.
pub async fn first_accepted<C, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Result<T, Option<E>>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last = None;
    for c in candidates {
        match attempt(c).await {
            Ok(v) => return Ok(v),
            Err(e) => last = Some(e),
        }
    }
    Err(last)
}

/// Ordered list of transports for every feed.
#[derive(Clone)]
pub struct TransportChain {
    transports: Vec<Arc<dyn Transport>>,
}

impl TransportChain {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// Digest endpoint first, then each relay in declared order, all sharing one client.
    pub fn from_config(cfg: &RadarConfig) -> anyhow::Result<Self> {
        let client = http_client(Duration::from_secs(cfg.refresh.request_timeout_secs))?;
        Ok(Self::http(&cfg.transports, client))
    }

    pub fn http(cfg: &TransportCfg, client: Client) -> Self {
        let mut transports: Vec<Arc<dyn Transport>> = Vec::with_capacity(cfg.relays.len() + 1);
        transports.push(Arc::new(DigestTransport::new(
            cfg.digest_endpoint.clone(),
            client.clone(),
        )));
        for (i, template) in cfg.relays.iter().enumerate() {
            transports.push(Arc::new(RelayTransport::new(
                format!("relay-{}", i + 1),
                template.clone(),
                cfg.item_marker.clone(),
                client.clone(),
            )));
        }
        Self { transports }
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Walk the chain for one feed url.
    pub async fn fetch(&self, feed_url: &str) -> Result<RawPayload, FeedError> {
        first_accepted(self.transports.iter(), |t| async move {
            let res = t.fetch(feed_url).await;
            if let Err(e) = &res {
                counter!("ingest_transport_rejected_total").increment(1);
                tracing::debug!(transport = t.name(), url = feed_url, error = %e, "transport rejected");
            }
            res
        })
        .await
        .map_err(|last| match last {
            Some(FeedError::TransportRejected { transport, reason }) => {
                FeedError::unavailable(format!("{transport}: {reason}"))
            }
            Some(other) => FeedError::unavailable(other.to_string()),
            None => FeedError::unavailable(ALL_SOURCES_FAILED),
        })
    }
}

pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("iran-news-radar/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Acceptance check for a digest response body.
pub fn accept_digest(transport: &str, body: &str) -> Result<DigestDocument, FeedError> {
    let doc: DigestDocument = serde_json::from_str(body)
        .map_err(|e| FeedError::rejected(transport, format!("malformed body: {e}")))?;
    if doc.status != "ok" {
        return Err(FeedError::rejected(
            transport,
            format!("status `{}`", doc.status),
        ));
    }
    if doc.items.is_empty() {
        return Err(FeedError::rejected(transport, "no items"));
    }
    Ok(doc)
}

/// Acceptance check for a relay body (guards against 200 error pages).
pub fn accept_markup(transport: &str, body: String, marker: &str) -> Result<String, FeedError> {
    if body.contains(marker) {
        Ok(body)
    } else {
        Err(FeedError::rejected(
            transport,
            format!("body has no `{marker}` marker"),
        ))
    }
}

async fn get_text(client: &Client, transport: &str, url: &str) -> Result<String, FeedError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FeedError::rejected(transport, format!("request failed: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::rejected(
            transport,
            format!("HTTP {}", status.as_u16()),
        ));
    }
    resp.text()
        .await
        .map_err(|e| FeedError::rejected(transport, format!("reading body: {e}")))
}

/// rss2json-style converter: `{endpoint}{urlencoded feed}`.
pub struct DigestTransport {
    endpoint: String,
    client: Client,
}

impl DigestTransport {
    pub fn new(endpoint: String, client: Client) -> Self {
        Self { endpoint, client }
    }

    pub fn request_url(&self, feed_url: &str) -> String {
        format!("{}{}", self.endpoint, urlencoding::encode(feed_url))
    }
}

#[async_trait]
impl Transport for DigestTransport {
    async fn fetch(&self, feed_url: &str) -> Result<RawPayload, FeedError> {
        let body = get_text(&self.client, self.name(), &self.request_url(feed_url)).await?;
        accept_digest(self.name(), &body).map(RawPayload::Digest)
    }

    fn name(&self) -> &str {
        "digest"
    }
}

/// Proxy returning the original feed bytes verbatim.
pub struct RelayTransport {
    name: String,
    template: String,
    marker: String,
    client: Client,
}

impl RelayTransport {
    pub fn new(name: String, template: String, marker: String, client: Client) -> Self {
        Self {
            name,
            template,
            marker,
            client,
        }
    }

    pub fn request_url(&self, feed_url: &str) -> String {
        relay_url(&self.template, feed_url)
    }
}

/// Fill a relay template: `{url}` gets the percent-encoded feed url, `{raw_url}` the verbatim one.
pub fn relay_url(template: &str, feed_url: &str) -> String {
    template
        .replace("{url}", &urlencoding::encode(feed_url))
        .replace("{raw_url}", feed_url)
}

#[async_trait]
impl Transport for RelayTransport {
    async fn fetch(&self, feed_url: &str) -> Result<RawPayload, FeedError> {
        let body = get_text(&self.client, &self.name, &self.request_url(feed_url)).await?;
        accept_markup(&self.name, body, &self.marker).map(RawPayload::Markup)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
