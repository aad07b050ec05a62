// src/error.rs
//! Feed-level error taxonomy. None of these ever abort a refresh cycle:
//! rejections drive the transport fallback, exhaustion becomes a failed label,
//! malformed items degrade to empty-field articles.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// One transport attempt did not pass its acceptance check.
    #[error("{transport} rejected: {reason}")]
    TransportRejected { transport: String, reason: String },

    /// Every transport in the chain was rejected for this feed.
    #[error("feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    /// A raw item could not be decoded into the expected shape.
    #[error("malformed item #{index}: {reason}")]
    MalformedItem { index: usize, reason: String },
}

impl FeedError {
    pub fn rejected(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransportRejected {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::FeedUnavailable {
            reason: reason.into(),
        }
    }
}
