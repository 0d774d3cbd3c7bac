// Shared trait + errors for snapshot sources

use thiserror::Error;

use crate::market_data::normaliser::RawSnapshot;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream error: {0}")]
    Upstream(String),
}

#[async_trait::async_trait]
pub trait SnapshotSource {
    // One full depth snapshot for `symbol` on `exchange`. Retry/backoff is the caller's call.
    async fn fetch(&self, exchange: &str, symbol: &str) -> Result<RawSnapshot, SourceError>;
}

pub mod http;
pub mod http_types;
