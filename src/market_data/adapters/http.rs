// HTTP snapshot source for the order-book logging backend

use std::time::Duration;

use tracing::{debug, instrument};

use super::http_types::WireOrderBook;
use super::{SnapshotSource, SourceError};
use crate::market_data::normaliser::RawSnapshot;
use crate::market_data::profiles::normalise_symbol;

pub struct HttpSnapshotSource {
    pub base_url: String, // e.g. "http://127.0.0.1:5000"
    pub quote: String,    // e.g. "USDT"
    client: reqwest::Client,
}

impl HttpSnapshotSource {
    pub fn new(base_url: &str, quote: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            quote: quote.to_ascii_uppercase(),
            client,
        })
    }

    pub fn url_for(&self, exchange: &str, symbol: &str) -> String {
        format!(
            "{}/api/orderbook/{}/{}/{}",
            self.base_url,
            normalise_symbol(symbol),
            self.quote,
            exchange.to_ascii_lowercase()
        )
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, exchange: &str, symbol: &str) -> Result<RawSnapshot, SourceError> {
        let url = self.url_for(exchange, symbol);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(%status, bytes = body.len(), "Fetched order book");

        // Error responses still carry a JSON body with an `error` field.
        match serde_json::from_str::<WireOrderBook>(&body) {
            Ok(book) if status.is_success() || book.error.is_some() => book.into_snapshot(),
            Ok(_) => Err(SourceError::Upstream(format!("{url} returned {status}"))),
            Err(_) if !status.is_success() => Err(SourceError::Upstream(format!("{url} returned {status}"))),
            Err(e) => Err(e.into()),
        }
    }
}
