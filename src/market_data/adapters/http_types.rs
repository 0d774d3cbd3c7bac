// Source: GET {base}/api/orderbook/{symbol}/{quote}/{exchange}
// Levels may be strings or JSON numbers, and a whole side may arrive as a
// JSON-encoded string of the level array.

use tracing::warn;

use crate::market_data::adapters::SourceError;
use crate::market_data::normaliser::RawSnapshot;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Text(String),
    Number(serde_json::Number),
}

impl WireNumber {
    pub fn into_string(self) -> String {
        match self {
            WireNumber::Text(s) => s,
            WireNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum WireSide {
    Levels(Vec<Vec<WireNumber>>),
    Encoded(String),
}

impl WireSide {
    // Each level keeps [price, size]; trailing fields (order counts etc.) are ignored.
    pub fn into_levels(self) -> Result<Vec<[String; 2]>, SourceError> {
        let levels = match self {
            WireSide::Levels(levels) => levels,
            WireSide::Encoded(text) => serde_json::from_str(&text)?,
        };
        Ok(levels
            .into_iter()
            .filter_map(|level| {
                let mut it = level.into_iter();
                match (it.next(), it.next()) {
                    (Some(px), Some(sz)) => Some([px.into_string(), sz.into_string()]),
                    _ => {
                        warn!("Dropping level without price and size");
                        None
                    }
                }
            })
            .collect())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WireOrderBook {
    #[serde(default)]
    pub bids: Option<WireSide>,
    #[serde(default)]
    pub asks: Option<WireSide>,
    #[serde(default)]
    pub timestamp: Option<WireNumber>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WireOrderBook {
    pub fn into_snapshot(self) -> Result<RawSnapshot, SourceError> {
        if let Some(error) = self.error {
            return Err(SourceError::Upstream(error));
        }
        let side = |s: Option<WireSide>| s.map(WireSide::into_levels).transpose().map(Option::unwrap_or_default);
        Ok(RawSnapshot {
            bids: side(self.bids)?,
            asks: side(self.asks)?,
            timestamp: self.timestamp.map(WireNumber::into_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_levels() {
        let raw = r#"{"bids":[["100.0","1.0"]],"asks":[["101.0","2.0"]],"timestamp":"2024-05-01T12:00:00","symbol":"BTC/USDT","exchange":"binance"}"#;
        let book: WireOrderBook = serde_json::from_str(raw).unwrap();
        let snap = book.into_snapshot().unwrap();
        assert_eq!(snap.bids, vec![["100.0".to_string(), "1.0".to_string()]]);
        assert_eq!(snap.timestamp.as_deref(), Some("2024-05-01T12:00:00"));
    }

    #[test]
    fn test_encoded_numeric_levels() {
        let raw = r#"{"bids":"[[100.5, 2.25, 3], [99.5]]","asks":"[[101.5, 3.5]]","timestamp":1714564800000}"#;
        let book: WireOrderBook = serde_json::from_str(raw).unwrap();
        let snap = book.into_snapshot().unwrap();
        assert_eq!(snap.bids, vec![["100.5".to_string(), "2.25".to_string()]]);
        assert_eq!(snap.asks, vec![["101.5".to_string(), "3.5".to_string()]]);
        assert_eq!(snap.timestamp.as_deref(), Some("1714564800000"));
    }

    #[test]
    fn test_error_payload() {
        let raw = r#"{"error":"No data found for BTC/USDT on mexc","symbol":"BTC/USDT","exchange":"mexc"}"#;
        let book: WireOrderBook = serde_json::from_str(raw).unwrap();
        assert!(matches!(book.into_snapshot(), Err(SourceError::Upstream(msg)) if msg.contains("mexc")));
    }

    #[test]
    fn test_missing_sides_are_empty() {
        let book: WireOrderBook = serde_json::from_str("{}").unwrap();
        let snap = book.into_snapshot().unwrap();
        assert!(snap.bids.is_empty() && snap.asks.is_empty());
    }
}
