// Convert wire strings into decimal price levels.
// Prices and sizes arrive as strings so nothing is lost to binary floats.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::engine::types::{PriceLevel, Side};

pub const DEFAULT_MAX_LEVELS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid decimal {0:?}")]
    InvalidDecimal(String),

    #[error("negative size {0}")]
    NegativeSize(Decimal),

    #[error("non-positive price {0}")]
    NonPositivePrice(Decimal),
}

// Snapshot as handed over by a collaborator: [[price, size], ...]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawSnapshot {
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawSnapshot {
    pub fn new(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> Self {
        let side = |levels: &[(&str, &str)]| {
            levels.iter().map(|(p, s)| [p.to_string(), s.to_string()]).collect()
        };
        Self { bids: side(bids), asks: side(asks), timestamp: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalisedSnapshot {
    pub bids: Vec<PriceLevel>, // best first
    pub asks: Vec<PriceLevel>, // best first
    pub timestamp: Option<String>,
    pub skipped: usize,
}

pub struct Normaliser {
    pub max_levels: usize, // per side, applied after sorting best-first
}

impl Default for Normaliser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVELS)
    }
}

impl Normaliser {
    pub fn new(max_levels: usize) -> Self {
        Self { max_levels }
    }

    pub fn parse_price(&self, s: &str) -> Result<Decimal, ParseError> {
        let price = parse_decimal(s)?;
        if price <= Decimal::ZERO {
            return Err(ParseError::NonPositivePrice(price));
        }
        Ok(price)
    }

    pub fn parse_size(&self, s: &str) -> Result<Decimal, ParseError> {
        let size = parse_decimal(s)?;
        if size < Decimal::ZERO {
            return Err(ParseError::NegativeSize(size));
        }
        Ok(size)
    }

    pub fn level(&self, raw: &[String; 2]) -> Result<PriceLevel, ParseError> {
        Ok(PriceLevel::new(self.parse_price(&raw[0])?, self.parse_size(&raw[1])?))
    }

    // Malformed levels are skipped and counted, the rest of the side survives.
    pub fn norm_side(&self, side: Side, levels: &[[String; 2]]) -> (Vec<PriceLevel>, usize) {
        let mut skipped = 0;
        let mut parsed: Vec<PriceLevel> = levels
            .iter()
            .filter_map(|raw| match self.level(raw) {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!(?side, error = %e, "Skipping malformed level");
                    skipped += 1;
                    None
                }
            })
            .collect();

        match side {
            Side::BID => parsed.sort_by(|a, b| b.price.cmp(&a.price)),
            Side::ASK => parsed.sort_by(|a, b| a.price.cmp(&b.price)),
        }
        parsed.truncate(self.max_levels);
        (parsed, skipped)
    }

    pub fn normalise(&self, raw: &RawSnapshot) -> NormalisedSnapshot {
        let (bids, bid_skipped) = self.norm_side(Side::BID, &raw.bids);
        let (asks, ask_skipped) = self.norm_side(Side::ASK, &raw.asks);
        NormalisedSnapshot {
            bids,
            asks,
            timestamp: raw.timestamp.clone(),
            skipped: bid_skipped + ask_skipped,
        }
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, ParseError> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ParseError::InvalidDecimal(s.to_string()))
}
