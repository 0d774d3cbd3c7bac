use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    BID,
    ASK,
}

// One price level as published by a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

// Volume resting in a single price bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bin {
    pub bid_volume: Decimal,
    pub ask_volume: Decimal,
}

impl Bin {
    pub fn volume(&self, side: Side) -> Decimal {
        match side {
            Side::BID => self.bid_volume,
            Side::ASK => self.ask_volume,
        }
    }
}

// Flattened bin handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistogramBin {
    pub price: Decimal,
    pub bid_volume: Decimal,
    pub ask_volume: Decimal,
}

/// Price-bucketed depth around the touch.
///
/// `bins` is keyed by the rounded bucket price, so iteration is ascending.
/// Every configured step between `min_price` and `max_price` has a key,
/// even when both volumes are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub bins: BTreeMap<Decimal, Bin>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub mid_price: Decimal,
    pub relative_tick_size_pct: Decimal,
}

impl Histogram {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn get(&self, price: Decimal) -> Option<&Bin> {
        self.bins.get(&price)
    }

    pub fn to_bins(&self) -> Vec<HistogramBin> {
        self.bins
            .iter()
            .map(|(price, bin)| HistogramBin {
                price: *price,
                bid_volume: bin.bid_volume,
                ask_volume: bin.ask_volume,
            })
            .collect()
    }

    pub fn total_volume(&self, side: Side) -> Decimal {
        self.bins.values().map(|b| b.volume(side)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("no asset profile configured for symbol {symbol}")]
    UnknownAssetProfile { symbol: String },

    #[error("price span needs {bins} bins, limit is {limit}")]
    TooManyBins { bins: u64, limit: usize },
}

pub type AggregationResult<T> = Result<T, AggregationError>;
