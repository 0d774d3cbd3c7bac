use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, instrument, trace, warn};

use crate::engine::types::{AggregationError, AggregationResult, Bin, Histogram, PriceLevel, Side};
use crate::market_data::profiles::{AssetProfile, AssetProfiles};

pub const DEFAULT_MAX_BINS: usize = 100_000;

/// Highest bid price with non-zero size.
pub fn best_bid(bids: &[PriceLevel]) -> Option<Decimal> {
    bids.iter().filter(|l| l.size > Decimal::ZERO).map(|l| l.price).max()
}

/// Lowest ask price with non-zero size.
pub fn best_ask(asks: &[PriceLevel]) -> Option<Decimal> {
    asks.iter().filter(|l| l.size > Decimal::ZERO).map(|l| l.price).min()
}

/// Round half away from zero at the profile precision.
pub fn round_price(price: Decimal, decimals: u32) -> Decimal {
    price.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Buckets both sides of a snapshot into fixed-width price bins.
///
/// Stateless: one builder can be shared across threads and every call is
/// independent of the previous one.
#[derive(Debug, Clone)]
pub struct HistogramBuilder {
    max_bins: usize,
}

impl Default for HistogramBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINS)
    }
}

impl HistogramBuilder {
    pub fn new(max_bins: usize) -> Self {
        Self { max_bins }
    }

    /// Look up the symbol's profile and build. Unknown symbols are rejected.
    pub fn build_for_symbol(
        &self,
        profiles: &AssetProfiles,
        symbol: &str,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> AggregationResult<Histogram> {
        let profile = profiles.get(symbol)?;
        self.build(profile, bids, asks)
    }

    #[instrument(level = "debug", skip_all, fields(bids = bids.len(), asks = asks.len(), tick = %profile.tick_size))]
    pub fn build(
        &self,
        profile: &AssetProfile,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> AggregationResult<Histogram> {
        let best_bid = best_bid(bids);
        let best_ask = best_ask(asks);

        let mid_price = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => bid
                .checked_add(ask)
                .map(|sum| sum / Decimal::TWO)
                .ok_or_else(|| AggregationError::InsufficientData(format!("mid of {bid} and {ask} overflows")))?,
            (Some(only), None) | (None, Some(only)) => {
                debug!(price = %only, "One-sided book, using the available touch as mid");
                only
            }
            (None, None) => {
                return Err(AggregationError::InsufficientData(
                    "no bid or ask level with non-zero size".into(),
                ))
            }
        };

        // Span is taken over every supplied level, live or not.
        let lowest_bid = bids.iter().map(|l| l.price).min();
        let highest_ask = asks.iter().map(|l| l.price).max();
        let (low, high) = match (lowest_bid, highest_ask) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, bids.iter().map(|l| l.price).max().unwrap_or(lo)),
            (None, Some(hi)) => (asks.iter().map(|l| l.price).min().unwrap_or(hi), hi),
            (None, None) => {
                return Err(AggregationError::InsufficientData("empty snapshot".into()))
            }
        };
        let (Some(min_price), Some(max_price)) = (low.checked_sub(profile.padding), high.checked_add(profile.padding)) else {
            return Err(AggregationError::InsufficientData(format!("padded span around [{low}, {high}] overflows")));
        };
        if min_price > max_price {
            return Err(AggregationError::InsufficientData(format!(
                "empty price span [{min_price}, {max_price}]"
            )));
        }

        let bins = self.generate_bins(profile, min_price, max_price)?;
        let mut histogram = Histogram {
            bins,
            min_price,
            max_price,
            best_bid,
            best_ask,
            mid_price,
            relative_tick_size_pct: relative_tick_size_pct(profile.tick_size, mid_price)?,
        };

        let dropped = assign(&mut histogram.bins, Side::BID, bids, profile.decimals)
            + assign(&mut histogram.bins, Side::ASK, asks, profile.decimals);
        if dropped > 0 {
            metrics::counter!("depthglobe_levels_dropped_total").increment(dropped as u64);
        }

        debug!(
            bins = histogram.len(),
            dropped,
            %min_price,
            %max_price,
            %mid_price,
            "Built depth histogram"
        );
        Ok(histogram)
    }

    fn generate_bins(
        &self,
        profile: &AssetProfile,
        min_price: Decimal,
        max_price: Decimal,
    ) -> AggregationResult<BTreeMap<Decimal, Bin>> {
        // Spans too wide for Decimal count as too many bins.
        let steps = max_price
            .checked_sub(min_price)
            .and_then(|span| span.checked_div(profile.tick_size))
            .and_then(|s| s.floor().to_u64())
            .map(|s| s.saturating_add(1))
            .unwrap_or(u64::MAX);
        if steps > self.max_bins as u64 {
            warn!(steps, limit = self.max_bins, "Refusing to build oversized histogram");
            return Err(AggregationError::TooManyBins { bins: steps, limit: self.max_bins });
        }

        let mut bins = BTreeMap::new();
        let mut price = min_price;
        while price <= max_price {
            // Distinct steps may round onto the same key; they collapse into one bin.
            bins.insert(round_price(price, profile.decimals), Bin::default());
            match price.checked_add(profile.tick_size) {
                Some(next) => price = next,
                None => break,
            }
        }
        Ok(bins)
    }
}

/// Configured tick as a percentage of mid. Display only.
pub fn relative_tick_size_pct(tick_size: Decimal, mid_price: Decimal) -> AggregationResult<Decimal> {
    tick_size
        .checked_div(mid_price)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| AggregationError::InsufficientData(format!("relative tick undefined at mid {mid_price}")))
}

// Set (not accumulate) each level's size on its bin. Returns the number of
// levels that fell outside the generated range.
fn assign(bins: &mut BTreeMap<Decimal, Bin>, side: Side, levels: &[PriceLevel], decimals: u32) -> usize {
    let mut dropped = 0;
    for level in levels {
        let key = round_price(level.price, decimals);
        match bins.get_mut(&key) {
            Some(bin) => match side {
                Side::BID => bin.bid_volume = level.size,
                Side::ASK => bin.ask_volume = level.size,
            },
            None => {
                trace!(?side, price = %level.price, "Level outside histogram range");
                dropped += 1;
            }
        }
    }
    dropped
}
