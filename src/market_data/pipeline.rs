//! Snapshot → tick size → histogram.
//!
//! Every call starts from scratch; nothing is carried over from the previous
//! snapshot, so one pipeline can be shared by any number of callers.

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::engine::histogram::HistogramBuilder;
use crate::engine::tick::{estimate_from_levels, is_dense};
use crate::engine::types::{AggregationResult, Histogram};
use crate::market_data::normaliser::{Normaliser, RawSnapshot};
use crate::market_data::profiles::{normalise_symbol, AssetProfiles};

/// Everything a depth renderer needs for one exchange/symbol snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthView {
    pub exchange: String,
    pub symbol: String,
    pub histogram: Histogram,
    /// Observed tick, or the configured one when the snapshot had too few prices.
    pub tick_size: Decimal,
    pub tick_estimated: bool,
    pub dense: Option<bool>,
    pub timestamp: Option<String>,
    pub skipped_levels: usize,
}

pub struct DepthPipeline {
    profiles: AssetProfiles,
    normaliser: Normaliser,
    builder: HistogramBuilder,
}

impl DepthPipeline {
    pub fn new(profiles: AssetProfiles, normaliser: Normaliser, builder: HistogramBuilder) -> Self {
        Self { profiles, normaliser, builder }
    }

    pub fn profiles(&self) -> &AssetProfiles {
        &self.profiles
    }

    #[instrument(level = "debug", skip(self, raw), fields(bids = raw.bids.len(), asks = raw.asks.len()))]
    pub fn process(&self, exchange: &str, symbol: &str, raw: &RawSnapshot) -> AggregationResult<DepthView> {
        let profile = self.profiles.get(symbol)?;
        let snap = self.normaliser.normalise(raw);

        let (tick_size, tick_estimated) = match estimate_from_levels(&snap.bids, &snap.asks) {
            Ok(tick) => (tick, true),
            Err(e) => {
                debug!(error = %e, fallback = %profile.tick_size, "Using configured tick size");
                (profile.tick_size, false)
            }
        };

        let histogram = self.builder.build(profile, &snap.bids, &snap.asks)?;
        let dense = is_dense(&snap.bids, &snap.asks, tick_size);
        metrics::counter!("depthglobe_snapshots_total").increment(1);

        Ok(DepthView {
            exchange: exchange.to_string(),
            symbol: normalise_symbol(symbol),
            histogram,
            tick_size,
            tick_estimated,
            dense,
            timestamp: snap.timestamp,
            skipped_levels: snap.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::AggregationError;
    use rust_decimal_macros::dec;

    fn pipeline() -> DepthPipeline {
        DepthPipeline::new(AssetProfiles::defaults(), Normaliser::default(), HistogramBuilder::default())
    }

    #[test]
    fn test_process_snapshot() {
        let raw = RawSnapshot::new(
            &[("100.00", "2"), ("99.99", "1")],
            &[("100.02", "1"), ("100.05", "3")],
        );
        let view = pipeline().process("binance", "BTC/USDT", &raw).unwrap();
        assert_eq!(view.symbol, "BTC");
        assert_eq!(view.tick_size, dec!(0.01));
        assert!(view.tick_estimated);
        assert_eq!(view.dense, Some(true));
        assert_eq!(view.histogram.len(), 9);
        assert_eq!(view.histogram.mid_price, dec!(100.01));
    }

    #[test]
    fn test_tick_falls_back_to_profile() {
        let raw = RawSnapshot::new(&[("2.5000", "10")], &[("2.5000", "0"), ("2.5002", "4")]);
        let view = pipeline().process("kraken", "XRP", &raw).unwrap();
        assert_eq!(view.tick_size, dec!(0.0002));

        let raw = RawSnapshot::new(&[("2.5000", "10")], &[]);
        let view = pipeline().process("kraken", "XRP", &raw).unwrap();
        assert!(!view.tick_estimated);
        assert_eq!(view.tick_size, dec!(0.0001));
        assert_eq!(view.dense, None);
    }

    #[test]
    fn test_unknown_symbol_rejected_before_parsing() {
        let raw = RawSnapshot::new(&[("1", "1")], &[("2", "1")]);
        let err = pipeline().process("okx", "DOGE", &raw).unwrap_err();
        assert_eq!(err, AggregationError::UnknownAssetProfile { symbol: "DOGE".into() });
    }

    #[test]
    fn test_huge_ask_skips_cycle() {
        let raw = RawSnapshot::new(&[("1", "1")], &[("1e25", "1")]);
        let err = pipeline().process("binance", "SOL", &raw).unwrap_err();
        assert!(matches!(err, AggregationError::TooManyBins { .. }));
    }

    #[test]
    fn test_empty_snapshot() {
        let err = pipeline().process("okx", "ETH", &RawSnapshot::default()).unwrap_err();
        assert!(matches!(err, AggregationError::InsufficientData(_)));
    }
}
