//! Depth chart layout for renderers.
//!
//! Drawing itself belongs to whoever consumes a [`DepthView`]; this module
//! only turns a histogram into log-scaled bars and provides a plain-text
//! renderer for terminals.

use std::fmt::Write as _;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::engine::types::{Histogram, Side};
use crate::market_data::pipeline::DepthView;

/// Roughly this many price labels are shown along the axis.
pub const TARGET_LABELS: usize = 20;

pub trait DepthRenderer {
    type Output;

    fn render(&mut self, view: &DepthView) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthBar {
    pub index: usize,
    pub price: Decimal,
    pub side: Side,
    pub volume: Decimal,
    /// `log10(volume + 1)` relative to the tallest bar, in `[0, 1]`.
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthBars {
    pub bars: Vec<DepthBar>,
    pub bin_count: usize,
    pub max_log_volume: f64,
    pub label_every: usize,
}

fn log_volume(volume: Decimal) -> f64 {
    (volume.to_f64().unwrap_or(0.0) + 1.0).log10()
}

impl DepthBars {
    /// Bids are drawn at or below mid, asks at or above it.
    pub fn layout(histogram: &Histogram) -> Self {
        let max_log_volume = histogram
            .bins
            .values()
            .map(|b| log_volume(b.bid_volume).max(log_volume(b.ask_volume)))
            .fold(0.0_f64, f64::max);
        let scale = |v: Decimal| {
            if max_log_volume > 0.0 {
                log_volume(v) / max_log_volume
            } else {
                0.0
            }
        };

        let mid = histogram.mid_price;
        let mut bars = Vec::new();
        for (index, (price, bin)) in histogram.bins.iter().enumerate() {
            if *price <= mid && bin.bid_volume > Decimal::ZERO {
                bars.push(DepthBar { index, price: *price, side: Side::BID, volume: bin.bid_volume, height: scale(bin.bid_volume) });
            }
            if *price >= mid && bin.ask_volume > Decimal::ZERO {
                bars.push(DepthBar { index, price: *price, side: Side::ASK, volume: bin.ask_volume, height: scale(bin.ask_volume) });
            }
        }

        let bin_count = histogram.len();
        Self {
            bars,
            bin_count,
            max_log_volume,
            label_every: bin_count.div_ceil(TARGET_LABELS).max(1),
        }
    }
}

/// One row per non-empty bin, `#` for bids and `=` for asks.
pub struct TextDepthRenderer {
    pub width: usize,
}

impl Default for TextDepthRenderer {
    fn default() -> Self {
        Self { width: 40 }
    }
}

impl DepthRenderer for TextDepthRenderer {
    type Output = String;

    fn render(&mut self, view: &DepthView) -> String {
        let hist = &view.histogram;
        let layout = DepthBars::layout(hist);
        let mut out = String::new();

        let _ = writeln!(out, "{} {} | {} bins | mid {}", view.exchange, view.symbol, layout.bin_count, hist.mid_price);
        let rel = hist.relative_tick_size_pct.round_dp(6);
        let _ = writeln!(out, "Relative Tick Size: {rel}% | observed tick {}", view.tick_size);
        for bar in &layout.bars {
            let len = (bar.height * self.width as f64).round() as usize;
            let glyph = match bar.side {
                Side::BID => "#",
                Side::ASK => "=",
            };
            let _ = writeln!(out, "{:>14} | {:<width$} {}", bar.price, glyph.repeat(len.max(1)), bar.volume, width = self.width);
        }
        out
    }
}
