// Tick size inference from a raw depth snapshot.

use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::{instrument, trace};

use crate::engine::histogram::{best_ask, best_bid};
use crate::engine::types::{AggregationError, AggregationResult, PriceLevel};

/// Spread narrower than this many ticks is considered dense.
pub const DENSE_SPREAD_TICKS: Decimal = Decimal::TEN;

/// Smallest strictly positive gap between adjacent prices once sorted.
///
/// Duplicates contribute nothing. Returns `None` when fewer than two distinct
/// prices are present.
pub fn estimate_tick_size<I>(prices: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut sorted: Vec<Decimal> = prices.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .tuple_windows()
        .filter_map(|(lo, hi)| hi.checked_sub(*lo))
        .filter(|gap| *gap > Decimal::ZERO)
        .min()
}

/// Tick size over the union of both sides of the book.
#[instrument(level = "trace", skip_all, fields(bids = bids.len(), asks = asks.len()))]
pub fn estimate_from_levels(bids: &[PriceLevel], asks: &[PriceLevel]) -> AggregationResult<Decimal> {
    let prices = bids.iter().chain(asks.iter()).map(|lvl| lvl.price);
    match estimate_tick_size(prices) {
        Some(tick) => {
            trace!(%tick, "Estimated tick size");
            Ok(tick)
        }
        None => Err(AggregationError::InsufficientData(
            "fewer than 2 distinct prices in snapshot".into(),
        )),
    }
}

/// True when the touch spread spans fewer than `DENSE_SPREAD_TICKS` ticks.
/// `None` if either side has no live level or the tick is not positive.
pub fn is_dense(bids: &[PriceLevel], asks: &[PriceLevel], tick: Decimal) -> Option<bool> {
    if tick <= Decimal::ZERO {
        return None;
    }
    let spread = best_ask(asks)?.checked_sub(best_bid(bids)?)?;
    let ticks = spread.checked_div(tick)?;
    Some(ticks < DENSE_SPREAD_TICKS)
}
