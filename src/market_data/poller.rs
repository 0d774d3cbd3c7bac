// Polls a snapshot source on a fixed cadence and publishes the newest depth view.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::market_data::adapters::SnapshotSource;
use crate::market_data::latest::LatestSnapshot;
use crate::market_data::pipeline::{DepthPipeline, DepthView};

/// Spawn the polling loop for one exchange/symbol.
///
/// Each tick fetches in its own task, so a slow response never delays the
/// next poll. Results are tagged with the tick's sequence number and only
/// published if nothing newer has been published already. The loop exits
/// once every receiver of `tx` is dropped.
pub fn spawn_depth_poller<S>(
    source: Arc<S>,
    pipeline: Arc<DepthPipeline>,
    exchange: &str,
    symbol: &str,
    every: Duration,
    tx: watch::Sender<Option<DepthView>>,
) -> tokio::task::JoinHandle<()>
where
    S: SnapshotSource + Send + Sync + 'static,
{
    let exchange = exchange.to_string();
    let symbol = symbol.to_string();
    let tx = Arc::new(tx);
    let gate = Arc::new(Mutex::new(LatestSnapshot::<()>::new()));

    tokio::spawn(async move {
        info!(%exchange, %symbol, interval_ms = every.as_millis() as u64, "Starting depth poller");
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq: u64 = 0;

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                info!(%exchange, %symbol, "No subscribers left, stopping depth poller");
                break;
            }
            seq += 1;

            let (source, pipeline, tx, gate) = (source.clone(), pipeline.clone(), tx.clone(), gate.clone());
            let (exchange, symbol) = (exchange.clone(), symbol.clone());
            tokio::spawn(async move {
                let raw = match source.fetch(&exchange, &symbol).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(seq, %exchange, %symbol, error = %e, "Snapshot fetch failed");
                        return;
                    }
                };
                let view = match pipeline.process(&exchange, &symbol, &raw) {
                    Ok(view) => view,
                    Err(e) => {
                        warn!(seq, %exchange, %symbol, error = %e, "Skipping depth cycle");
                        return;
                    }
                };

                let mut gate = gate.lock();
                if gate.apply_snapshot(seq, ()) {
                    tx.send_replace(Some(view));
                } else {
                    metrics::counter!("depthglobe_snapshots_stale_total").increment(1);
                    debug!(seq, latest = ?gate.seq(), "Discarding stale depth view");
                }
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::histogram::HistogramBuilder;
    use crate::market_data::adapters::SourceError;
    use crate::market_data::normaliser::{Normaliser, RawSnapshot};
    use crate::market_data::profiles::AssetProfiles;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU64, Ordering};

    // First fetch is slow and stale by the time it lands; later fetches are instant.
    struct SlowFirstSource {
        calls: AtomicU64,
    }

    #[async_trait::async_trait]
    impl SnapshotSource for SlowFirstSource {
        async fn fetch(&self, _exchange: &str, _symbol: &str) -> Result<RawSnapshot, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(250)).await;
                return Ok(RawSnapshot::new(&[("1.00", "1")], &[("1.02", "1")]));
            }
            Ok(RawSnapshot::new(&[("2.00", "1")], &[("2.02", "1")]))
        }
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl SnapshotSource for FailingSource {
        async fn fetch(&self, _exchange: &str, _symbol: &str) -> Result<RawSnapshot, SourceError> {
            Err(SourceError::Upstream("down".into()))
        }
    }

    fn pipeline() -> Arc<DepthPipeline> {
        Arc::new(DepthPipeline::new(AssetProfiles::defaults(), Normaliser::default(), HistogramBuilder::default()))
    }

    #[tokio::test]
    async fn test_stale_result_never_overwrites_newer() {
        let source = Arc::new(SlowFirstSource { calls: AtomicU64::new(0) });
        let (tx, rx) = watch::channel(None);
        let handle = spawn_depth_poller(source, pipeline(), "binance", "BTC", Duration::from_millis(20), tx);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let mid = rx.borrow().as_ref().map(|v| v.histogram.mid_price);
        assert_eq!(mid, Some(dec!(2.01)));

        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failures_publish_nothing() {
        let (tx, rx) = watch::channel(None);
        let handle = spawn_depth_poller(Arc::new(FailingSource), pipeline(), "kraken", "ETH", Duration::from_millis(10), tx);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.borrow().is_none());
        handle.abort();
    }
}
