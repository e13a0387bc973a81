use crate::retry::Retrier;
use pipeline_core::{
    Interval, PipelineConfig, PipelineError, PriceBar, PriceHistoryProvider, RawBar, StoragePort,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collects OHLCV history per symbol: fetch through the retrier, validate,
/// attach indicators, upsert.
pub struct MarketDataCollector {
    provider: Arc<dyn PriceHistoryProvider>,
    store: Arc<dyn StoragePort>,
    retrier: Retrier,
    sma_window: usize,
    rsi_window: usize,
}

impl MarketDataCollector {
    pub fn new(
        provider: Arc<dyn PriceHistoryProvider>,
        store: Arc<dyn StoragePort>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            retrier: Retrier::from_config(config),
            sma_window: config.sma_window,
            rsi_window: config.rsi_window,
        }
    }

    /// Collect one symbol. Failures are logged and reported as `false`;
    /// an empty feed is a valid "no data" outcome, also `false`.
    pub async fn collect(&self, symbol: &str, period: &str, interval: Interval) -> bool {
        tracing::info!(
            "Collecting data for {} - period: {}, interval: {}",
            symbol,
            period,
            interval
        );

        let raw = match self
            .retrier
            .execute(symbol, || {
                self.provider.fetch_price_history(symbol, period, interval)
            })
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!("Failed to collect data for {}: {}", symbol, err);
                return false;
            }
        };

        if raw.is_empty() {
            tracing::warn!("No data returned for {}", symbol);
            return false;
        }

        if let Err(err) = validate_bars(symbol, &raw) {
            tracing::error!("{}", err);
            return false;
        }

        let bars = match self.enrich(symbol, interval, &raw) {
            Ok(bars) => bars,
            Err(err) => {
                tracing::error!("Indicator computation failed for {}: {}", symbol, err);
                return false;
            }
        };

        match self.store.upsert_price_bars(symbol, interval, &bars).await {
            Ok(counts) => {
                tracing::info!(
                    "Successfully collected {} records for {} ({} new, {} updated)",
                    bars.len(),
                    symbol,
                    counts.inserted,
                    counts.updated
                );
                true
            }
            Err(err) => {
                tracing::error!("Failed to store bars for {}: {}", symbol, err);
                false
            }
        }
    }

    /// Attach SMA and RSI columns to the validated feed.
    fn enrich(
        &self,
        symbol: &str,
        interval: Interval,
        raw: &[RawBar],
    ) -> Result<Vec<PriceBar>, PipelineError> {
        let closes: Vec<Option<f64>> = raw.iter().map(|bar| bar.close).collect();
        let sma = indicators::sma(&closes, self.sma_window)?;
        let rsi = indicators::rsi(&closes, self.rsi_window)?;

        Ok(raw
            .iter()
            .enumerate()
            .map(|(i, bar)| PriceBar {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
                interval,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                sma: sma[i],
                rsi: rsi[i],
            })
            .collect())
    }

    /// Collect many symbols sequentially with a rate-limit pause between
    /// them. Returns per-symbol success.
    pub async fn collect_multiple(
        &self,
        symbols: &[String],
        period: &str,
        interval: Interval,
    ) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        tracing::info!("Starting collection for {} symbols", symbols.len());

        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            let success = self.collect(&symbol, period, interval).await;
            results.insert(symbol, success);

            self.retrier.pause().await;
        }

        let successful = results.values().filter(|ok| **ok).count();
        tracing::info!(
            "Collection completed: {}/{} successful",
            successful,
            results.len()
        );

        results
    }
}

/// Structural checks on a fetched feed. High < low anywhere is a hard
/// failure; suspicious values only warn.
fn validate_bars(symbol: &str, bars: &[RawBar]) -> Result<(), PipelineError> {
    // A column where every row is missing means the source never sent it
    let columns: [(&str, fn(&RawBar) -> bool); 5] = [
        ("open", |bar| bar.open.is_some()),
        ("high", |bar| bar.high.is_some()),
        ("low", |bar| bar.low.is_some()),
        ("close", |bar| bar.close.is_some()),
        ("volume", |bar| bar.volume.is_some()),
    ];
    for (name, present) in columns {
        if !bars.iter().any(present) {
            return Err(PipelineError::Validation(format!(
                "{}: missing required column '{}'",
                symbol, name
            )));
        }
    }

    for bar in bars {
        if let (Some(high), Some(low)) = (bar.high, bar.low) {
            if high < low {
                return Err(PipelineError::Validation(format!(
                    "{}: found high < low at {}",
                    symbol, bar.timestamp
                )));
            }
        }
    }

    let has_non_positive = bars.iter().any(|bar| {
        [bar.open, bar.high, bar.low, bar.close]
            .iter()
            .flatten()
            .any(|price| *price <= 0.0)
    });
    if has_non_positive {
        tracing::warn!("Found non-positive prices for {}", symbol);
    }

    let mut outliers = 0usize;
    let mut previous_close: Option<f64> = None;
    for bar in bars {
        if let (Some(prev), Some(cur)) = (previous_close, bar.close) {
            if prev != 0.0 && ((cur - prev) / prev).abs() > 0.5 {
                outliers += 1;
            }
        }
        if bar.close.is_some() {
            previous_close = bar.close;
        }
    }
    if outliers > 0 {
        tracing::warn!("Found {} potential outliers for {}", outliers, symbol);
    }

    tracing::debug!("Data validation passed for {}", symbol);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use market_store::SqliteStore;
    use pipeline_core::PipelineConfig;
    use std::sync::Mutex;

    struct FixedFeed {
        bars: Mutex<Vec<RawBar>>,
    }

    impl FixedFeed {
        fn new(bars: Vec<RawBar>) -> Self {
            Self {
                bars: Mutex::new(bars),
            }
        }
    }

    #[async_trait]
    impl PriceHistoryProvider for FixedFeed {
        async fn fetch_price_history(
            &self,
            _symbol: &str,
            _period: &str,
            _interval: Interval,
        ) -> Result<Vec<RawBar>, PipelineError> {
            Ok(self.bars.lock().unwrap().clone())
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            database_url: "sqlite::memory:".to_string(),
            symbols: vec!["AAPL".to_string()],
            default_interval: Interval::OneDay,
            history_period: "30d".to_string(),
            request_delay_ms: 0,
            max_retries: 1,
            backoff_base_ms: 0,
            sma_window: 3,
            rsi_window: 3,
            news: pipeline_core::NewsConfig {
                api_key: None,
                language: "en".to_string(),
                lookback_hours: 24,
            },
            fundamentals: pipeline_core::FundamentalsConfig {
                enabled: false,
                api_key: None,
            },
        }
    }

    fn raw_bar(day: u32, low: f64, high: f64, close: f64) -> RawBar {
        RawBar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: Some(close),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(10_000),
        }
    }

    fn clean_feed() -> Vec<RawBar> {
        (1..=6)
            .map(|day| {
                let close = 100.0 + day as f64;
                raw_bar(day, close - 1.0, close + 1.0, close)
            })
            .collect()
    }

    #[tokio::test]
    async fn a_high_below_low_blocks_the_write_entirely() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let mut feed = clean_feed();
        feed[2].high = Some(50.0);
        feed[2].low = Some(90.0);

        let collector = MarketDataCollector::new(
            Arc::new(FixedFeed::new(feed)),
            store.clone(),
            &test_config(),
        );

        assert!(!collector.collect("AAPL", "30d", Interval::OneDay).await);

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_price_records, 0);
    }

    #[tokio::test]
    async fn an_empty_feed_reports_failure_without_writing() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = MarketDataCollector::new(
            Arc::new(FixedFeed::new(Vec::new())),
            store.clone(),
            &test_config(),
        );

        assert!(!collector.collect("AAPL", "30d", Interval::OneDay).await);
        assert_eq!(store.get_stats().await.unwrap().total_price_records, 0);
    }

    #[tokio::test]
    async fn a_clean_feed_lands_with_indicator_columns() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = MarketDataCollector::new(
            Arc::new(FixedFeed::new(clean_feed())),
            store.clone(),
            &test_config(),
        );

        assert!(collector.collect("AAPL", "30d", Interval::OneDay).await);

        let bars = store
            .get_price_bars("AAPL", Interval::OneDay, 10)
            .await
            .unwrap();
        assert_eq!(bars.len(), 6);
        // Most recent first; the newest bar has both indicators populated
        assert!(bars[0].sma.is_some());
        assert!(bars[0].rsi.is_some());
        // The oldest predates both windows
        assert!(bars[5].sma.is_none());
        assert!(bars[5].rsi.is_none());
    }

    #[tokio::test]
    async fn refetching_updates_rows_in_place() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let provider = Arc::new(FixedFeed::new(clean_feed()));
        let collector =
            MarketDataCollector::new(provider.clone(), store.clone(), &test_config());

        assert!(collector.collect("AAPL", "30d", Interval::OneDay).await);

        // Same timestamps, new closes
        let mut updated = clean_feed();
        for bar in &mut updated {
            bar.close = bar.close.map(|c| c + 0.5);
        }
        *provider.bars.lock().unwrap() = updated;

        assert!(collector.collect("AAPL", "30d", Interval::OneDay).await);

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_price_records, 6);

        let bars = store
            .get_price_bars("AAPL", Interval::OneDay, 1)
            .await
            .unwrap();
        assert_eq!(bars[0].close, Some(106.5));
    }

    #[tokio::test]
    async fn collect_multiple_reports_each_symbol() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = MarketDataCollector::new(
            Arc::new(FixedFeed::new(clean_feed())),
            store.clone(),
            &test_config(),
        );

        let symbols = vec!["aapl".to_string(), " msft ".to_string()];
        let results = collector
            .collect_multiple(&symbols, "30d", Interval::OneDay)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("AAPL"), Some(&true));
        assert_eq!(results.get("MSFT"), Some(&true));
    }
}
