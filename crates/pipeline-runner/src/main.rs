//! pipeline-runner: one-shot batch collection of prices, news and
//! fundamentals for the configured symbols.
//!
//! The run is strictly sequential: market data for every symbol, then news,
//! then fundamentals, then a short report. Collection steps whose API key is
//! missing are skipped with a warning; anything that escapes the sequence
//! ends the process with a non-zero status.

use data_collectors::{FundamentalsCollector, MarketDataCollector, NewsCollector};
use health_score::HealthScorer;
use market_providers::{AlphaVantageClient, NewsApiClient, YahooChartClient};
use market_store::SqliteStore;
use pipeline_core::{PipelineConfig, StoragePort};
use std::sync::Arc;

async fn run() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env()?;

    // The SQLite file may live in a directory that does not exist yet
    if let Some(path) = config.database_url.strip_prefix("sqlite:") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    tracing::info!("==============================================");
    tracing::info!("MARKET PIPELINE - STARTING");
    tracing::info!("==============================================");

    let store = Arc::new(SqliteStore::open(&config.database_url).await?);

    // === Market data ===
    let market = MarketDataCollector::new(
        Arc::new(YahooChartClient::new()),
        store.clone(),
        &config,
    );
    let results = market
        .collect_multiple(
            &config.symbols,
            &config.history_period,
            config.default_interval,
        )
        .await;
    let successful = results.values().filter(|ok| **ok).count();
    tracing::info!("Market data: {}/{} symbols collected", successful, results.len());

    // === News ===
    match config.news.api_key.clone() {
        Some(api_key) => {
            let news = NewsCollector::new(
                Arc::new(NewsApiClient::new(api_key)),
                store.clone(),
                &config,
            );
            let (inserted, fetched) = news.process_and_store().await;
            tracing::info!("News: {}/{} articles inserted", inserted, fetched);
        }
        None => tracing::warn!("NEWSAPI_KEY not configured, skipping news collection"),
    }

    // === Fundamentals ===
    if config.fundamentals.enabled {
        match config.fundamentals.api_key.clone() {
            Some(api_key) => {
                let fundamentals = FundamentalsCollector::new(
                    Arc::new(AlphaVantageClient::new(api_key)),
                    store.clone(),
                    &config,
                );
                let outcomes = fundamentals
                    .collect_multiple_fundamentals(&config.symbols)
                    .await;

                let scorer = HealthScorer::new();
                let ranked = {
                    let collected: Vec<String> = outcomes.keys().cloned().collect();
                    scorer.rank(store.as_ref(), &collected).await
                };
                for score in &ranked {
                    tracing::info!(
                        "Financial health {}: {:.0}/100 {:?}",
                        score.symbol,
                        score.total,
                        score.breakdown
                    );
                }
            }
            None => tracing::warn!(
                "ALPHA_VANTAGE_API_KEY not configured, skipping fundamentals collection"
            ),
        }
    }

    // === Report ===
    let stats = store.get_stats().await?;
    tracing::info!("DATABASE STATS:");
    tracing::info!("Total price records: {}", stats.total_price_records);
    tracing::info!("Unique symbols: {}", stats.unique_symbols);
    tracing::info!(
        "Last update: {}",
        stats
            .last_update
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );

    let latest_news = store.get_latest_news(None, 3).await?;
    if !latest_news.is_empty() {
        tracing::info!("RECENT NEWS:");
        for item in latest_news {
            tracing::info!(
                "[{}] {} ({})",
                item.sentiment_label,
                item.title,
                item.source
            );
        }
    }

    tracing::info!("==============================================");
    tracing::info!("MARKET PIPELINE - FINISHED");
    tracing::info!("==============================================");

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pipeline_runner=info,data_collectors=info,market_store=info,health_score=info"
                    .into()
            }),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!("Critical pipeline failure: {:#}", err);
        std::process::exit(1);
    }
}
