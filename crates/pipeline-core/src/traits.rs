use crate::error::PipelineError;
use crate::types::{
    CompanyProfile, FinancialRatios, FinancialStatement, FundamentalsSummary, Interval, NewsItem,
    PriceBar, RawArticle, RawBar, StatementBundle, StorageStats, UpsertCounts,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Price-history capability of a market data provider.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Fetch OHLCV bars for `symbol` covering `period` (e.g. "30d") at the
    /// given interval. An empty result is a valid outcome, not an error.
    async fn fetch_price_history(
        &self,
        symbol: &str,
        period: &str,
        interval: Interval,
    ) -> Result<Vec<RawBar>, PipelineError>;
}

/// Article-search capability of a news provider.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch one page of articles matching `query` published since `since`.
    async fn fetch_news(
        &self,
        query: &str,
        language: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawArticle>, PipelineError>;
}

/// Fundamentals capability: company profile, statements and key ratios.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Whether this provider can serve the symbol at all (e.g. listings on
    /// non-primary exchanges are commonly unsupported).
    fn supports_symbol(&self, symbol: &str) -> bool;

    /// `Ok(None)` means the provider has no data for the symbol.
    async fn fetch_company_overview(
        &self,
        symbol: &str,
    ) -> Result<Option<CompanyProfile>, PipelineError>;

    async fn fetch_statements(&self, symbol: &str) -> Result<StatementBundle, PipelineError>;

    /// `Ok(None)` means the provider has no data for the symbol.
    async fn fetch_key_ratios(
        &self,
        symbol: &str,
    ) -> Result<Option<FinancialRatios>, PipelineError>;
}

/// Persistence contract consumed by all collectors. Every write runs in its
/// own transaction: a failure rolls back that operation only.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Insert-or-update keyed by (symbol, timestamp, interval); existing rows
    /// are overwritten in place.
    async fn upsert_price_bars(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[PriceBar],
    ) -> Result<UpsertCounts, PipelineError>;

    /// Most-recent-first.
    async fn get_price_bars(
        &self,
        symbol: &str,
        interval: Interval,
        limit: i64,
    ) -> Result<Vec<PriceBar>, PipelineError>;

    /// Insert-or-replace keyed by symbol; all fields overwritten on conflict.
    async fn upsert_company_profile(&self, profile: &CompanyProfile)
        -> Result<(), PipelineError>;

    /// Insert, or silently keep the existing row on
    /// (symbol, date, period) conflict.
    async fn insert_financial_statement(
        &self,
        statement: &FinancialStatement,
    ) -> Result<(), PipelineError>;

    /// Same conflict policy as statements.
    async fn insert_financial_ratios(&self, ratios: &FinancialRatios)
        -> Result<(), PipelineError>;

    /// Always inserts; news has no conflict key.
    async fn create_news_item(&self, item: &NewsItem) -> Result<(), PipelineError>;

    /// Ordered by published_at descending, optionally restricted to items
    /// tagged with `symbol`.
    async fn get_latest_news(
        &self,
        symbol: Option<&str>,
        limit: i64,
    ) -> Result<Vec<NewsItem>, PipelineError>;

    /// Latest joined profile/income/ratio snapshot, or `None` when the
    /// symbol has no stored fundamentals.
    async fn get_fundamentals_summary(
        &self,
        symbol: &str,
    ) -> Result<Option<FundamentalsSummary>, PipelineError>;

    async fn get_stats(&self) -> Result<StorageStats, PipelineError>;
}
