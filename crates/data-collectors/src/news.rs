use chrono::{Duration, Utc};
use pipeline_core::{NewsItem, NewsProvider, PipelineConfig, PipelineError, RawArticle, StoragePort};
use sentiment::SentimentScorer;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Collects recent news: fetch one page, keep articles that mention a
/// configured ticker, tag symbols, score sentiment, insert.
pub struct NewsCollector {
    provider: Arc<dyn NewsProvider>,
    store: Arc<dyn StoragePort>,
    scorer: SentimentScorer,
    symbols: Vec<String>,
    language: String,
    lookback_hours: i64,
}

impl NewsCollector {
    pub fn new(
        provider: Arc<dyn NewsProvider>,
        store: Arc<dyn StoragePort>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            scorer: SentimentScorer::new(),
            symbols: config.symbols.clone(),
            language: config.news.language.clone(),
            lookback_hours: config.news.lookback_hours,
        }
    }

    /// Search query: company names for tickers we know, bare tickers
    /// otherwise, OR-joined and quoted.
    fn build_query(&self) -> String {
        let terms: BTreeSet<String> = self
            .symbols
            .iter()
            .map(|symbol| {
                let base = base_ticker(symbol);
                known_name(base).unwrap_or(base).to_string()
            })
            .collect();

        terms
            .into_iter()
            .map(|term| format!("\"{}\"", term))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// An article is relevant when any configured base ticker appears as a
    /// case-insensitive substring of title+content.
    fn is_relevant(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.symbols
            .iter()
            .any(|symbol| haystack.contains(&base_ticker(symbol).to_lowercase()))
    }

    /// All configured symbols whose base ticker appears in the text,
    /// deduplicated and sorted.
    fn extract_symbols(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let found: BTreeSet<String> = self
            .symbols
            .iter()
            .filter(|symbol| haystack.contains(&base_ticker(symbol).to_lowercase()))
            .cloned()
            .collect();
        found.into_iter().collect()
    }

    /// One page of articles published within the lookback window.
    pub async fn fetch(&self) -> Result<Vec<RawArticle>, PipelineError> {
        let since = Utc::now() - Duration::hours(self.lookback_hours);
        let query = self.build_query();
        tracing::debug!("News query: {}", query);
        self.provider.fetch_news(&query, &self.language, since).await
    }

    /// Fetch, filter, score and store. Returns (inserted, fetched).
    pub async fn process_and_store(&self) -> (usize, usize) {
        let articles = match self.fetch().await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::error!("Failed to fetch news: {}", err);
                return (0, 0);
            }
        };

        let fetched = articles.len();
        let mut inserted = 0usize;

        for article in articles {
            if article.title.trim().is_empty() {
                continue;
            }

            let haystack = format!("{} {}", article.title, article.content);
            if !self.is_relevant(&haystack) {
                continue;
            }

            let symbols = self.extract_symbols(&haystack);
            let (sentiment_label, sentiment_score) = self.scorer.analyze(&article.content);

            let item = NewsItem {
                title: article.title,
                content: article.content,
                url: article.url,
                source: article.source,
                published_at: article.published_at,
                sentiment_label,
                sentiment_score,
                symbols,
            };

            match self.store.create_news_item(&item).await {
                Ok(()) => inserted += 1,
                Err(err) => tracing::error!("Failed to store article: {}", err),
            }
        }

        tracing::info!("{}/{} fetched articles inserted", inserted, fetched);
        (inserted, fetched)
    }
}

/// Ticker without its exchange suffix: "PETR4.SA" -> "PETR4".
fn base_ticker(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

/// Headlines rarely spell out tickers; map the common ones to the company
/// names people actually write.
fn known_name(base: &str) -> Option<&'static str> {
    match base {
        "AAPL" => Some("Apple"),
        "GOOGL" | "GOOG" => Some("Google"),
        "MSFT" => Some("Microsoft"),
        "TSLA" => Some("Tesla"),
        "AMZN" => Some("Amazon"),
        "META" => Some("Meta"),
        "NVDA" => Some("Nvidia"),
        "PETR4" => Some("Petrobras"),
        "VALE3" => Some("Vale"),
        "ITUB4" => Some("Itau"),
        "BBDC4" => Some("Bradesco"),
        "ABEV3" => Some("Ambev"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use market_store::SqliteStore;
    use pipeline_core::{FundamentalsConfig, Interval, NewsConfig, SentimentLabel};

    struct FixedArticles {
        articles: Vec<RawArticle>,
    }

    #[async_trait]
    impl NewsProvider for FixedArticles {
        async fn fetch_news(
            &self,
            _query: &str,
            _language: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<RawArticle>, PipelineError> {
            Ok(self.articles.clone())
        }
    }

    fn test_config(symbols: &[&str]) -> PipelineConfig {
        PipelineConfig {
            database_url: "sqlite::memory:".to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            default_interval: Interval::OneDay,
            history_period: "30d".to_string(),
            request_delay_ms: 0,
            max_retries: 1,
            backoff_base_ms: 0,
            sma_window: 20,
            rsi_window: 14,
            news: NewsConfig {
                api_key: Some("test".to_string()),
                language: "en".to_string(),
                lookback_hours: 24,
            },
            fundamentals: FundamentalsConfig {
                enabled: false,
                api_key: None,
            },
        }
    }

    fn article(title: &str, content: &str) -> RawArticle {
        RawArticle {
            title: title.to_string(),
            content: content.to_string(),
            url: "https://example.com/a".to_string(),
            source: "Wire".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    async fn run_collector(
        symbols: &[&str],
        articles: Vec<RawArticle>,
    ) -> (Arc<SqliteStore>, usize, usize) {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = NewsCollector::new(
            Arc::new(FixedArticles { articles }),
            store.clone(),
            &test_config(symbols),
        );
        let (inserted, fetched) = collector.process_and_store().await;
        (store, inserted, fetched)
    }

    #[tokio::test]
    async fn irrelevant_articles_are_never_inserted() {
        let (store, inserted, fetched) = run_collector(
            &["AAPL"],
            vec![article("Central bank holds rates", "No companies mentioned here")],
        )
        .await;

        assert_eq!(fetched, 1);
        assert_eq!(inserted, 0);
        assert!(store.get_latest_news(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn untitled_articles_are_skipped() {
        let (_, inserted, fetched) =
            run_collector(&["AAPL"], vec![article("   ", "AAPL beats expectations")]).await;

        assert_eq!(fetched, 1);
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn relevant_articles_are_tagged_and_scored() {
        let (store, inserted, _) = run_collector(
            &["AAPL", "PETR4.SA", "TSLA"],
            vec![article(
                "AAPL and PETR4 rally",
                "Strong profit growth lifts aapl while petr4 gains on record output",
            )],
        )
        .await;

        assert_eq!(inserted, 1);
        let items = store.get_latest_news(None, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].symbols, vec!["AAPL", "PETR4.SA"]);
        assert_eq!(items[0].sentiment_label, SentimentLabel::Positive);
        assert!(items[0].sentiment_score > 0.1);
    }

    #[tokio::test]
    async fn matching_is_on_the_base_ticker_substring() {
        // The exchange suffix is stripped before matching
        let (store, inserted, _) = run_collector(
            &["PETR4.SA"],
            vec![article("Petrobras update", "petr4 output hit a new high")],
        )
        .await;

        assert_eq!(inserted, 1);
        let items = store.get_latest_news(Some("PETR4.SA"), 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn known_tickers_query_by_company_name() {
        let config = test_config(&["AAPL", "XYZW"]);
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = NewsCollector::new(
            Arc::new(FixedArticles { articles: vec![] }),
            store,
            &config,
        );

        let query = collector.build_query();
        assert!(query.contains("\"Apple\""));
        assert!(query.contains("\"XYZW\""));
        assert!(query.contains(" OR "));
    }
}
