use crate::retry::Retrier;
use pipeline_core::{
    FinancialStatement, FundamentalsOutcome, FundamentalsProvider, PipelineConfig, StoragePort,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collects fundamentals per symbol in three independently fault-tolerant
/// steps: profile, statements, key ratios.
pub struct FundamentalsCollector {
    provider: Arc<dyn FundamentalsProvider>,
    store: Arc<dyn StoragePort>,
    retrier: Retrier,
}

impl FundamentalsCollector {
    pub fn new(
        provider: Arc<dyn FundamentalsProvider>,
        store: Arc<dyn StoragePort>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            retrier: Retrier::from_config(config),
        }
    }

    /// Fetch and upsert the company profile. Full replace keyed by symbol.
    pub async fn collect_company_profile(&self, symbol: &str) -> bool {
        let profile = match self
            .retrier
            .execute(symbol, || self.provider.fetch_company_overview(symbol))
            .await
        {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!("No profile data found for {}", symbol);
                return false;
            }
            Err(err) => {
                tracing::error!("Failed to fetch profile for {}: {}", symbol, err);
                return false;
            }
        };

        match self.store.upsert_company_profile(&profile).await {
            Ok(()) => {
                tracing::info!("Profile collected for {}: {}", symbol, profile.company_name);
                true
            }
            Err(err) => {
                tracing::error!("Failed to store profile for {}: {}", symbol, err);
                false
            }
        }
    }

    /// Fetch the three statements and insert whichever are present.
    /// Existing (symbol, date, period) rows are kept untouched.
    pub async fn collect_financial_statements(&self, symbol: &str) -> bool {
        let bundle = match self
            .retrier
            .execute(symbol, || self.provider.fetch_statements(symbol))
            .await
        {
            Ok(bundle) => bundle,
            Err(err) => {
                tracing::error!("Failed to fetch statements for {}: {}", symbol, err);
                return false;
            }
        };

        if bundle.count() == 0 {
            tracing::warn!("No statements found for {}", symbol);
            return false;
        }

        let statements = [
            bundle.income.map(FinancialStatement::Income),
            bundle.balance.map(FinancialStatement::Balance),
            bundle.cash_flow.map(FinancialStatement::CashFlow),
        ];

        let mut stored = 0usize;
        for statement in statements.into_iter().flatten() {
            match self.store.insert_financial_statement(&statement).await {
                Ok(()) => stored += 1,
                Err(err) => tracing::error!(
                    "Failed to store {} statement for {}: {}",
                    statement.kind(),
                    symbol,
                    err
                ),
            }
        }

        tracing::info!("{}/3 statements stored for {}", stored, symbol);
        stored > 0
    }

    /// Fetch and insert key ratios; insert-or-skip on conflict.
    pub async fn collect_key_ratios(&self, symbol: &str) -> bool {
        let ratios = match self
            .retrier
            .execute(symbol, || self.provider.fetch_key_ratios(symbol))
            .await
        {
            Ok(Some(ratios)) => ratios,
            Ok(None) => {
                tracing::warn!("No ratio data found for {}", symbol);
                return false;
            }
            Err(err) => {
                tracing::error!("Failed to fetch ratios for {}: {}", symbol, err);
                return false;
            }
        };

        match self.store.insert_financial_ratios(&ratios).await {
            Ok(()) => {
                tracing::info!("Ratios stored for {}", symbol);
                true
            }
            Err(err) => {
                tracing::error!("Failed to store ratios for {}: {}", symbol, err);
                false
            }
        }
    }

    /// Run the three steps in their fixed order with a pause between each.
    /// A failed step never blocks the next one.
    pub async fn collect_all_fundamentals(&self, symbol: &str) -> FundamentalsOutcome {
        tracing::info!("Collecting fundamentals for {}", symbol);

        let profile = self.collect_company_profile(symbol).await;
        self.retrier.pause().await;

        let statements = self.collect_financial_statements(symbol).await;
        self.retrier.pause().await;

        let ratios = self.collect_key_ratios(symbol).await;

        let outcome = FundamentalsOutcome {
            profile,
            statements,
            ratios,
        };
        tracing::info!(
            "Fundamentals for {}: {}/3 collected",
            symbol,
            outcome.successful()
        );

        outcome
    }

    /// Collect many symbols, skipping those the provider cannot serve.
    /// One symbol's failure never aborts the batch.
    pub async fn collect_multiple_fundamentals(
        &self,
        symbols: &[String],
    ) -> BTreeMap<String, FundamentalsOutcome> {
        let valid: Vec<String> = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        tracing::info!(
            "Starting fundamentals collection for {} symbols",
            valid.len()
        );

        let mut results = BTreeMap::new();
        for symbol in valid {
            if !self.provider.supports_symbol(&symbol) {
                tracing::warn!(
                    "Skipping {} - not supported by the fundamentals provider",
                    symbol
                );
                continue;
            }

            let outcome = self.collect_all_fundamentals(&symbol).await;
            results.insert(symbol, outcome);

            self.retrier.pause().await;
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use market_store::SqliteStore;
    use pipeline_core::{
        BalanceSheet, CompanyProfile, FinancialRatios, FundamentalsConfig, IncomeStatement,
        Interval, NewsConfig, PipelineConfig, PipelineError, StatementBundle,
    };

    struct FakeFundamentals {
        has_data: bool,
    }

    impl FakeFundamentals {
        fn profile(symbol: &str) -> CompanyProfile {
            CompanyProfile {
                symbol: symbol.to_string(),
                company_name: "Test Corp".to_string(),
                sector: "Technology".to_string(),
                industry: "Software".to_string(),
                description: String::new(),
                website: String::new(),
                market_cap: 5.0e9,
                employees: 1200,
                country: "USA".to_string(),
                currency: "USD".to_string(),
                exchange: "NASDAQ".to_string(),
                updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }
        }
    }

    #[async_trait]
    impl FundamentalsProvider for FakeFundamentals {
        fn supports_symbol(&self, symbol: &str) -> bool {
            !symbol.contains('.')
        }

        async fn fetch_company_overview(
            &self,
            symbol: &str,
        ) -> Result<Option<CompanyProfile>, PipelineError> {
            Ok(self.has_data.then(|| Self::profile(symbol)))
        }

        async fn fetch_statements(
            &self,
            symbol: &str,
        ) -> Result<StatementBundle, PipelineError> {
            if !self.has_data {
                return Ok(StatementBundle::default());
            }
            let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
            Ok(StatementBundle {
                income: Some(IncomeStatement {
                    symbol: symbol.to_string(),
                    date,
                    period: "FY".to_string(),
                    revenue: 1.0e9,
                    cost_of_revenue: 4.0e8,
                    gross_profit: 6.0e8,
                    operating_expenses: 2.0e8,
                    operating_income: 4.0e8,
                    net_income: 3.0e8,
                    eps: 1.5,
                    ebitda: 4.5e8,
                }),
                balance: Some(BalanceSheet {
                    symbol: symbol.to_string(),
                    date,
                    period: "FY".to_string(),
                    total_assets: 2.0e9,
                    total_liabilities: 8.0e8,
                    total_equity: 1.2e9,
                    cash: 3.0e8,
                    total_debt: 4.0e8,
                    working_capital: 2.5e8,
                }),
                cash_flow: None,
            })
        }

        async fn fetch_key_ratios(
            &self,
            symbol: &str,
        ) -> Result<Option<FinancialRatios>, PipelineError> {
            Ok(self.has_data.then(|| FinancialRatios {
                symbol: symbol.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                period: "TTM".to_string(),
                pe_ratio: 18.0,
                pb_ratio: 4.0,
                ps_ratio: 5.0,
                roe: 22.0,
                roa: 12.0,
                roi: 0.0,
                debt_to_equity: 0.33,
                current_ratio: 2.0,
                quick_ratio: 1.5,
                gross_margin: 60.0,
                operating_margin: 40.0,
                net_margin: 30.0,
            }))
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            database_url: "sqlite::memory:".to_string(),
            symbols: vec![],
            default_interval: Interval::OneDay,
            history_period: "30d".to_string(),
            request_delay_ms: 0,
            max_retries: 1,
            backoff_base_ms: 0,
            sma_window: 20,
            rsi_window: 14,
            news: NewsConfig {
                api_key: None,
                language: "en".to_string(),
                lookback_hours: 24,
            },
            fundamentals: FundamentalsConfig {
                enabled: true,
                api_key: Some("test".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn all_three_steps_succeed_with_a_full_provider() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = FundamentalsCollector::new(
            Arc::new(FakeFundamentals { has_data: true }),
            store.clone(),
            &test_config(),
        );

        let outcome = collector.collect_all_fundamentals("TEST").await;
        assert!(outcome.profile);
        assert!(outcome.statements); // 2 of 3 statements is still a success
        assert!(outcome.ratios);

        let summary = store
            .get_fundamentals_summary("TEST")
            .await
            .unwrap()
            .expect("summary should exist");
        assert_eq!(summary.revenue, Some(1.0e9));
        assert_eq!(summary.pe_ratio, Some(18.0));
    }

    #[tokio::test]
    async fn absent_data_is_a_skip_not_an_error() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = FundamentalsCollector::new(
            Arc::new(FakeFundamentals { has_data: false }),
            store.clone(),
            &test_config(),
        );

        let outcome = collector.collect_all_fundamentals("TEST").await;
        assert!(!outcome.profile);
        assert!(!outcome.statements);
        assert!(!outcome.ratios);
        assert_eq!(outcome.successful(), 0);
    }

    #[tokio::test]
    async fn unsupported_symbols_are_skipped_in_batches() {
        let store = Arc::new(SqliteStore::open("sqlite::memory:").await.unwrap());
        let collector = FundamentalsCollector::new(
            Arc::new(FakeFundamentals { has_data: true }),
            store,
            &test_config(),
        );

        let symbols = vec!["TEST".to_string(), "PETR4.SA".to_string()];
        let results = collector.collect_multiple_fundamentals(&symbols).await;

        assert_eq!(results.len(), 1);
        assert!(results.contains_key("TEST"));
        assert!(!results.contains_key("PETR4.SA"));
    }
}
