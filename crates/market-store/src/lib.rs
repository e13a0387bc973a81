mod rows;

use async_trait::async_trait;
use pipeline_core::{
    CompanyProfile, FinancialRatios, FinancialStatement, FundamentalsSummary, Interval, NewsItem,
    PipelineError, PriceBar, StoragePort, StorageStats, UpsertCounts,
};
use rows::{NewsRow, PriceBarRow, SummaryRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite-backed implementation of the storage port.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating the file if needed) and apply the schema.
    pub async fn open(database_url: &str) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One connection: the run is sequential, and an in-memory database
        // must not be spread across pool connections.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Apply the workspace schema. Statements are executed one at a time
    /// since sqlx does not run multi-statement strings.
    async fn init_schema(&self) -> Result<(), PipelineError> {
        let schema = include_str!("../../../schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StoragePort for SqliteStore {
    async fn upsert_price_bars(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[PriceBar],
    ) -> Result<UpsertCounts, PipelineError> {
        if bars.is_empty() {
            return Ok(UpsertCounts::default());
        }

        // One transaction per batch: a failure rolls the whole write back
        let mut tx = self.pool.begin().await?;
        let mut counts = UpsertCounts::default();

        for bar in bars {
            let existing: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM price_bars WHERE symbol = ? AND timestamp = ? AND interval = ?",
            )
            .bind(symbol)
            .bind(bar.timestamp)
            .bind(interval.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some((id,)) => {
                    sqlx::query(
                        r#"
                        UPDATE price_bars
                        SET open = ?, high = ?, low = ?, close = ?, volume = ?, sma = ?, rsi = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(bar.open)
                    .bind(bar.high)
                    .bind(bar.low)
                    .bind(bar.close)
                    .bind(bar.volume)
                    .bind(bar.sma)
                    .bind(bar.rsi)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    counts.updated += 1;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO price_bars
                            (symbol, timestamp, interval, open, high, low, close, volume, sma, rsi)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(symbol)
                    .bind(bar.timestamp)
                    .bind(interval.as_str())
                    .bind(bar.open)
                    .bind(bar.high)
                    .bind(bar.low)
                    .bind(bar.close)
                    .bind(bar.volume)
                    .bind(bar.sma)
                    .bind(bar.rsi)
                    .execute(&mut *tx)
                    .await?;
                    counts.inserted += 1;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Saved {} bars for {} ({} new, {} updated)",
            bars.len(),
            symbol,
            counts.inserted,
            counts.updated
        );
        Ok(counts)
    }

    async fn get_price_bars(
        &self,
        symbol: &str,
        interval: Interval,
        limit: i64,
    ) -> Result<Vec<PriceBar>, PipelineError> {
        let bars: Vec<PriceBarRow> = sqlx::query_as(
            r#"
            SELECT symbol, timestamp, interval, open, high, low, close, volume, sma, rsi
            FROM price_bars
            WHERE symbol = ? AND interval = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(interval.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bars.into_iter().map(PriceBarRow::into_bar).collect())
    }

    async fn upsert_company_profile(
        &self,
        profile: &CompanyProfile,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO companies (symbol, company_name, sector, industry, description,
                                   website, market_cap, employees, country, currency,
                                   exchange, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                company_name = excluded.company_name,
                sector = excluded.sector,
                industry = excluded.industry,
                description = excluded.description,
                website = excluded.website,
                market_cap = excluded.market_cap,
                employees = excluded.employees,
                country = excluded.country,
                currency = excluded.currency,
                exchange = excluded.exchange,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.symbol)
        .bind(&profile.company_name)
        .bind(&profile.sector)
        .bind(&profile.industry)
        .bind(&profile.description)
        .bind(&profile.website)
        .bind(profile.market_cap)
        .bind(profile.employees)
        .bind(&profile.country)
        .bind(&profile.currency)
        .bind(&profile.exchange)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_financial_statement(
        &self,
        statement: &FinancialStatement,
    ) -> Result<(), PipelineError> {
        match statement {
            FinancialStatement::Income(income) => {
                sqlx::query(
                    r#"
                    INSERT INTO income_statements (symbol, date, period, revenue,
                        cost_of_revenue, gross_profit, operating_expenses,
                        operating_income, net_income, eps, ebitda)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(symbol, date, period) DO NOTHING
                    "#,
                )
                .bind(&income.symbol)
                .bind(income.date)
                .bind(&income.period)
                .bind(income.revenue)
                .bind(income.cost_of_revenue)
                .bind(income.gross_profit)
                .bind(income.operating_expenses)
                .bind(income.operating_income)
                .bind(income.net_income)
                .bind(income.eps)
                .bind(income.ebitda)
                .execute(&self.pool)
                .await?;
            }
            FinancialStatement::Balance(balance) => {
                sqlx::query(
                    r#"
                    INSERT INTO balance_sheets (symbol, date, period, total_assets,
                        total_liabilities, total_equity, cash, total_debt, working_capital)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(symbol, date, period) DO NOTHING
                    "#,
                )
                .bind(&balance.symbol)
                .bind(balance.date)
                .bind(&balance.period)
                .bind(balance.total_assets)
                .bind(balance.total_liabilities)
                .bind(balance.total_equity)
                .bind(balance.cash)
                .bind(balance.total_debt)
                .bind(balance.working_capital)
                .execute(&self.pool)
                .await?;
            }
            FinancialStatement::CashFlow(cash_flow) => {
                sqlx::query(
                    r#"
                    INSERT INTO cash_flows (symbol, date, period, operating_cash_flow,
                        investing_cash_flow, financing_cash_flow, free_cash_flow, capex)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(symbol, date, period) DO NOTHING
                    "#,
                )
                .bind(&cash_flow.symbol)
                .bind(cash_flow.date)
                .bind(&cash_flow.period)
                .bind(cash_flow.operating_cash_flow)
                .bind(cash_flow.investing_cash_flow)
                .bind(cash_flow.financing_cash_flow)
                .bind(cash_flow.free_cash_flow)
                .bind(cash_flow.capex)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn insert_financial_ratios(
        &self,
        ratios: &FinancialRatios,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO financial_ratios (symbol, date, period, pe_ratio, pb_ratio,
                ps_ratio, roe, roa, roi, debt_to_equity, current_ratio, quick_ratio,
                gross_margin, operating_margin, net_margin)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol, date, period) DO NOTHING
            "#,
        )
        .bind(&ratios.symbol)
        .bind(ratios.date)
        .bind(&ratios.period)
        .bind(ratios.pe_ratio)
        .bind(ratios.pb_ratio)
        .bind(ratios.ps_ratio)
        .bind(ratios.roe)
        .bind(ratios.roa)
        .bind(ratios.roi)
        .bind(ratios.debt_to_equity)
        .bind(ratios.current_ratio)
        .bind(ratios.quick_ratio)
        .bind(ratios.gross_margin)
        .bind(ratios.operating_margin)
        .bind(ratios.net_margin)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_news_item(&self, item: &NewsItem) -> Result<(), PipelineError> {
        let symbols = serde_json::to_string(&item.symbols)
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO news (title, content, url, source, published_at,
                              sentiment_label, sentiment_score, symbols)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.title)
        .bind(&item.content)
        .bind(&item.url)
        .bind(&item.source)
        .bind(item.published_at)
        .bind(item.sentiment_label.as_str())
        .bind(item.sentiment_score)
        .bind(symbols)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_latest_news(
        &self,
        symbol: Option<&str>,
        limit: i64,
    ) -> Result<Vec<NewsItem>, PipelineError> {
        let rows: Vec<NewsRow> = match symbol {
            Some(symbol) => {
                // symbols is a JSON array string; match the quoted element
                sqlx::query_as(
                    r#"
                    SELECT title, content, url, source, published_at,
                           sentiment_label, sentiment_score, symbols
                    FROM news
                    WHERE symbols LIKE ?
                    ORDER BY published_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(format!("%\"{}\"%", symbol))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT title, content, url, source, published_at,
                           sentiment_label, sentiment_score, symbols
                    FROM news
                    ORDER BY published_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(NewsRow::into_item).collect())
    }

    async fn get_fundamentals_summary(
        &self,
        symbol: &str,
    ) -> Result<Option<FundamentalsSummary>, PipelineError> {
        let row: Option<SummaryRow> = sqlx::query_as(
            r#"
            SELECT c.company_name, c.sector, c.industry, c.market_cap,
                   i.revenue, i.net_income, i.eps,
                   r.pe_ratio, r.pb_ratio, r.roe, r.debt_to_equity
            FROM companies c
            LEFT JOIN income_statements i ON i.symbol = c.symbol
                AND i.date = (SELECT MAX(date) FROM income_statements WHERE symbol = c.symbol)
            LEFT JOIN financial_ratios r ON r.symbol = c.symbol
                AND r.date = (SELECT MAX(date) FROM financial_ratios WHERE symbol = c.symbol)
            WHERE c.symbol = ?
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SummaryRow::into_summary))
    }

    async fn get_stats(&self) -> Result<StorageStats, PipelineError> {
        let (total_price_records, unique_symbols, last_update): (
            i64,
            i64,
            Option<chrono::DateTime<chrono::Utc>>,
        ) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT symbol), MAX(timestamp) FROM price_bars",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StorageStats {
            total_price_records,
            unique_symbols,
            last_update,
        })
    }
}
