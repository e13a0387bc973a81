use crate::error::PipelineError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bar interval tag, stored as its string form ("1m".."1mo").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "1h" | "60m" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            other => Err(PipelineError::Config(format!(
                "unknown interval: {}",
                other
            ))),
        }
    }
}

/// One OHLCV row as a provider hands it over. Any field the source omitted
/// stays `None`; validation decides what that means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

/// Stored price bar. Natural key (symbol, timestamp, interval); high >= low
/// whenever both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub interval: Interval,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub sma: Option<f64>,
    pub rsi: Option<f64>,
}

/// Sentiment classification of a news text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(PipelineError::Validation(format!(
                "unknown sentiment label: {}",
                other
            ))),
        }
    }
}

/// Article as fetched from the news provider, before relevance filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// Stored news record. Insert-only; there is no natural key, so re-running
/// the pipeline inside the same lookback window can duplicate articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
    /// Configured symbols matched in title+content; may be empty.
    pub symbols: Vec<String>,
}

/// Company profile, keyed by symbol and fully replaced on re-collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub description: String,
    pub website: String,
    pub market_cap: f64,
    pub employees: i64,
    pub country: String,
    pub currency: String,
    pub exchange: String,
    pub updated_at: DateTime<Utc>,
}

/// Income statement line items for one (symbol, date, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub symbol: String,
    pub date: NaiveDate,
    pub period: String,
    pub revenue: f64,
    pub cost_of_revenue: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub operating_income: f64,
    pub net_income: f64,
    pub eps: f64,
    pub ebitda: f64,
}

/// Balance sheet line items for one (symbol, date, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub symbol: String,
    pub date: NaiveDate,
    pub period: String,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
    pub cash: f64,
    pub total_debt: f64,
    pub working_capital: f64,
}

/// Cash flow line items for one (symbol, date, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub symbol: String,
    pub date: NaiveDate,
    pub period: String,
    pub operating_cash_flow: f64,
    pub investing_cash_flow: f64,
    pub financing_cash_flow: f64,
    pub free_cash_flow: f64,
    pub capex: f64,
}

/// One of the three statement kinds. Statements are historical facts:
/// insert-or-skip on (symbol, date, period) conflict, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FinancialStatement {
    Income(IncomeStatement),
    Balance(BalanceSheet),
    CashFlow(CashFlowStatement),
}

impl FinancialStatement {
    pub fn kind(&self) -> &'static str {
        match self {
            FinancialStatement::Income(_) => "income",
            FinancialStatement::Balance(_) => "balance",
            FinancialStatement::CashFlow(_) => "cashflow",
        }
    }
}

/// Valuation/profitability/leverage/margin ratios for one
/// (symbol, date, period). Values may be negative or zero when undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub symbol: String,
    pub date: NaiveDate,
    pub period: String,
    pub pe_ratio: f64,
    pub pb_ratio: f64,
    pub ps_ratio: f64,
    pub roe: f64,
    pub roa: f64,
    pub roi: f64,
    pub debt_to_equity: f64,
    pub current_ratio: f64,
    pub quick_ratio: f64,
    pub gross_margin: f64,
    pub operating_margin: f64,
    pub net_margin: f64,
}

/// Statements bundle as fetched for one symbol; any of the three may be
/// missing at the source.
#[derive(Debug, Clone, Default)]
pub struct StatementBundle {
    pub income: Option<IncomeStatement>,
    pub balance: Option<BalanceSheet>,
    pub cash_flow: Option<CashFlowStatement>,
}

impl StatementBundle {
    pub fn count(&self) -> usize {
        [
            self.income.is_some(),
            self.balance.is_some(),
            self.cash_flow.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Latest profile + income statement + ratios joined by symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsSummary {
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

/// Composite financial health score, derived on demand and not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsScore {
    pub symbol: String,
    /// 0-100, sum of the breakdown sub-scores.
    pub total: f64,
    /// Factor name -> sub-score (profitability, valuation, debt, growth).
    pub breakdown: BTreeMap<String, f64>,
}

impl FundamentalsScore {
    pub fn zero(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            total: 0.0,
            breakdown: BTreeMap::new(),
        }
    }
}

/// Result of a price-bar upsert: rows newly inserted vs overwritten in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
}

/// Per-symbol outcome of the three fundamentals sub-collections.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FundamentalsOutcome {
    pub profile: bool,
    pub statements: bool,
    pub ratios: bool,
}

impl FundamentalsOutcome {
    pub fn successful(&self) -> usize {
        [self.profile, self.statements, self.ratios]
            .iter()
            .filter(|ok| **ok)
            .count()
    }
}

/// Headline numbers about the price store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_price_records: i64,
    pub unique_symbols: i64,
    pub last_update: Option<DateTime<Utc>>,
}
