use chrono::{DateTime, Utc};
use pipeline_core::{FundamentalsSummary, Interval, NewsItem, PriceBar, SentimentLabel};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct PriceBarRow {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub interval: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub sma: Option<f64>,
    pub rsi: Option<f64>,
}

impl PriceBarRow {
    pub(crate) fn into_bar(self) -> PriceBar {
        PriceBar {
            interval: self.interval.parse().unwrap_or(Interval::OneDay),
            symbol: self.symbol,
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            sma: self.sma,
            rsi: self.rsi,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct NewsRow {
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub published_at: DateTime<Utc>,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub symbols: Option<String>,
}

impl NewsRow {
    pub(crate) fn into_item(self) -> NewsItem {
        let sentiment_label = self
            .sentiment_label
            .as_deref()
            .and_then(|label| label.parse().ok())
            .unwrap_or(SentimentLabel::Neutral);
        let symbols = self
            .symbols
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        NewsItem {
            title: self.title,
            content: self.content.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            published_at: self.published_at,
            sentiment_label,
            sentiment_score: self.sentiment_score.unwrap_or(0.0),
            symbols,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SummaryRow {
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

impl SummaryRow {
    pub(crate) fn into_summary(self) -> FundamentalsSummary {
        FundamentalsSummary {
            company_name: self.company_name,
            sector: self.sector,
            industry: self.industry,
            market_cap: self.market_cap,
            revenue: self.revenue,
            net_income: self.net_income,
            eps: self.eps,
            pe_ratio: self.pe_ratio,
            pb_ratio: self.pb_ratio,
            roe: self.roe,
            debt_to_equity: self.debt_to_equity,
        }
    }
}
