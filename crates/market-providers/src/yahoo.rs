use async_trait::async_trait;
use chrono::DateTime;
use pipeline_core::{Interval, PipelineError, PriceHistoryProvider, RawBar};
use serde::Deserialize;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Price-history adapter for the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
}

impl YahooChartClient {
    pub fn new() -> Self {
        Self {
            client: crate::http_client(),
        }
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooChartClient {
    async fn fetch_price_history(
        &self,
        symbol: &str,
        period: &str,
        interval: Interval,
    ) -> Result<Vec<RawBar>, PipelineError> {
        let url = format!("{}/v8/finance/chart/{}", BASE_URL, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("range", period), ("interval", interval.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let payload: ChartResponse = response.json().await?;

        if let Some(error) = payload.chart.error {
            return Err(PipelineError::Provider(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        let result = match payload
            .chart
            .result
            .and_then(|results| results.into_iter().next())
        {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .unwrap_or_default();

        // Each column is a parallel array with nulls where Yahoo has no value
        let bars: Vec<RawBar> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let timestamp = DateTime::from_timestamp(ts, 0)?;
                Some(RawBar {
                    timestamp,
                    open: column_value(&quote.open, i),
                    high: column_value(&quote.high, i),
                    low: column_value(&quote.low, i),
                    close: column_value(&quote.close, i),
                    volume: column_value(&quote.volume, i),
                })
            })
            .collect();

        tracing::debug!("{}: {} bars fetched", symbol, bars.len());
        Ok(bars)
    }
}

fn column_value<T: Copy>(column: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
    column
        .as_ref()
        .and_then(|values| values.get(index).copied().flatten())
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Deserialize, Default)]
struct QuoteColumns {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}
