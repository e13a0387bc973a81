pub mod alpha_vantage;
pub mod newsapi;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use newsapi::NewsApiClient;
pub use yahoo::YahooChartClient;

use std::time::Duration;

/// Per-request timeout shared by every adapter.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent("Mozilla/5.0 (compatible; market-pipeline/0.1)")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
