use crate::error::PipelineError;
use crate::types::Interval;
use std::time::Duration;

/// Process-level configuration, built once at startup and handed to each
/// component. Components never read the environment themselves.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// sqlx connection string, e.g. "sqlite:data/market_data.db".
    pub database_url: String,
    /// Ticker symbols to collect, in processing order.
    pub symbols: Vec<String>,
    /// Bar interval for price collection.
    pub default_interval: Interval,
    /// History window passed to the price provider (e.g. "30d").
    pub history_period: String,
    /// Fixed pause before every provider request (rate limiting).
    pub request_delay_ms: u64,
    /// Total attempts per fetch, including the first.
    pub max_retries: u32,
    /// Base of the exponential backoff between attempts.
    pub backoff_base_ms: u64,
    /// SMA window attached to collected bars.
    pub sma_window: usize,
    /// RSI window attached to collected bars.
    pub rsi_window: usize,
    pub news: NewsConfig,
    pub fundamentals: FundamentalsConfig,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// Absent key skips news collection with a warning, it is not fatal.
    pub api_key: Option<String>,
    pub language: String,
    /// Only articles published within the last N hours are fetched.
    pub lookback_hours: i64,
}

#[derive(Debug, Clone)]
pub struct FundamentalsConfig {
    pub enabled: bool,
    /// Absent key skips fundamentals collection with a warning.
    pub api_key: Option<String>,
}

impl PipelineConfig {
    /// Load from the environment (a `.env` file is honored when present).
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let symbols: Vec<String> = std::env::var("SYMBOLS")
            .unwrap_or_else(|_| "AAPL,GOOGL".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_interval: Interval = std::env::var("DEFAULT_INTERVAL")
            .unwrap_or_else(|_| "1d".to_string())
            .parse()?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/market_data.db".to_string()),
            symbols,
            default_interval,
            history_period: std::env::var("HISTORY_PERIOD").unwrap_or_else(|_| "30d".to_string()),
            request_delay_ms: env_var_parse("REQUEST_DELAY_MS", 1000),
            max_retries: env_var_parse("MAX_RETRIES", 3),
            backoff_base_ms: env_var_parse("BACKOFF_BASE_MS", 1000),
            sma_window: env_var_parse("SMA_WINDOW", 20),
            rsi_window: env_var_parse("RSI_WINDOW", 14),
            news: NewsConfig {
                api_key: std::env::var("NEWSAPI_KEY").ok().filter(|k| !k.is_empty()),
                language: std::env::var("NEWS_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
                lookback_hours: env_var_parse("NEWS_PERIOD_HOURS", 24),
            },
            fundamentals: FundamentalsConfig {
                enabled: env_var_bool("COLLECT_FUNDAMENTALS", true),
                api_key: std::env::var("ALPHA_VANTAGE_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
            },
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_round_trips_through_tag() {
        let interval: Interval = "1d".parse().unwrap();
        assert_eq!(interval, Interval::OneDay);
        assert_eq!(interval.as_str(), "1d");
    }

    #[test]
    fn unknown_interval_is_a_config_error() {
        let parsed = "2d".parse::<Interval>();
        assert!(parsed.is_err());
    }
}
