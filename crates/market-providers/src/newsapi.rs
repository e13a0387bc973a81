use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pipeline_core::{NewsProvider, PipelineError, RawArticle};
use serde::Deserialize;

const BASE_URL: &str = "https://newsapi.org/v2";

/// One page of results is all the pipeline ever asks for.
const PAGE_SIZE: u32 = 100;

/// Article-search adapter for the NewsAPI `everything` endpoint.
#[derive(Clone)]
pub struct NewsApiClient {
    api_key: String,
    client: reqwest::Client,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: crate::http_client(),
        }
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn fetch_news(
        &self,
        query: &str,
        language: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawArticle>, PipelineError> {
        let url = format!("{}/everything", BASE_URL);
        let page_size = PAGE_SIZE.to_string();
        let from = since.to_rfc3339_opts(SecondsFormat::Secs, true);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("language", language),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("from", from.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let payload: NewsResponse = response.json().await?;

        if payload.status != "ok" {
            return Err(PipelineError::Provider(format!(
                "NewsAPI status {}",
                payload.status
            )));
        }

        tracing::info!(
            "{} articles returned (total available: {})",
            payload.articles.len(),
            payload.total_results
        );

        let articles = payload
            .articles
            .into_iter()
            .filter_map(|article| {
                let published_at = article.published_at?;
                Some(RawArticle {
                    title: article.title.unwrap_or_default(),
                    // NewsAPI truncates `content`; fall back to the description
                    content: article
                        .content
                        .or(article.description)
                        .unwrap_or_default(),
                    url: article.url.unwrap_or_default(),
                    source: article.source.name.unwrap_or_else(|| "Unknown".to_string()),
                    published_at,
                })
            })
            .collect();

        Ok(articles)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsResponse {
    status: String,
    #[serde(default)]
    total_results: u32,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    source: SourceBlock,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct SourceBlock {
    name: Option<String>,
}
