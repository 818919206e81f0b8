//! Tavily web search adapter.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::SearchClient;
use crate::domain::RetrievalHit;
use crate::retrieval::scoring::{domain_of, is_excluded, score_hit};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// One raw result as returned by the search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// Search client for the Tavily REST API
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
    excluded_domains: Vec<String>,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, excluded_domains: Vec<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
            excluded_domains,
        })
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Number of candidates to request so that filtering still leaves `limit`
pub fn candidate_count(limit: usize) -> usize {
    (limit * 3).max(limit + 2)
}

/// Filter, deduplicate, score and keep the best `limit` results
pub fn select_hits(
    query: &str,
    results: Vec<TavilyResult>,
    excluded_domains: &[String],
    limit: usize,
) -> Vec<RetrievalHit> {
    let mut seen = HashSet::new();
    let mut hits: Vec<RetrievalHit> = results
        .into_iter()
        .filter(|r| !r.url.is_empty())
        .filter(|r| !is_excluded(&domain_of(&r.url), excluded_domains))
        .filter(|r| seen.insert(r.url.clone()))
        .map(|r| score_hit(query, &r.title, &r.url, &r.content))
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[async_trait]
impl SearchClient for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalHit>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": candidate_count(limit),
            "search_depth": "basic",
            "topic": "general",
            "exclude_domains": self.excluded_domains,
            "include_answer": false,
            "include_raw_content": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error {}: {}", status, text);
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        debug!(query, raw = parsed.results.len(), "Search returned");
        Ok(select_hits(query, parsed.results, &self.excluded_domains, limit))
    }
}
