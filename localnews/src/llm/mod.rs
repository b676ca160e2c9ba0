use anyhow::{Context, Result};
use common::SearchConfig;
use serde::Serialize;
use std::sync::Arc;

pub mod remote;

/// Core trait for LLM-backed web search providers
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one model turn with the web-search tool enabled and return its content blocks
    async fn search(&self, request: SearchRequest) -> Result<Vec<ContentBlock>>;

    /// Model identifier reported back to clients
    fn model(&self) -> &str;
}

/// Request structure for a tool-enabled search turn
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub tool: WebSearchTool,
    pub max_tokens: Option<usize>,
}

/// Web-search tool descriptor sent alongside the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSearchTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub max_uses: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
    pub user_location: ApproximateLocation,
}

/// Location hint that lets the search tool localise results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproximateLocation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub city: String,
    pub region: String,
    /// ISO country code
    pub country: String,
    pub timezone: String,
}

/// One block of model output, reduced to the shapes the news pipeline understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Raw results returned by a web search
    SearchResultBundle(Vec<RawSearchResult>),
    /// Generated text with the citations backing it
    TextWithCitations(Vec<CitationRef>),
    /// Anything else (tool calls, plain text, future block types)
    Other,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSearchResult {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    /// e.g. "3 days ago" or "March 1, 2024"
    pub page_age: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CitationRef {
    pub url: String,
    pub title: Option<String>,
    pub cited_text: Option<String>,
}

/// Create the search provider named by `search.adapter` (default "remote").
/// The API key is mandatory: without it the service refuses to start.
pub fn create_search_provider(search: &SearchConfig) -> Result<Arc<dyn SearchProvider>> {
    let adapter = search.adapter.as_deref().unwrap_or("remote");
    match adapter {
        "remote" => {
            let api_key_env = search.api_key_env();
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("Search API key env var '{}' not set", api_key_env))?;

            let provider = remote::RemoteSearchProvider::new(search.api_url(), api_key, search.model())
                .with_defaults(search.timeout_seconds.unwrap_or(60), search.max_tokens.unwrap_or(1024));
            Ok(Arc::new(provider))
        }
        "none" => anyhow::bail!("Search adapter 'none' cannot serve news requests"),
        _ => anyhow::bail!("Unknown search adapter type: {}", adapter),
    }
}
