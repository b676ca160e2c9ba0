use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CitationRef, ContentBlock, RawSearchResult, SearchProvider, SearchRequest, WebSearchTool};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Remote search provider using the Anthropic Messages API with the server-side web-search tool
pub struct RemoteSearchProvider {
    base_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    client: reqwest::Client,
}

impl RemoteSearchProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(60),
            default_max_tokens: 1024,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: usize) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for RemoteSearchProvider {
    async fn search(&self, request: SearchRequest) -> Result<Vec<ContentBlock>> {
        let req_body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            messages: vec![Message {
                role: "user",
                content: &request.query,
            }],
            tools: vec![&request.tool],
        };

        let response = tokio::time::timeout(
            self.default_timeout,
            self.client
                .post(&self.base_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .context("Search request timed out")?
        .context("Search HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error {}: {}", status, body);
        }

        let resp_body: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        let blocks = resp_body.content.unwrap_or_default();
        debug!(
            model = resp_body.model.as_deref().unwrap_or(&self.model),
            blocks = blocks.len(),
            "search response received"
        );

        Ok(blocks.into_iter().filter_map(content_block).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map one raw block onto [`ContentBlock`]. Null blocks are dropped; shapes we cannot read
/// degrade to `Other` so the rest of the response is still usable.
fn content_block(value: Value) -> Option<ContentBlock> {
    if value.is_null() {
        return None;
    }
    let block = match serde_json::from_value::<WireBlock>(value) {
        Ok(block) => block,
        Err(e) => {
            warn!("skipping unreadable content block: {}", e);
            return Some(ContentBlock::Other);
        }
    };

    Some(match block {
        WireBlock::WebSearchToolResult { content } => {
            // An error payload is an object, not a list
            let items = match content {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            ContentBlock::SearchResultBundle(items.into_iter().filter_map(search_result).collect())
        }
        WireBlock::Text { citations } => ContentBlock::TextWithCitations(
            citations
                .unwrap_or_default()
                .into_iter()
                .filter_map(citation)
                .collect(),
        ),
        WireBlock::Other => ContentBlock::Other,
    })
}

fn search_result(value: Value) -> Option<RawSearchResult> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<WireSearchResult>(value) {
        Ok(WireSearchResult::WebSearchResult {
            url: Some(url),
            title,
            encrypted_content,
            page_age,
        }) => Some(RawSearchResult {
            url,
            title,
            snippet: encrypted_content,
            page_age,
        }),
        Ok(_) => None,
        Err(e) => {
            warn!("skipping unreadable search result: {}", e);
            None
        }
    }
}

fn citation(value: Value) -> Option<CitationRef> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<WireCitation>(value) {
        Ok(WireCitation::WebSearchResultLocation {
            url: Some(url),
            title,
            cited_text,
        }) => Some(CitationRef { url, title, cited_text }),
        Ok(_) => None,
        Err(e) => {
            warn!("skipping unreadable citation: {}", e);
            None
        }
    }
}

// Anthropic Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<Message<'a>>,
    tools: Vec<&'a WebSearchTool>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireBlock {
    #[serde(rename = "web_search_tool_result")]
    WebSearchToolResult {
        #[serde(default)]
        content: Option<Value>,
    },
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        citations: Option<Vec<Value>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireSearchResult {
    #[serde(rename = "web_search_result")]
    WebSearchResult {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        encrypted_content: Option<String>,
        #[serde(default)]
        page_age: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireCitation {
    #[serde(rename = "web_search_result_location")]
    WebSearchResultLocation {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        cited_text: Option<String>,
    },
    #[serde(other)]
    Other,
}
