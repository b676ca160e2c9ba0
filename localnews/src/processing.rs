//! Turns raw search-tool output into the article list returned to clients.
//!
//! Articles come from three tiers, tried in order:
//! 1. citations in text blocks, enriched from the raw search results (score 0.85)
//! 2. raw search results alone, when the model cited nothing (score 0.7)
//! 3. a single diagnostic placeholder (score 0.1)

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::dates::resolve_page_age;
use crate::llm::{CitationRef, ContentBlock, RawSearchResult};
use crate::models::{Article, Citation, PlaceRecord};

pub const MAX_CONTENT_CHARS: usize = 500;
pub const CITED_RELEVANCE: f64 = 0.85;
pub const RAW_RESULT_RELEVANCE: f64 = 0.7;
pub const PLACEHOLDER_RELEVANCE: f64 = 0.1;

pub const NO_RESPONSE_MESSAGE: &str = "No valid response from news service.";
pub const NO_NEWS_MESSAGE: &str = "No news found for your criteria.";

const UNKNOWN_SOURCE: &str = "Unknown Source";

/// Raw results keyed by url. Re-inserting a url replaces its data but keeps its position.
#[derive(Default)]
struct ResultTable {
    entries: Vec<RawSearchResult>,
    index: HashMap<String, usize>,
}

impl ResultTable {
    fn insert(&mut self, result: RawSearchResult) {
        match self.index.get(&result.url) {
            Some(&pos) => self.entries[pos] = result,
            None => {
                self.index.insert(result.url.clone(), self.entries.len());
                self.entries.push(result);
            }
        }
    }

    fn get(&self, url: &str) -> Option<&RawSearchResult> {
        self.index.get(url).map(|&pos| &self.entries[pos])
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the article list for one search. Never returns an empty list.
pub fn process_search_response(blocks: &[ContentBlock], place: &PlaceRecord) -> Vec<Article> {
    if blocks.is_empty() {
        warn!("search response has no content blocks");
        return vec![placeholder_article(NO_RESPONSE_MESSAGE, place)];
    }

    let mut table = ResultTable::default();
    for block in blocks {
        if let ContentBlock::SearchResultBundle(results) = block {
            for result in results {
                if result.url.is_empty() {
                    debug!("skipping search result without url");
                    continue;
                }
                table.insert(result.clone());
            }
        }
    }

    let mut articles: Vec<Article> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();

    for block in blocks {
        let citations = match block {
            ContentBlock::TextWithCitations(citations) => citations,
            ContentBlock::SearchResultBundle(_) | ContentBlock::Other => continue,
        };

        // Only the placeholder may carry an empty url
        for cite in citations.iter().filter(|c| !c.url.is_empty()) {
            match by_url.get(&cite.url) {
                Some(&pos) => {
                    let article = &mut articles[pos];
                    if !article.citations.iter().any(|c| c.url == cite.url) {
                        article.citations.push(to_citation(cite));
                    }
                }
                None => {
                    let article = cited_article(cite, table.get(&cite.url), place);
                    by_url.insert(cite.url.clone(), articles.len());
                    articles.push(article);
                }
            }
        }
    }

    if articles.is_empty() && !table.is_empty() {
        info!("No articles with citations found, creating from raw search results.");
        articles = table
            .entries
            .iter()
            .map(|result| raw_result_article(result, place))
            .collect();
    }

    if articles.is_empty() {
        warn!("No news articles could be extracted from the search response after all processing.");
        return vec![placeholder_article(NO_NEWS_MESSAGE, place)];
    }

    debug!(count = articles.len(), "articles extracted");
    articles
}

fn cited_article(cite: &CitationRef, raw: Option<&RawSearchResult>, place: &PlaceRecord) -> Article {
    let title = non_empty(cite.title.as_deref())
        .or_else(|| raw.and_then(|r| non_empty(r.title.as_deref())))
        .unwrap_or("Untitled");
    let content = non_empty(cite.cited_text.as_deref())
        .or_else(|| raw.and_then(|r| non_empty(r.snippet.as_deref())))
        .unwrap_or("");

    Article {
        title: title.to_string(),
        content: truncate_content(content),
        source: extract_source(&cite.url),
        url: cite.url.clone(),
        published_date: raw.and_then(|r| resolve_page_age(r.page_age.as_deref())),
        location: place.clone(),
        relevance_score: CITED_RELEVANCE,
        citations: vec![to_citation(cite)],
    }
}

fn raw_result_article(result: &RawSearchResult, place: &PlaceRecord) -> Article {
    Article {
        title: non_empty(result.title.as_deref()).unwrap_or("Untitled").to_string(),
        content: truncate_content(result.snippet.as_deref().unwrap_or("")),
        source: extract_source(&result.url),
        url: result.url.clone(),
        published_date: resolve_page_age(result.page_age.as_deref()),
        location: place.clone(),
        relevance_score: RAW_RESULT_RELEVANCE,
        citations: Vec::new(),
    }
}

fn to_citation(cite: &CitationRef) -> Citation {
    Citation {
        url: cite.url.clone(),
        title: cite.title.clone().unwrap_or_default(),
        cited_text: cite.cited_text.clone().unwrap_or_default(),
    }
}

/// The synthetic article returned when nothing usable came back.
pub fn placeholder_article(message: &str, place: &PlaceRecord) -> Article {
    Article {
        title: "News Update".to_string(),
        content: message.to_string(),
        source: "System".to_string(),
        url: String::new(),
        published_date: Some(Utc::now()),
        location: place.clone(),
        relevance_score: PLACEHOLDER_RELEVANCE,
        citations: Vec::new(),
    }
}

/// Domain of `url` without a leading "www.", or "Unknown Source".
pub fn extract_source(url: &str) -> String {
    let parsed = match url::Url::parse(url) {
        Ok(u) => u,
        Err(_) => return UNKNOWN_SOURCE.to_string(),
    };
    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return UNKNOWN_SOURCE.to_string(),
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// First 500 characters followed by "...". The marker is appended even to short text.
pub fn truncate_content(text: &str) -> String {
    let mut out: String = text.chars().take(MAX_CONTENT_CHARS).collect();
    out.push_str("...");
    out
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
