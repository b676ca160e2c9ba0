use std::sync::{Arc, Mutex};

use anyhow::Result;
use localnews::geocoding::PlaceResolver;
use localnews::llm::{CitationRef, ContentBlock, RawSearchResult, SearchProvider, SearchRequest};
use localnews::models::{LocationRequest, PlaceRecord};
use localnews::news::{NewsError, NewsService};
use localnews::query::QueryOptions;

struct FixedResolver {
    place: Option<PlaceRecord>,
}

#[async_trait::async_trait]
impl PlaceResolver for FixedResolver {
    async fn resolve(&self, _latitude: f64, _longitude: f64) -> Result<PlaceRecord> {
        match &self.place {
            Some(place) => Ok(place.clone()),
            None => anyhow::bail!("Geocoding service error: status 503 Service Unavailable"),
        }
    }
}

/// Returns canned blocks (or an error) and records the last request it saw.
struct CannedProvider {
    blocks: Option<Vec<ContentBlock>>,
    seen: Mutex<Option<SearchRequest>>,
}

impl CannedProvider {
    fn ok(blocks: Vec<ContentBlock>) -> Self {
        Self {
            blocks: Some(blocks),
            seen: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            blocks: None,
            seen: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for CannedProvider {
    async fn search(&self, request: SearchRequest) -> Result<Vec<ContentBlock>> {
        *self.seen.lock().unwrap() = Some(request);
        match &self.blocks {
            Some(blocks) => Ok(blocks.clone()),
            None => anyhow::bail!("Search API error 500 Internal Server Error: overloaded"),
        }
    }

    fn model(&self) -> &str {
        "canned-model"
    }
}

fn pune() -> PlaceRecord {
    PlaceRecord {
        city: Some("Pune".to_string()),
        region: Some("Maharashtra".to_string()),
        country: Some("India".to_string()),
        country_code: "IN".to_string(),
        timezone: "UTC".to_string(),
        raw_address: "Pune, Maharashtra, India".to_string(),
    }
}

fn request(max_results: Option<i64>, time_range: Option<&str>) -> LocationRequest {
    LocationRequest {
        latitude: 18.52,
        longitude: 73.85,
        radius: 10.0,
        max_results,
        time_range: time_range.map(str::to_string),
    }
}

fn service(provider: Arc<CannedProvider>) -> NewsService {
    NewsService::new(
        Arc::new(FixedResolver { place: Some(pune()) }),
        provider,
        QueryOptions::default(),
    )
}

fn raw(url: &str, title: &str) -> RawSearchResult {
    RawSearchResult {
        url: url.to_string(),
        title: Some(title.to_string()),
        snippet: Some(format!("{} snippet", title)),
        page_age: Some("1 days ago".to_string()),
    }
}

fn cite(url: &str, title: &str) -> CitationRef {
    CitationRef {
        url: url.to_string(),
        title: Some(title.to_string()),
        cited_text: Some(format!("{} cited", title)),
    }
}

#[tokio::test]
async fn test_cited_articles_build_envelope() {
    let provider = Arc::new(CannedProvider::ok(vec![
        ContentBlock::Other,
        ContentBlock::SearchResultBundle(vec![raw("https://www.punemirror.com/metro", "Metro")]),
        ContentBlock::TextWithCitations(vec![
            cite("https://www.punemirror.com/metro", "Metro"),
            cite("https://example.org/water", "Water cuts"),
        ]),
    ]));
    let news = service(provider.clone());

    let response = news.search(&request(None, Some("48h"))).await.expect("response");

    assert_eq!(response.articles.len(), 2);
    assert_eq!(response.metadata.total_results, 2);
    assert_eq!(response.metadata.search_radius, "10.0km");
    assert_eq!(response.metadata.time_range, "48h");
    assert_eq!(response.metadata.location, pune());
    assert_eq!(response.search_info.model_used, "canned-model");
    assert_eq!(response.search_info.coordinates.latitude, 18.52);
    assert!(response.search_info.timestamp > 0.0);

    let metro = &response.articles[0];
    assert_eq!(metro.source, "punemirror.com");
    assert_eq!(metro.relevance_score, 0.85);
    assert_eq!(metro.content, "Metro cited...");
    assert!(metro.published_date.is_some());
    assert_eq!(metro.citations.len(), 1);

    // Cited but never returned as a raw result
    let water = &response.articles[1];
    assert_eq!(water.source, "example.org");
    assert!(water.published_date.is_none());

    let seen = provider.seen.lock().unwrap().clone().expect("provider called");
    assert!(seen.query.contains("within the last 2 days in a 10.0km radius"));
    assert_eq!(seen.tool.user_location.country, "IN");
    assert_eq!(seen.tool.max_uses, 3);
}

#[tokio::test]
async fn test_raw_results_used_without_citations() {
    let provider = Arc::new(CannedProvider::ok(vec![ContentBlock::SearchResultBundle(vec![
        raw("https://a.example/1", "One"),
        raw("https://b.example/2", "Two"),
    ])]));

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.metadata.time_range, "24h");
    assert_eq!(response.articles.len(), 2);
    assert!(response.articles.iter().all(|a| a.relevance_score == 0.7));
    assert!(response.articles.iter().all(|a| a.citations.is_empty()));
    assert_eq!(response.articles[1].title, "Two");
}

#[tokio::test]
async fn test_results_truncated_to_max_results() {
    let results: Vec<RawSearchResult> = (0..8)
        .map(|i| raw(&format!("https://news.example/{}", i), &format!("Story {}", i)))
        .collect();
    let provider = Arc::new(CannedProvider::ok(vec![ContentBlock::SearchResultBundle(results)]));

    let response = service(provider).search(&request(Some(3), None)).await.expect("response");

    assert_eq!(response.articles.len(), 3);
    assert_eq!(response.metadata.total_results, 3);
    assert_eq!(response.articles[2].title, "Story 2");
}

#[tokio::test]
async fn test_empty_response_yields_placeholder() {
    let provider = Arc::new(CannedProvider::ok(Vec::new()));

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.articles.len(), 1);
    let placeholder = &response.articles[0];
    assert_eq!(placeholder.title, "News Update");
    assert_eq!(placeholder.source, "System");
    assert_eq!(placeholder.url, "");
    assert_eq!(placeholder.relevance_score, 0.1);
    assert_eq!(placeholder.content, "No valid response from news service.");
}

#[tokio::test]
async fn test_blocks_without_news_yield_placeholder() {
    let provider = Arc::new(CannedProvider::ok(vec![
        ContentBlock::Other,
        ContentBlock::TextWithCitations(Vec::new()),
    ]));

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.articles.len(), 1);
    assert_eq!(response.articles[0].content, "No news found for your criteria.");
}

#[tokio::test]
async fn test_provider_failure_yields_diagnostic_article() {
    let provider = Arc::new(CannedProvider::failing());

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.articles.len(), 1);
    let article = &response.articles[0];
    assert_eq!(article.source, "System");
    assert!(article.content.starts_with("Error during news search:"));
    assert!(article.content.contains("overloaded"));
}

#[tokio::test]
async fn test_validation_runs_before_resolution() {
    let provider = Arc::new(CannedProvider::ok(Vec::new()));
    let news = service(provider.clone());

    let mut bad = request(None, None);
    bad.latitude = 91.0;
    let err = news.search(&bad).await.unwrap_err();
    assert!(matches!(err, NewsError::Validation(_)));

    let err = news.search(&request(Some(0), None)).await.unwrap_err();
    assert!(matches!(err, NewsError::Validation(_)));

    let err = news.search(&request(None, Some("1y"))).await.unwrap_err();
    assert!(matches!(err, NewsError::Validation(_)));

    assert!(provider.seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_resolution_failure_is_an_error() {
    let provider = Arc::new(CannedProvider::ok(Vec::new()));
    let news = NewsService::new(Arc::new(FixedResolver { place: None }), provider.clone(), QueryOptions::default());

    let err = news.search(&request(None, None)).await.unwrap_err();
    match err {
        NewsError::Resolution(e) => assert!(e.to_string().contains("Geocoding service error")),
        other => panic!("expected resolution error, got {:?}", other),
    }
    assert!(provider.seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_citation_without_url_still_returns_articles() {
    let provider = Arc::new(CannedProvider::ok(vec![ContentBlock::TextWithCitations(vec![CitationRef {
        url: String::new(),
        title: Some("Unlinked".to_string()),
        cited_text: Some("quoted text".to_string()),
    }])]));

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.articles.len(), 1);
    assert_eq!(response.metadata.total_results, 1);
    assert_eq!(response.articles[0].source, "System");
    assert_eq!(response.articles[0].content, "No news found for your criteria.");
}

#[tokio::test]
async fn test_result_without_url_still_returns_articles() {
    let provider = Arc::new(CannedProvider::ok(vec![ContentBlock::SearchResultBundle(vec![raw("", "Unlinked")])]));

    let response = service(provider).search(&request(None, None)).await.expect("response");

    assert_eq!(response.articles.len(), 1);
    assert_eq!(response.articles[0].source, "System");
}

#[tokio::test]
async fn test_article_count_stays_within_bounds() {
    let mixed = vec![
        raw("", "Unlinked one"),
        raw("https://news.example/a", "A"),
        raw("", "Unlinked two"),
        raw("https://news.example/b", "B"),
        raw("https://news.example/c", "C"),
    ];
    for max_results in 1..=4 {
        let provider = Arc::new(CannedProvider::ok(vec![
            ContentBlock::SearchResultBundle(mixed.clone()),
            ContentBlock::TextWithCitations(vec![cite("", "Unlinked")]),
        ]));
        let response = service(provider)
            .search(&request(Some(max_results), None))
            .await
            .expect("response");

        let count = response.articles.len();
        assert!(count >= 1 && count <= max_results as usize, "{} articles for max {}", count, max_results);
        assert_eq!(response.metadata.total_results, count);
        assert!(response.articles.iter().all(|a| !a.url.is_empty()));
        assert!(response.articles.iter().all(|a| a.validate().is_ok()));
    }
}
