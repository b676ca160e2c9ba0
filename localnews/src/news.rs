//! Request orchestration: place → query → search tool → articles → response envelope.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::geocoding::PlaceResolver;
use crate::llm::SearchProvider;
use crate::models::{
    format_radius, Article, Coordinates, LocationRequest, NewsResponse, PlaceRecord, SearchInfo,
    SearchMetadata, SearchParameters, ValidationError,
};
use crate::processing::{placeholder_article, process_search_response, NO_NEWS_MESSAGE};
use crate::query::{build_search_request, QueryOptions};

#[derive(Debug, Error)]
pub enum NewsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Upstream geocoding failed; the message carries the upstream error text
    #[error("{0:#}")]
    Resolution(anyhow::Error),
}

pub struct NewsService {
    resolver: Arc<dyn PlaceResolver>,
    provider: Arc<dyn SearchProvider>,
    options: QueryOptions,
}

impl NewsService {
    pub fn new(resolver: Arc<dyn PlaceResolver>, provider: Arc<dyn SearchProvider>, options: QueryOptions) -> Self {
        Self {
            resolver,
            provider,
            options,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn resolver(&self) -> &dyn PlaceResolver {
        self.resolver.as_ref()
    }

    /// Full request path. Only validation and place resolution can fail; search problems
    /// surface as a diagnostic article instead.
    pub async fn search(&self, request: &LocationRequest) -> Result<NewsResponse, NewsError> {
        let params = request.validate()?;
        info!(
            latitude = request.latitude,
            longitude = request.longitude,
            "Received search request"
        );

        let place = self
            .resolver
            .resolve(request.latitude, request.longitude)
            .await
            .map_err(NewsError::Resolution)?;
        info!(address = %place.raw_address, "Location info retrieved");

        let results = self.search_local_news(&place, &params).await;
        info!("Found {} news results", results.len());

        let articles = retain_valid_articles(results, &place);

        Ok(NewsResponse {
            metadata: SearchMetadata {
                total_results: articles.len(),
                search_radius: format_radius(params.radius),
                time_range: params.time_range.clone(),
                location: place,
            },
            search_info: SearchInfo {
                timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
                coordinates: Coordinates {
                    latitude: request.latitude,
                    longitude: request.longitude,
                },
                model_used: self.provider.model().to_string(),
            },
            articles,
        })
    }

    /// Query the search tool for `place` and normalize what comes back.
    /// Always returns between 1 and `params.max_results` articles.
    pub async fn search_local_news(&self, place: &PlaceRecord, params: &SearchParameters) -> Vec<Article> {
        let request = build_search_request(place, params, &self.options);
        info!(query = %request.query, "Searching for local news");

        let mut articles = match self.provider.search(request).await {
            Ok(blocks) => process_search_response(&blocks, place),
            Err(e) => {
                warn!("Error during search call or processing: {:#}", e);
                vec![placeholder_article(&format!("Error during news search: {:#}", e), place)]
            }
        };
        info!("Extracted {} articles from the response.", articles.len());

        articles.truncate(params.max_results);
        articles
    }
}

/// Drop articles that fail outward validation. If nothing survives, the caller still
/// gets the "no news" placeholder.
pub fn retain_valid_articles(articles: Vec<Article>, place: &PlaceRecord) -> Vec<Article> {
    let valid: Vec<Article> = articles
        .into_iter()
        .filter(|article| match article.validate() {
            Ok(()) => true,
            Err(e) => {
                error!("Error processing article: {}", e);
                false
            }
        })
        .collect();

    if valid.is_empty() {
        warn!("No valid articles left after validation");
        return vec![placeholder_article(NO_NEWS_MESSAGE, place)];
    }
    valid
}
