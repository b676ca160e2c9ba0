//! Request and response types exchanged with API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::dates;

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_TIME_RANGE: &str = "24h";
pub const VALID_TIME_RANGES: [&str; 3] = ["24h", "48h", "7d"];

/// A resolved place. Created by the place resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2, upper case; empty when unknown
    #[serde(default)]
    pub country_code: String,
    pub timezone: String,
    #[serde(default)]
    pub raw_address: String,
}

/// Inbound body of `POST /search-news`.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometers
    pub radius: f64,
    #[serde(default)]
    pub max_results: Option<i64>,
    #[serde(default)]
    pub time_range: Option<String>,
}

/// Validated search knobs handed to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParameters {
    pub radius: f64,
    pub max_results: usize,
    pub time_range: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
    #[error("radius must be greater than 0 and at most 100, got {0}")]
    Radius(f64),
    #[error("max_results must be between 1 and 20, got {0}")]
    MaxResults(i64),
    #[error("time_range must be one of 24h, 48h, 7d, got '{0}'")]
    TimeRange(String),
}

impl LocationRequest {
    /// Check every field range and produce the parameters the core works with.
    pub fn validate(&self) -> Result<SearchParameters, ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::Longitude(self.longitude));
        }
        // NaN fails both comparisons
        if !(self.radius > 0.0 && self.radius <= 100.0) {
            return Err(ValidationError::Radius(self.radius));
        }

        let max_results = match self.max_results {
            None => DEFAULT_MAX_RESULTS,
            Some(n) if (1..=20).contains(&n) => n as usize,
            Some(n) => return Err(ValidationError::MaxResults(n)),
        };

        let time_range = match self.time_range.as_deref() {
            None => DEFAULT_TIME_RANGE.to_string(),
            Some(t) if VALID_TIME_RANGES.contains(&t) => t.to_string(),
            Some(t) => return Err(ValidationError::TimeRange(t.to_string())),
        };

        Ok(SearchParameters {
            radius: self.radius,
            max_results,
            time_range,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    pub cited_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub source: String,
    pub url: String,
    /// Free-text dates are coerced on the way in; anything unparsable becomes `None`.
    #[serde(default, deserialize_with = "deserialize_published_date")]
    pub published_date: Option<DateTime<Utc>>,
    pub location: PlaceRecord,
    pub relevance_score: f64,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ArticleError {
    #[error("relevance score {0} is outside 0.0..=1.0")]
    RelevanceOutOfRange(f64),
    #[error("article '{0}' has no url")]
    MissingUrl(String),
}

impl Article {
    /// Checks the invariants an article must satisfy before it is returned to a client.
    /// Only the synthetic "System" article may have an empty url.
    pub fn validate(&self) -> Result<(), ArticleError> {
        if !(0.0..=1.0).contains(&self.relevance_score) {
            return Err(ArticleError::RelevanceOutOfRange(self.relevance_score));
        }
        if self.url.is_empty() && self.source != "System" {
            return Err(ArticleError::MissingUrl(self.title.clone()));
        }
        Ok(())
    }
}

fn deserialize_published_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(dates::coerce_published_date(raw.as_deref()))
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub total_results: usize,
    pub search_radius: String,
    pub time_range: String,
    pub location: PlaceRecord,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchInfo {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub coordinates: Coordinates,
    pub model_used: String,
}

/// Outbound body of `POST /search-news`.
#[derive(Debug, Clone, Serialize)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
    pub metadata: SearchMetadata,
    pub search_info: SearchInfo,
}

/// Renders a radius the way clients expect it, e.g. `10.0km` or `2.5km`.
pub fn format_radius(radius: f64) -> String {
    if radius.fract() == 0.0 {
        format!("{:.1}km", radius)
    } else {
        format!("{}km", radius)
    }
}
