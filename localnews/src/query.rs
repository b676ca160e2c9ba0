// Search query construction
use common::SearchConfig;
use tracing::warn;

use crate::llm::{ApproximateLocation, SearchRequest, WebSearchTool};
use crate::models::{format_radius, PlaceRecord, SearchParameters};

/// Conservative cap on web searches per request
pub const DEFAULT_MAX_USES: u32 = 3;

/// Options that shape the tool descriptor but do not come from the client.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_uses: u32,
    pub max_tokens: Option<usize>,
    pub allowed_domains: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_uses: DEFAULT_MAX_USES,
            max_tokens: None,
            allowed_domains: Vec::new(),
        }
    }
}

impl QueryOptions {
    pub fn from_config(search: &SearchConfig) -> Self {
        Self {
            max_uses: search.max_uses.unwrap_or(DEFAULT_MAX_USES),
            max_tokens: search.max_tokens,
            allowed_domains: search.allowed_domains.clone(),
        }
    }
}

/// Number of days covered by a time range label.
pub fn time_range_days(time_range: &str) -> u32 {
    match time_range {
        "24h" => 1,
        "48h" => 2,
        "7d" => 7,
        other => {
            warn!("Unexpected time_range value: {}, defaulting to 1 day.", other);
            1
        }
    }
}

/// The natural-language prompt sent to the model.
pub fn build_query_text(place: &PlaceRecord, params: &SearchParameters) -> String {
    format!(
        "Find recent local news from {}, {}, {} within the last {} days in a {} radius. \
         Focus on important local events, government updates, and community developments.",
        place.city.as_deref().unwrap_or(""),
        place.region.as_deref().unwrap_or(""),
        place.country.as_deref().unwrap_or(""),
        time_range_days(&params.time_range),
        format_radius(params.radius),
    )
}

pub fn build_tool(place: &PlaceRecord, options: &QueryOptions) -> WebSearchTool {
    WebSearchTool {
        kind: "web_search_20250305",
        name: "web_search",
        max_uses: options.max_uses,
        allowed_domains: options.allowed_domains.clone(),
        user_location: ApproximateLocation {
            kind: "approximate",
            city: place.city.clone().unwrap_or_default(),
            region: place.region.clone().unwrap_or_default(),
            country: place.country_code.clone(),
            timezone: if place.timezone.is_empty() {
                "UTC".to_string()
            } else {
                place.timezone.clone()
            },
        },
    }
}

pub fn build_search_request(place: &PlaceRecord, params: &SearchParameters, options: &QueryOptions) -> SearchRequest {
    SearchRequest {
        query: build_query_text(place, params),
        tool: build_tool(place, options),
        max_tokens: options.max_tokens,
    }
}
