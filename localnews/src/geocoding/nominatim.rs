use anyhow::{Context, Result};
use common::GeocodingConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{PlaceCache, PlaceResolver};
use crate::models::PlaceRecord;

/// Reverse geocoder backed by an OpenStreetMap Nominatim endpoint, memoized per coordinate pair.
pub struct NominatimResolver {
    api_url: String,
    language: String,
    client: Client,
    cache: PlaceCache,
}

impl NominatimResolver {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.unwrap_or(10)))
            .user_agent(config.user_agent())
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            api_url: config.api_url().to_string(),
            language: config.language().to_string(),
            client,
            cache: PlaceCache::new(),
        })
    }

    /// Replace the cache, e.g. to start a test from a known state.
    pub fn with_cache(mut self, cache: PlaceCache) -> Self {
        self.cache = cache;
        self
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<PlaceRecord> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .await
            .context("Geocoding service error")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Geocoding service error: status {}", status);
        }

        let body: ReverseResponse = response
            .json()
            .await
            .context("Geocoding service error: unreadable response")?;

        if let Some(err) = body.error {
            anyhow::bail!("Could not find location information: {}", err);
        }
        let display_name = body
            .display_name
            .context("Could not find location information")?;

        Ok(place_from_address(body.address.unwrap_or_default(), display_name))
    }
}

#[async_trait::async_trait]
impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<PlaceRecord> {
        if let Some(place) = self.cache.get(latitude, longitude) {
            debug!(latitude, longitude, "place cache hit");
            return Ok(place);
        }

        let place = self.lookup(latitude, longitude).await?;
        info!(latitude, longitude, address = %place.raw_address, "resolved place");
        self.cache.insert(latitude, longitude, place.clone());
        Ok(place)
    }

    fn cached_places(&self) -> usize {
        self.cache.len()
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn place_from_address(address: Address, display_name: String) -> PlaceRecord {
    PlaceRecord {
        city: address.city.or(address.town).or(address.village),
        region: address.state.or(address.county),
        country: address.country,
        country_code: address.country_code.unwrap_or_default().to_uppercase(),
        timezone: "UTC".to_string(),
        raw_address: display_name,
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}
