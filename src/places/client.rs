use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::types::{
    Circle, Coordinates, GeocodeResponse, LatLng, LocationBias, Place, SearchTextRequest,
    SearchTextResponse,
};
use crate::config::GoogleConfig;
use crate::error::{Error, Result};
use crate::utils::retry::{send_with_retry, RetryPolicy};

const SEARCH_FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.location,places.rating,places.userRatingCount,places.types,places.id,places.nationalPhoneNumber,places.websiteUri,places.businessStatus";

const DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,location,rating,userRatingCount,types,nationalPhoneNumber,websiteUri,businessStatus,regularOpeningHours,reviews";

/// Client for the Google Geocoding and Places (v1) APIs
#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: Client,
    api_key: Option<String>,
    geocode_url: String,
    places_base_url: String,
    max_result_count: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl PlacesClient {
    pub fn new(client: Client, config: &GoogleConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            geocode_url: config.geocode_url.clone(),
            places_base_url: config.places_base_url.trim_end_matches('/').to_string(),
            max_result_count: config.max_result_count,
            timeout: Duration::from_secs(config.timeout_secs),
            retry,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("Google Maps API key not set".to_string()))
    }

    /// Resolve a free-form location to coordinates (first geocoder match)
    pub async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let key = self.api_key()?;
        debug!("Geocoding location: {}", address);

        let request = self
            .client
            .get(&self.geocode_url)
            .query(&[("address", address), ("key", key)])
            .timeout(self.timeout);
        let response = send_with_retry(request, &self.retry, "Geocoding API").await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Geocoding(format!("{} - {}", status, body)));
        }

        let payload: GeocodeResponse = response.json().await?;
        match payload.status.as_str() {
            "OK" | "" | "ZERO_RESULTS" => {}
            other => {
                return Err(Error::Geocoding(format!(
                    "{}: {}",
                    other,
                    payload.error_message.unwrap_or_default()
                )))
            }
        }

        let location = payload
            .results
            .into_iter()
            .next()
            .map(|r| r.geometry.location)
            .ok_or(Error::LocationNotFound)?;

        debug!("Geocoded to: {}, {}", location.lat, location.lng);
        Ok(location)
    }

    /// Text search biased to a circle around `center`
    pub async fn search_text(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: f64,
    ) -> Result<Vec<Place>> {
        let key = self.api_key()?;
        let url = format!("{}/v1/places:searchText", self.places_base_url);
        let body = SearchTextRequest {
            text_query: query,
            location_bias: LocationBias {
                circle: Circle {
                    center: LatLng {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: radius_meters,
                },
            },
            max_result_count: self.max_result_count,
        };

        let request = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&body)
            .timeout(self.timeout);
        let response = send_with_retry(request, &self.retry, "Places searchText").await?;

        let status = response.status();
        debug!("Places response status for '{}': {}", query, status);
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            warn!("Places API error for '{}': {}", query, text);
            return Err(Error::Places(format!("{} - {}", status, text)));
        }

        let result: SearchTextResponse = response.json().await?;
        debug!("Found {} results for '{}'", result.places.len(), query);
        Ok(result.places)
    }

    /// `{base}/v1/places/{id}` with the id encoded as a single path segment
    fn details_url(&self, place_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.places_base_url)
            .map_err(|e| Error::Config(format!("Invalid Places base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Places base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v1", "places", place_id]);
        Ok(url)
    }

    /// Full record for one place, `None` when the identifier is unknown
    pub async fn place_details(&self, place_id: &str) -> Result<Option<Place>> {
        let key = self.api_key()?;
        let url = self.details_url(place_id)?;

        let request = self
            .client
            .get(url)
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .timeout(self.timeout);
        let response = send_with_retry(request, &self.retry, "Places details").await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // An unknown or malformed id surfaces as INVALID_ARGUMENT
            if status == StatusCode::BAD_REQUEST && text.contains("INVALID_ARGUMENT") {
                return Ok(None);
            }
            return Err(Error::Places(format!("{} - {}", status, text)));
        }

        Ok(Some(response.json().await?))
    }
}
