//! Geocoding client — the single point of entry for all Places API calls.
//!
//! No other module may talk to the geocoding endpoint directly; the
//! reconciler sees only the [`Geocoder`] trait and [`enrich`].

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const PLACES_API_URL: &str = "https://places.googleapis.com/v1/places:searchText";
const PLACES_FIELD_MASK: &str =
    "places.formattedAddress,places.addressComponents,places.location";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Places API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no place found for '{0}'")]
    NoResult(String),

    #[error("malformed place payload: missing '{0}'")]
    MalformedPlace(&'static str),
}

#[derive(Debug, Serialize)]
struct TextSearchRequest<'a> {
    #[serde(rename = "textQuery")]
    text_query: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextSearchResponse {
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    pub location: Option<LatLng>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponent {
    pub short_text: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Seam for the geocoding collaborator; the production implementation is
/// [`PlacesClient`], tests substitute a stub.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search_text(&self, query: &str) -> Result<TextSearchResponse, GeocodeError>;
}

/// Structured geographic attributes projected from the first candidate
/// place. Each component is optional; coordinates are always present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDetails {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Google Places text-search client.
pub struct PlacesClient {
    client: Client,
    api_key: String,
}

impl PlacesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for PlacesClient {
    async fn search_text(&self, query: &str) -> Result<TextSearchResponse, GeocodeError> {
        let response = self
            .client
            .post(PLACES_API_URL)
            .header("Content-Type", "application/json")
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", PLACES_FIELD_MASK)
            .json(&TextSearchRequest { text_query: query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TextSearchResponse = response.json().await?;
        debug!(query, candidates = parsed.places.len(), "places lookup");
        Ok(parsed)
    }
}

/// Resolves free-text location into structured attributes, using only the
/// first candidate place. Zero candidates or a candidate without
/// coordinates is an [`GeocodeError`]; callers treat it as a per-record
/// failure, never as fatal to the run.
pub async fn enrich(
    geocoder: &dyn Geocoder,
    location_text: &str,
) -> Result<LocationDetails, GeocodeError> {
    let response = geocoder.search_text(location_text).await?;
    let place = response
        .places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NoResult(location_text.to_string()))?;
    debug!(
        query = location_text,
        resolved = place.formatted_address.as_deref().unwrap_or(""),
        "using first candidate"
    );
    project_place(place)
}

fn project_place(place: Place) -> Result<LocationDetails, GeocodeError> {
    let coordinates = place
        .location
        .ok_or(GeocodeError::MalformedPlace("location"))?;

    // Every type listed for a component maps to that component's short text;
    // later components win on collision, matching the remote payload order.
    let mut components: HashMap<&str, &str> = HashMap::new();
    for component in &place.address_components {
        if let Some(short) = component.short_text.as_deref() {
            for component_type in &component.types {
                components.insert(component_type.as_str(), short);
            }
        }
    }

    Ok(LocationDetails {
        city: components.get("locality").map(|s| s.to_string()),
        state: components
            .get("administrative_area_level_1")
            .map(|s| s.to_string()),
        country: components.get("country").map(|s| s.to_string()),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
    })
}
