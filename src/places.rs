//! Place suggestions for choosing origin and destination taxi ranks.
//!
//! Suggestions only seed a route's endpoints. A failing search must never
//! stop the operator from drawing, so the adapter turns every failure into
//! an empty suggestion list.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::geo::{Bounds, GeoPoint};
use crate::traits::PlacesProvider;

/// A geocoded place usable as a route endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPlace {
    pub name: String,
    pub position: GeoPoint,
    /// The provider's record, kept verbatim for the caller.
    pub raw: serde_json::Value,
}

impl NamedPlace {
    pub fn new(name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            name: name.into(),
            position,
            raw: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub text: String,
    /// Region to bias (or restrict) results to.
    pub bias: Option<Bounds>,
    pub limit: Option<usize>,
}

impl PlaceQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bias: None,
            limit: None,
        }
    }

    pub fn biased_to(mut self, bounds: Bounds) -> Self {
        self.bias = Some(bounds);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Wraps a [`PlacesProvider`] so failures degrade to "no suggestions".
#[derive(Debug, Clone)]
pub struct PlacesAdapter<P> {
    provider: P,
}

impl<P: PlacesProvider> PlacesAdapter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn suggest(&self, query: &PlaceQuery) -> Vec<NamedPlace> {
        if query.text.trim().is_empty() {
            return Vec::new();
        }

        match self.provider.search(query) {
            Ok(mut places) => {
                places.retain(|place| place.position.is_finite());
                if let Some(limit) = query.limit {
                    places.truncate(limit);
                }
                debug!(query = %query.text, count = places.len(), "place suggestions");
                places
            }
            Err(err) => {
                warn!(query = %query.text, error = %err, "place search failed, showing no suggestions");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub limit: usize,
    /// ISO 3166-1 alpha-2 codes, comma separated, e.g. "za".
    pub country_codes: Option<String>,
    pub user_agent: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 5,
            limit: 8,
            country_codes: None,
            user_agent: concat!("route-sketch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Nominatim search client.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: PlacesConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: PlacesConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    fn search_params(&self, query: &PlaceQuery) -> Vec<(&'static str, String)> {
        let limit = query.limit.unwrap_or(self.config.limit);
        let mut params = vec![
            ("q", query.text.trim().to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(bounds) = query.bias {
            // left,top,right,bottom
            params.push((
                "viewbox",
                format!(
                    "{:.6},{:.6},{:.6},{:.6}",
                    bounds.south_west.lng, bounds.north_east.lat, bounds.north_east.lng, bounds.south_west.lat
                ),
            ));
            params.push(("bounded", "1".to_string()));
        }
        if let Some(codes) = &self.config.country_codes {
            params.push(("countrycodes", codes.clone()));
        }
        params
    }
}

impl PlacesProvider for NominatimClient {
    fn search(&self, query: &PlaceQuery) -> Result<Vec<NamedPlace>, ProviderError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let records = self
            .client
            .get(url)
            .query(&self.search_params(query))
            .send()
            .and_then(|resp| resp.error_for_status())?
            .json::<Vec<serde_json::Value>>()?;

        Ok(parse_places(records))
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
}

/// Records without a usable name or position are skipped.
fn parse_places(records: Vec<serde_json::Value>) -> Vec<NamedPlace> {
    records
        .into_iter()
        .filter_map(|raw| {
            let place = NominatimPlace::deserialize(&raw).ok()?;
            let lat = place.lat.parse::<f64>().ok()?;
            let lng = place.lon.parse::<f64>().ok()?;
            Some(NamedPlace {
                name: place.display_name,
                position: GeoPoint::new(lng, lat),
                raw,
            })
        })
        .collect()
}
