//! OSRM HTTP adapter for road-following route segments.

use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::polyline::Polyline;
use crate::traits::RoutingProvider;

/// Geometry encoding requested from OSRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsrmGeometry {
    GeoJson,
    /// Encoded polyline with six decimal digits.
    Polyline6,
}

impl OsrmGeometry {
    fn as_param(self) -> &'static str {
        match self {
            OsrmGeometry::GeoJson => "geojson",
            OsrmGeometry::Polyline6 => "polyline6",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    pub geometry: OsrmGeometry,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
            geometry: OsrmGeometry::GeoJson,
        }
    }
}

impl OsrmConfig {
    /// Defaults overridden by `OSRM_BASE_URL`, `OSRM_PROFILE` and
    /// `OSRM_TIMEOUT_SECS` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("OSRM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(profile) = std::env::var("OSRM_PROFILE") {
            config.profile = profile;
        }
        if let Some(timeout) = std::env::var("OSRM_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
        {
            config.timeout_secs = timeout;
        }
        config
    }

    fn route_url(&self, from: GeoPoint, to: GeoPoint) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries={}",
            self.base_url.trim_end_matches('/'),
            self.profile,
            from.lng,
            from.lat,
            to.lng,
            to.lat,
            self.geometry.as_param()
        )
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    /// Builds a client whose requests give up after `timeout_secs`, so a hung
    /// server degrades to the straight-line fallback instead of blocking.
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }
}

impl RoutingProvider for OsrmClient {
    fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, ProviderError> {
        let url = self.config.route_url(from, to);
        debug!(%url, "requesting OSRM route");

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())?
            .json::<OsrmRouteResponse>()?;

        parse_route(body)
    }
}

fn parse_route(body: OsrmRouteResponse) -> Result<Vec<GeoPoint>, ProviderError> {
    if body.code != "Ok" {
        return Err(ProviderError::Status(match body.message {
            Some(message) => format!("{}: {}", body.code, message),
            None => body.code,
        }));
    }

    let route = body
        .routes
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyGeometry)?;

    let points = match route.geometry {
        OsrmRouteGeometry::GeoJson { coordinates } => {
            coordinates.into_iter().map(GeoPoint::from).collect::<Vec<_>>()
        }
        OsrmRouteGeometry::Encoded(encoded) => Polyline::decode(&encoded, 6)
            .ok_or_else(|| ProviderError::Malformed("undecodable polyline6 geometry".to_string()))?
            .into_points(),
    };

    if points.is_empty() {
        return Err(ProviderError::EmptyGeometry);
    }
    Ok(points)
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmRouteGeometry,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OsrmRouteGeometry {
    GeoJson { coordinates: Vec<(f64, f64)> },
    Encoded(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<GeoPoint>, ProviderError> {
        parse_route(serde_json::from_str(json).expect("valid OSRM JSON"))
    }

    #[test]
    fn test_route_url() {
        let config = OsrmConfig {
            base_url: "http://osrm.local/".to_string(),
            ..OsrmConfig::default()
        };
        let url = config.route_url(GeoPoint::new(28.0, -26.2), GeoPoint::new(28.1, -26.3));
        assert_eq!(
            url,
            "http://osrm.local/route/v1/car/28.000000,-26.200000;28.100000,-26.300000?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn test_parse_geojson_geometry() {
        let points = parse(
            r#"{"code":"Ok","routes":[{"distance":1200.5,"duration":90.1,
                "geometry":{"type":"LineString","coordinates":[[28.0,-26.2],[28.05,-26.25],[28.1,-26.3]]}}]}"#,
        )
        .unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], GeoPoint::new(28.05, -26.25));
    }

    #[test]
    fn test_parse_polyline6_geometry() {
        let expected = Polyline::new(vec![GeoPoint::new(28.0, -26.2), GeoPoint::new(28.1, -26.3)]);
        let json = format!(r#"{{"code":"Ok","routes":[{{"geometry":"{}"}}]}}"#, expected.encode(6));
        let points = parse(&json).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[1].lng - 28.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_error_code() {
        let err = parse(r#"{"code":"NoRoute","message":"Impossible route between points"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Status(ref msg) if msg.starts_with("NoRoute")));
    }

    #[test]
    fn test_parse_empty_routes() {
        let err = parse(r#"{"code":"Ok","routes":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyGeometry));
        let err = parse(r#"{"code":"Ok","routes":[{"geometry":{"coordinates":[]}}]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyGeometry));
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..OsrmConfig::default()
        })
        .unwrap();
        assert!(client.route(GeoPoint::new(28.0, -26.2), GeoPoint::new(28.1, -26.3)).is_err());
    }

    #[test]
    fn test_adapter_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<crate::routing::RoutingAdapter<OsrmClient>>();
    }
}
