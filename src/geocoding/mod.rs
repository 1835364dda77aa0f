//! Address to coordinate lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::domain::GeoPoint;
use crate::openrouter::endpoint;

const USER_AGENT: &str = concat!(
    "tendermatch/",
    env!("CARGO_PKG_VERSION"),
    " (procurement matching)"
);

/// Errors raised by geocoding backends.
#[derive(Debug, Error)]
pub enum GeocodingError {
    /// The lookup service was unreachable or answered with an error status.
    #[error("Geocoding request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for GeocodingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Resolves postal addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for the address, or `None` when nothing matches.
    async fn geocode(
        &self,
        postal_code: Option<&str>,
        city: Option<&str>,
        country: Option<&str>,
    ) -> Result<Option<GeoPoint>, GeocodingError>;
}

/// Geocoder used when `GEOCODING_ENABLED=false`; never resolves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(
        &self,
        _postal_code: Option<&str>,
        _city: Option<&str>,
        _country: Option<&str>,
    ) -> Result<Option<GeoPoint>, GeocodingError> {
        Ok(None)
    }
}

/// OpenStreetMap Nominatim search client.
pub struct NominatimGeocoder {
    client: Client,
    search_url: String,
    country_codes: String,
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    /// Client for the Nominatim instance at `base_url`, restricted to `country_codes`.
    pub fn new(
        base_url: &str,
        country_codes: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            search_url: endpoint(base_url, "search"),
            country_codes: country_codes.into(),
        })
    }

    /// Client configured through `GEOCODING_*`.
    pub fn from_config(config: &Config) -> Result<Self, GeocodingError> {
        Self::new(
            &config.geocoding_url,
            config.geocoding_country_codes.clone(),
            Duration::from_secs(config.geocoding_timeout_secs),
        )
    }
}

/// `"<postal> <city>, <country>"` with blank parts left out.
fn search_query(postal_code: Option<&str>, city: Option<&str>, country: Option<&str>) -> String {
    let place = [postal_code, city]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(country) if !place.is_empty() => format!("{place}, {country}"),
        _ => place,
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        postal_code: Option<&str>,
        city: Option<&str>,
        country: Option<&str>,
    ) -> Result<Option<GeoPoint>, GeocodingError> {
        let query = search_query(postal_code, city, country);
        if query.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", self.country_codes.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodingError::Request(format!("status {status}")));
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let point = places.into_iter().next().and_then(|place| {
            let lat = place.lat.trim().parse().ok()?;
            let lon = place.lon.trim().parse().ok()?;
            Some(GeoPoint::new(lat, lon))
        });
        tracing::debug!(%query, found = point.is_some(), "Geocoded address");
        Ok(point)
    }
}

/// Geocoder selected by `GEOCODING_ENABLED`.
pub fn get_geocoder(config: &Config) -> Result<std::sync::Arc<dyn Geocoder>, GeocodingError> {
    if config.geocoding_enabled {
        Ok(std::sync::Arc::new(NominatimGeocoder::from_config(config)?))
    } else {
        Ok(std::sync::Arc::new(DisabledGeocoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn geocoder(server: &MockServer) -> NominatimGeocoder {
        NominatimGeocoder::new(&server.base_url(), "de", Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn query_skips_blank_parts() {
        assert_eq!(
            search_query(Some("84034"), Some("Landshut"), Some("DE")),
            "84034 Landshut, DE"
        );
        assert_eq!(search_query(None, Some("Landshut"), None), "Landshut");
        assert_eq!(search_query(Some(" "), None, Some("DE")), "");
    }

    #[tokio::test]
    async fn resolves_first_place() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("q", "84034 Landshut, DE")
                    .query_param("format", "json")
                    .query_param("limit", "1")
                    .query_param("countrycodes", "de")
                    .header_exists("user-agent");
                then.status(200).json_body(json!([
                    { "lat": "48.5371", "lon": "12.1520", "display_name": "Landshut" }
                ]));
            })
            .await;

        let point = geocoder(&server)
            .geocode(Some("84034"), Some("Landshut"), Some("DE"))
            .await
            .expect("lookup");
        mock.assert_async().await;
        assert_eq!(point, Some(GeoPoint::new(48.5371, 12.152)));
    }

    #[tokio::test]
    async fn no_result_or_bad_coordinates_is_unknown() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("q", "Nirgendwo");
                then.status(200).json_body(json!([]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("q", "Kaputt");
                then.status(200).json_body(json!([{ "lat": "n/a", "lon": "12" }]));
            })
            .await;

        let geocoder = geocoder(&server);
        assert_eq!(geocoder.geocode(None, Some("Nirgendwo"), None).await.expect("ok"), None);
        assert_eq!(geocoder.geocode(None, Some("Kaputt"), None).await.expect("ok"), None);
        assert_eq!(geocoder.geocode(None, None, None).await.expect("ok"), None);
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(429);
            })
            .await;

        let err = geocoder(&server)
            .geocode(None, Some("Landshut"), None)
            .await
            .expect_err("rate limited");
        assert!(matches!(err, GeocodingError::Request(msg) if msg.contains("429")));
    }
}
