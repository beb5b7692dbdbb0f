//! openrouteservice HTTP client: Pelias geocoding and driving directions.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{Coordinates, GeoLocator, Result};
use crate::error::GeoError;
use crate::models::GeoConfig;

/// Blocking client for the openrouteservice API.
pub struct OrsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct Properties {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    distance: f64,
}

impl OrsClient {
    pub fn new(config: &GeoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(GeoError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl GeoLocator for OrsClient {
    fn geocode(&self, address: &str, country: &str) -> Result<Option<Coordinates>> {
        let response = self
            .client
            .get(format!("{}/geocode/search", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("text", address),
                ("boundary.country", country),
            ])
            .send()?;

        let body: FeatureCollection = Self::check_status(response)?
            .json()
            .map_err(|e| GeoError::Decode(e.to_string()))?;

        let coords = body.features.first().and_then(|f| {
            match f.geometry.coordinates.as_slice() {
                [lon, lat, ..] => Some((*lon, *lat)),
                _ => None,
            }
        });
        debug!("Geocoded {address} ({country}): {coords:?}");
        Ok(coords)
    }

    fn route(&self, departure: Coordinates, destination: Coordinates) -> Result<Option<f64>> {
        let body = json!({
            "coordinates": [
                [departure.0, departure.1],
                [destination.0, destination.1],
            ],
            "radiuses": [500],
        });

        let response = self
            .client
            .post(format!("{}/v2/directions/driving-car/geojson", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()?;

        let body: FeatureCollection = Self::check_status(response)?
            .json()
            .map_err(|e| GeoError::Decode(e.to_string()))?;

        let meters = body
            .features
            .first()
            .and_then(|f| f.properties.segments.first())
            .map(|s| s.distance);
        debug!("Routed {departure:?} -> {destination:?}: {meters:?} m");
        Ok(meters)
    }
}
