//! City-distance resolution with a persisted cache and rate limiting.

use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use super::GeoLocator;
use crate::error::StoreError;
use crate::models::GeoConfig;
use crate::store::DeliveryStore;

/// Resolves the driving distance from the configured departure address
/// to a delivery city.
///
/// Previously stored distances for the same city string are reused with
/// no external call. On a cache miss the external service is consulted
/// and a fixed delay is inserted afterwards to respect its rate limit;
/// the delay never fires on a cache hit.
pub struct DistanceResolver<'a> {
    geo: &'a dyn GeoLocator,
    config: &'a GeoConfig,
}

impl<'a> DistanceResolver<'a> {
    pub fn new(geo: &'a dyn GeoLocator, config: &'a GeoConfig) -> Self {
        Self { geo, config }
    }

    /// Resolve a distance in kilometers, or `None` when the city is
    /// unknown or the service fails. Service failures never propagate.
    pub fn resolve(
        &self,
        store: &dyn DeliveryStore,
        city: Option<&str>,
    ) -> Result<Option<f64>, StoreError> {
        if let Some(city) = city {
            if let Some(stored) = store.cached_distance(city)? {
                debug!("Distance for {city} already on record: {stored:?}");
                return Ok(stored);
            }
        }

        let distance = city.and_then(|c| self.lookup(c));
        // External service allows roughly 40 requests per minute.
        thread::sleep(Duration::from_millis(self.config.rate_limit_delay_ms));
        Ok(distance)
    }

    fn lookup(&self, city: &str) -> Option<f64> {
        info!("Calculating distance to {city}");

        let destination = match self.geo.geocode(city, &self.config.country) {
            Ok(coords) => coords?,
            Err(e) => {
                error!("Geocoding {city} failed: {e}");
                return None;
            }
        };
        let departure = match self
            .geo
            .geocode(&self.config.departure_address, &self.config.country)
        {
            Ok(coords) => coords?,
            Err(e) => {
                error!("Geocoding the departure address failed: {e}");
                return None;
            }
        };
        match self.geo.route(departure, destination) {
            Ok(meters) => meters.map(|m| m / 1000.0),
            Err(e) => {
                error!("Routing to {city} failed: {e}");
                None
            }
        }
    }
}
