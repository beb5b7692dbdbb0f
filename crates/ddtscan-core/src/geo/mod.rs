//! Geocoding/routing collaborator and the distance resolver.

mod ors;
mod resolver;

pub use ors::OrsClient;
pub use resolver::DistanceResolver;

use crate::error::GeoError;

/// Result type for geocoding operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Longitude/latitude pair, in the order the routing service uses.
pub type Coordinates = (f64, f64);

/// Address search and driving-distance lookup.
///
/// Every failure mode (service error, transport error, timeout)
/// surfaces as a [`GeoError`] so the resolver can convert it to an
/// unresolved distance instead of propagating.
pub trait GeoLocator {
    /// Coordinates of an address, constrained to a country; `None`
    /// when the service finds nothing.
    fn geocode(&self, address: &str, country: &str) -> Result<Option<Coordinates>>;

    /// Driving distance between two coordinate pairs, in meters;
    /// `None` when no route exists.
    fn route(&self, departure: Coordinates, destination: Coordinates) -> Result<Option<f64>>;
}
