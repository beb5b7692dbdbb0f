//! Configuration structures for the scanning pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ScanError;

/// Main configuration for the ddtscan pipeline.
///
/// Resolved once per batch run and passed down by value; nothing caches
/// it process-wide.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory and database locations.
    pub paths: PathConfig,

    /// Geocoding/routing service configuration.
    pub geo: GeoConfig,

    /// Canonical fleet roster: valid vehicles and their assigned drivers.
    pub fleet: Vec<FleetMember>,
}

/// Directory and database locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Incoming DDT documents.
    pub working_dir: PathBuf,

    /// Isolated single-page discard documents.
    pub discarded_dir: PathBuf,

    /// Fully processed documents.
    pub recorded_dir: PathBuf,

    /// Optional backup copy of worked documents.
    pub backup_dir: Option<PathBuf>,

    /// SQLite database file.
    pub database: PathBuf,

    /// Generated overview/summary reports.
    pub reports_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("DDTs"),
            discarded_dir: PathBuf::from("DDTs/discarded"),
            recorded_dir: PathBuf::from("DDTs/recorded"),
            backup_dir: None,
            database: PathBuf::from("ddtscan.db"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

/// Geocoding/routing service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// API key for the routing service.
    pub api_key: String,

    /// Service base URL.
    pub base_url: String,

    /// Fixed departure address all distances are measured from.
    pub departure_address: String,

    /// ISO country code constraining geocoding searches.
    pub country: String,

    /// Delay after every external resolution, in milliseconds.
    /// The service allows roughly 40 requests per minute.
    pub rate_limit_delay_ms: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openrouteservice.org".to_string(),
            departure_address: String::new(),
            country: "IT".to_string(),
            rate_limit_delay_ms: 1500,
        }
    }
}

/// One fleet entry: a canonical vehicle plate and its assigned driver.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetMember {
    pub vehicle: Option<String>,
    pub driver: Option<String>,
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ScanError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ScanError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Canonical vehicle plates, skipping empty roster slots.
    pub fn vehicles(&self) -> Vec<&str> {
        self.fleet
            .iter()
            .filter_map(|m| m.vehicle.as_deref())
            .collect()
    }

    /// Canonical driver names, skipping empty roster slots.
    pub fn drivers(&self) -> Vec<&str> {
        self.fleet
            .iter()
            .filter_map(|m| m.driver.as_deref())
            .collect()
    }

    /// The driver assigned to a vehicle in the roster, if any.
    pub fn assigned_driver(&self, vehicle: &str) -> Option<&str> {
        self.fleet
            .iter()
            .find(|m| m.vehicle.as_deref() == Some(vehicle))
            .and_then(|m| m.driver.as_deref())
    }
}
