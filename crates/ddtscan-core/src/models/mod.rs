//! Data models for delivery records, discards, warnings and configuration.

pub mod config;
pub mod delivery;

pub use config::{FleetMember, GeoConfig, PathConfig, ScanConfig};
pub use delivery::{
    DeliveryRecord, DiscardCounter, DiscardRecord, SimilarityField, WarningKind, WarningLink,
};
