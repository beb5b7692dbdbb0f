//! Similarity-based correction of enumerated fields against the fleet roster.

use tracing::{debug, warn};

use crate::models::{ScanConfig, SimilarityField};

/// Normalized similarity ratio between two strings, 0.0 to 1.0.
///
/// `2 * LCS(a, b) / (|a| + |b|)` over characters. Two empty strings are
/// identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Two-row LCS table.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / (a.len() + b.len()) as f64
}

/// Resolve a free-text token against a canonical enumeration.
///
/// Returns the best-scoring canonical value when its ratio strictly
/// exceeds 0.5, otherwise the raw token unchanged. Callers detect the
/// unresolved case by membership in the enumeration; there is no
/// separate flag.
pub fn resolve_token(token: &str, canonical: &[&str]) -> String {
    let mut best: Option<(&str, f64)> = None;
    for candidate in canonical {
        let ratio = similarity_ratio(candidate, token);
        if best.is_none_or(|(_, b)| ratio > b) {
            best = Some((candidate, ratio));
        }
    }

    match best {
        Some((candidate, ratio)) if ratio > 0.5 => {
            debug!("Similarity resolved {token} to {candidate} (ratio {ratio:.2})");
            candidate.to_string()
        }
        _ => {
            debug!("Similarity left {token} unresolved");
            token.to_string()
        }
    }
}

/// Outcome of vehicle/driver resolution for one page.
#[derive(Debug, Clone, Default)]
pub struct CrewResolution {
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    /// Fields that stayed outside their canonical set, with the value
    /// kept; each raises a WARNING-genre message but never a discard.
    pub shortfalls: Vec<(SimilarityField, Option<String>)>,
}

/// Corrects raw vehicle/driver tokens against the configured roster.
pub struct SimilarityMatcher<'a> {
    config: &'a ScanConfig,
}

impl<'a> SimilarityMatcher<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    /// Resolve the raw plate and driver tokens from one page.
    pub fn resolve_crew(&self, vehicle_token: &str, driver_token: Option<&str>) -> CrewResolution {
        let vehicles = self.config.vehicles();
        let drivers = self.config.drivers();
        let mut out = CrewResolution::default();

        let vehicle = if vehicles.contains(&vehicle_token) {
            vehicle_token.to_string()
        } else {
            resolve_token(vehicle_token, &vehicles)
        };
        if !vehicles.contains(&vehicle.as_str()) {
            warn!("Similarity crash on vehicle {vehicle}");
            out.shortfalls
                .push((SimilarityField::Vehicle, Some(vehicle.clone())));
        }

        let driver = match driver_token {
            Some(d) if drivers.contains(&d) => Some(d.to_string()),
            raw => {
                // Drivers extracted as a copy of the plate are a known
                // extraction artifact and are dropped.
                let raw = raw.filter(|d| *d != vehicle_token && !vehicles.contains(d));
                let resolved = raw.map(|d| resolve_token(d, &drivers));
                match (raw, resolved) {
                    // Resolution changed the token: accept it.
                    (Some(raw), Some(resolved)) if raw != resolved => Some(resolved),
                    // Empty or unresolved: fall back to the driver
                    // assigned to the vehicle in the roster.
                    _ => self
                        .config
                        .assigned_driver(&vehicle)
                        .map(|d| d.to_string()),
                }
            }
        };
        if !driver.as_deref().is_some_and(|d| drivers.contains(&d)) {
            warn!("Similarity crash on driver {driver:?}");
            out.shortfalls
                .push((SimilarityField::Driver, driver.clone()));
        }

        out.vehicle = Some(vehicle);
        out.driver = driver;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FleetMember;
    use pretty_assertions::assert_eq;

    fn config() -> ScanConfig {
        ScanConfig {
            fleet: vec![
                FleetMember {
                    vehicle: Some("AB123CD".to_string()),
                    driver: Some("MARIO ROSSI".to_string()),
                },
                FleetMember {
                    vehicle: Some("EF456GH".to_string()),
                    driver: Some("LUIGI BIANCHI".to_string()),
                },
            ],
            ..ScanConfig::default()
        }
    }

    #[test]
    fn ratio_of_identical_strings() {
        assert_eq!(similarity_ratio("AB123CD", "AB123CD"), 1.0);
    }

    #[test]
    fn ratio_of_disjoint_strings() {
        assert_eq!(similarity_ratio("ABC", "xyz"), 0.0);
    }

    #[test]
    fn one_char_corruption_resolves() {
        // LCS("AB123CD", "AB12E3CD") = 7 -> ratio 14/15.
        let resolved = resolve_token("AB12E3CD", &["AB123CD", "EF456GH"]);
        assert_eq!(resolved, "AB123CD");
    }

    #[test]
    fn ratio_exactly_half_is_unresolved() {
        // LCS("AB", "AXXX...") with one shared char and lengths 2 + 2
        // gives exactly 0.5; the threshold must be exceeded, not met.
        assert_eq!(similarity_ratio("AB", "AX"), 0.5);
        let resolved = resolve_token("AB", &["AX"]);
        assert_eq!(resolved, "AB");
    }

    #[test]
    fn no_close_match_keeps_token() {
        let resolved = resolve_token("ZZ000ZZ", &["AB123CD", "EF456GH"]);
        assert_eq!(resolved, "ZZ000ZZ");
    }

    #[test]
    fn crew_exact_vehicle_and_driver() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB123CD", Some("MARIO ROSSI"));
        assert_eq!(crew.vehicle.as_deref(), Some("AB123CD"));
        assert_eq!(crew.driver.as_deref(), Some("MARIO ROSSI"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn crew_corrupted_vehicle_resolves_without_warning() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB12E3CD", Some("MARIO ROSSI"));
        assert_eq!(crew.vehicle.as_deref(), Some("AB123CD"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn crew_unresolvable_vehicle_warns_and_keeps_token() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("ZZ000ZZ", Some("MARIO ROSSI"));
        assert_eq!(crew.vehicle.as_deref(), Some("ZZ000ZZ"));
        assert_eq!(
            crew.shortfalls,
            vec![(SimilarityField::Vehicle, Some("ZZ000ZZ".to_string()))]
        );
    }

    #[test]
    fn driver_equal_to_plate_falls_back_to_roster() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB123CD", Some("AB123CD"));
        assert_eq!(crew.driver.as_deref(), Some("MARIO ROSSI"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn missing_driver_falls_back_to_roster() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB123CD", None);
        assert_eq!(crew.driver.as_deref(), Some("MARIO ROSSI"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn corrupted_driver_resolves() {
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("EF456GH", Some("LUIGI BIANCH"));
        assert_eq!(crew.driver.as_deref(), Some("LUIGI BIANCHI"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn unresolved_driver_falls_back_instead_of_keeping_raw() {
        // Resolution leaving the token unchanged counts as no match,
        // so the roster assignment wins over the raw token.
        let cfg = config();
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB123CD", Some("QQQQQQQQQQ"));
        assert_eq!(crew.driver.as_deref(), Some("MARIO ROSSI"));
        assert!(crew.shortfalls.is_empty());
    }

    #[test]
    fn unresolved_driver_without_roster_assignment_warns() {
        let mut cfg = config();
        cfg.fleet[0].driver = None;
        let crew = SimilarityMatcher::new(&cfg).resolve_crew("AB123CD", Some("QQQQQQQQQQ"));
        assert_eq!(crew.driver, None);
        assert_eq!(crew.shortfalls, vec![(SimilarityField::Driver, None)]);
    }
}
