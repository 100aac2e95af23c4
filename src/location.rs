use crate::types::GeoFix;
use serde::{Deserialize, Serialize};

/// One provider's position report. `accuracy` is the estimated error
/// radius in meters (smaller is better); it stays here and never reaches
/// the exported records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationReport {
    pub provider: String,
    pub fix: GeoFix,
    pub accuracy: f32,
}

impl LocationReport {
    pub fn new(provider: &str, latitude: f64, longitude: f64, accuracy: f32) -> Self {
        Self {
            provider: provider.to_string(),
            fix: GeoFix::new(latitude, longitude),
            accuracy,
        }
    }
}

/// Pick the report with the smallest accuracy radius. Ties keep the first
/// candidate seen; an empty set yields `None`.
///
/// Used to seed the current fix from every provider's last-known position
/// when location updates are subscribed or a provider comes back.
pub fn best_fix<I>(reports: I) -> Option<LocationReport>
where
    I: IntoIterator<Item = LocationReport>,
{
    let mut best: Option<LocationReport> = None;
    for report in reports {
        match &best {
            Some(current) if report.accuracy >= current.accuracy => {}
            _ => best = Some(report),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_accuracy_wins() {
        let reports = vec![
            LocationReport::new("gps", 37.0, 127.0, 12.0),
            LocationReport::new("network", 37.1, 127.1, 4.5),
            LocationReport::new("passive", 37.2, 127.2, 7.0),
        ];
        let best = best_fix(reports).unwrap();
        assert_eq!(best.provider, "network");
        assert_eq!(best.accuracy, 4.5);
    }

    #[test]
    fn test_empty_set_has_no_fix() {
        assert!(best_fix(Vec::new()).is_none());
    }

    #[test]
    fn test_tie_keeps_first() {
        let reports = vec![
            LocationReport::new("gps", 1.0, 2.0, 5.0),
            LocationReport::new("network", 3.0, 4.0, 5.0),
        ];
        let best = best_fix(reports).unwrap();
        assert_eq!(best.provider, "gps");
    }
}
