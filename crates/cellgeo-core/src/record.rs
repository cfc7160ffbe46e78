//! Location records and the reserved range sentinels.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};

/// Range value marking a computed area centroid rather than an observed fix.
pub const APPROXIMATED_RANGE: u32 = 2_147_483_648;

/// Range value marking the global fallback location.
pub const DEFAULT_RANGE: u32 = 4_294_967_295;

/// Largest range a provider may report before the answer is considered bogus.
pub const MAX_PLAUSIBLE_RANGE: u32 = 1_000_000;

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0088;

/// How a record came to be, derived from its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Observed or provider-reported position of the cell itself.
    Observed,
    /// Area centroid computed from neighbouring cells.
    Approximated,
    /// Fixed fallback location.
    Default,
}

/// Position and uncertainty radius of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lon: f64,
    /// Uncertainty radius in meters, or one of the reserved sentinels.
    pub range: u32,
    #[serde(default, skip_serializing, with = "time::serde::timestamp::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing, with = "time::serde::timestamp::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl LocationRecord {
    pub fn new(lat: f64, lon: f64, range: u32) -> Self {
        Self {
            lat,
            lon,
            range,
            created_at: None,
            updated_at: None,
        }
    }

    /// Area centroid record carrying [`APPROXIMATED_RANGE`].
    pub fn approximated(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, APPROXIMATED_RANGE)
    }

    /// Fallback record carrying [`DEFAULT_RANGE`].
    pub fn fallback(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, DEFAULT_RANGE)
    }

    pub fn kind(&self) -> RecordKind {
        match self.range {
            APPROXIMATED_RANGE => RecordKind::Approximated,
            DEFAULT_RANGE => RecordKind::Default,
            _ => RecordKind::Observed,
        }
    }

    pub fn is_approximated(&self) -> bool {
        self.kind() == RecordKind::Approximated
    }

    pub fn is_default(&self) -> bool {
        self.kind() == RecordKind::Default
    }

    /// Stamps both timestamps with `now`, as done on every cache write.
    pub fn stamped(mut self, now: OffsetDateTime) -> Self {
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self
    }

    /// Same position and range, timestamps dropped.
    pub fn without_timestamps(mut self) -> Self {
        self.created_at = None;
        self.updated_at = None;
        self
    }

    /// Checks that the coordinates are on the globe and finite.
    pub fn validate_coordinates(&self) -> Result<()> {
        if !self.lat.is_finite() || self.lat.abs() > 90.0 {
            return Err(CoreError::invalid_location(format!(
                "latitude {} out of range",
                self.lat
            )));
        }
        if !self.lon.is_finite() || self.lon.abs() > 180.0 {
            return Err(CoreError::invalid_location(format!(
                "longitude {} out of range",
                self.lon
            )));
        }
        Ok(())
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &LocationRecord) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();

        let h = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
    }

    /// Whether a freshly fetched observation looks realistic.
    pub fn is_plausible_observation(&self) -> bool {
        self.validate_coordinates().is_ok() && self.range <= MAX_PLAUSIBLE_RANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_bit_exact() {
        assert_eq!(APPROXIMATED_RANGE, 1u32 << 31);
        assert_eq!(DEFAULT_RANGE, u32::MAX);
    }

    #[test]
    fn test_kind() {
        assert_eq!(LocationRecord::new(1.0, 2.0, 500).kind(), RecordKind::Observed);
        assert!(LocationRecord::approximated(1.0, 2.0).is_approximated());
        assert!(LocationRecord::fallback(1.0, 2.0).is_default());
    }

    #[test]
    fn test_wire_shape() {
        let now = OffsetDateTime::now_utc();
        let record = LocationRecord::fallback(46.909009, 7.360584).stamped(now);
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lat": 46.909009, "lon": 7.360584, "range": 4294967295u32})
        );
    }

    #[test]
    fn test_plausibility() {
        assert!(LocationRecord::new(46.9, 7.3, 1000).is_plausible_observation());
        assert!(!LocationRecord::new(91.0, 7.3, 1000).is_plausible_observation());
        assert!(!LocationRecord::new(46.9, -181.0, 1000).is_plausible_observation());
        assert!(!LocationRecord::new(46.9, 7.3, 1_000_001).is_plausible_observation());
        assert!(!LocationRecord::new(f64::NAN, 7.3, 1).is_plausible_observation());
    }

    #[test]
    fn test_distance_km() {
        let lyon = LocationRecord::new(45.7597, 4.8422, 1);
        let paris = LocationRecord::new(48.8567, 2.3508, 1);
        assert!((lyon.distance_km(&paris) - 392.2).abs() < 0.5);
        assert_eq!(lyon.distance_km(&lyon), 0.0);

        let antipode = LocationRecord::new(-45.7597, -175.1578, 1);
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((lyon.distance_km(&antipode) - half_circumference).abs() < 0.01);
    }
}
