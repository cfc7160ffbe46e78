//! Area centroid estimates for cells no tier or provider knows.

use cellgeo_core::{AreaKey, LocationRecord, RecordKind};
use cellgeo_storage::{DynTier, StorageError, TierId};

/// Spherical centroid of a set of records.
///
/// Latitude is the arithmetic mean. Longitude is the direction of the mean
/// unit vector, so areas straddling the antimeridian do not average to 0°.
/// Returns `None` for an empty set.
pub fn centroid(records: &[LocationRecord]) -> Option<(f64, f64)> {
    if records.is_empty() {
        return None;
    }

    let n = records.len() as f64;
    let (mut lat_sum, mut sin_sum, mut cos_sum) = (0.0_f64, 0.0_f64, 0.0_f64);
    for record in records {
        let lon = record.lon.to_radians();
        lat_sum += record.lat;
        sin_sum += lon.sin();
        cos_sum += lon.cos();
    }

    let lat = lat_sum / n;
    let lon = (sin_sum / n).atan2(cos_sum / n).to_degrees();
    Some((lat, lon))
}

/// Computes approximated records from the cells of one source tier.
#[derive(Clone)]
pub struct Approximator {
    source: Option<DynTier>,
}

impl Approximator {
    /// Approximates from `source`, normally the authoritative tier.
    pub fn new(source: Option<DynTier>) -> Self {
        Self { source }
    }

    /// Tier the centroid is computed from.
    pub fn source_tier(&self) -> Option<TierId> {
        self.source.as_ref().map(|t| t.id())
    }

    /// Centroid record for `area`, or `None` if no cell of the area is known.
    ///
    /// Only observed records contribute; earlier approximations and defaults
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the source tier unchanged.
    pub async fn approximate(
        &self,
        area: &AreaKey,
    ) -> Result<Option<LocationRecord>, StorageError> {
        let Some(source) = &self.source else {
            return Ok(None);
        };

        let mut records = source.area_records(area).await?;
        records.retain(|r| r.kind() == RecordKind::Observed);

        Ok(centroid(&records).map(|(lat, lon)| LocationRecord::approximated(lat, lon)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cellgeo_core::{APPROXIMATED_RANGE, CellKey};
    use cellgeo_storage::InMemoryTier;

    use super::*;

    fn rec(lat: f64, lon: f64) -> LocationRecord {
        LocationRecord::new(lat, lon, 1000)
    }

    #[test]
    fn test_centroid_empty() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_centroid_single_point() {
        let (lat, lon) = centroid(&[rec(46.9, 7.36)]).unwrap();
        assert!((lat - 46.9).abs() < 1e-9);
        assert!((lon - 7.36).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_mean_latitude() {
        let (lat, lon) = centroid(&[rec(46.0, 7.0), rec(47.0, 7.0), rec(48.0, 7.0)]).unwrap();
        assert!((lat - 47.0).abs() < 1e-9);
        assert!((lon - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_across_antimeridian() {
        let (_, lon) = centroid(&[rec(0.0, 179.0), rec(0.0, -179.0)]).unwrap();
        assert!((lon.abs() - 180.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_approximate_from_tier() {
        let tier = InMemoryTier::new(TierId::OpenCellId);
        let k = |cell| CellKey::new(228, 1, 42, cell).unwrap();
        tier.seed(k(1), rec(46.0, 7.0));
        tier.seed(k(2), rec(48.0, 7.0));
        tier.seed(k(3), LocationRecord::fallback(0.0, 0.0));
        tier.seed(CellKey::new(228, 1, 43, 1).unwrap(), rec(10.0, 10.0));

        let approximator = Approximator::new(Some(Arc::new(tier)));
        let record = approximator.approximate(&k(99).area()).await.unwrap().unwrap();
        assert_eq!(record.range, APPROXIMATED_RANGE);
        assert!((record.lat - 47.0).abs() < 1e-9);

        let unknown = CellKey::new(228, 2, 42, 1).unwrap().area();
        assert!(approximator.approximate(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_approximate_without_source() {
        let approximator = Approximator::new(None);
        let area = CellKey::new(1, 1, 1, 1).unwrap().area();
        assert!(approximator.approximate(&area).await.unwrap().is_none());
        assert!(approximator.source_tier().is_none());
    }
}
