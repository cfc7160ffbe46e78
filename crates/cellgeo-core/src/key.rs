//! Cell identifiers.
//!
//! A [`CellKey`] can only be obtained through validation, so every tier and
//! provider can rely on the field bounds without re-checking them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Largest valid Mobile Country Code.
pub const MAX_MCC: u32 = 999;
/// Largest valid Mobile Network Code.
pub const MAX_MNC: u32 = 999;
/// Largest valid Location Area Code.
pub const MAX_LAC: u32 = 65_535;
/// Largest valid cell identity (28 bits, UMTS/LTE ECI range).
pub const MAX_CELL_ID: u32 = 268_435_455;

/// Validated `(mcc, mnc, lac, cell_id)` tuple identifying one base station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellKey {
    mcc: u16,
    mnc: u16,
    lac: u32,
    cell_id: u32,
}

impl CellKey {
    /// Builds a key, checking every field against its bound.
    pub fn new(mcc: u32, mnc: u32, lac: u32, cell_id: u32) -> Result<Self> {
        CellQuery {
            mcc: i64::from(mcc),
            mnc: i64::from(mnc),
            lac: i64::from(lac),
            cell_id: i64::from(cell_id),
        }
        .validate()
    }

    pub fn mcc(&self) -> u32 {
        u32::from(self.mcc)
    }

    pub fn mnc(&self) -> u32 {
        u32::from(self.mnc)
    }

    pub fn lac(&self) -> u32 {
        self.lac
    }

    pub fn cell_id(&self) -> u32 {
        self.cell_id
    }

    /// The location area this cell belongs to.
    pub fn area(&self) -> AreaKey {
        AreaKey {
            mcc: self.mcc,
            mnc: self.mnc,
            lac: self.lac,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.mcc, self.mnc, self.lac, self.cell_id)
    }
}

/// `(mcc, mnc, lac)` prefix shared by all cells of one location area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AreaKey {
    mcc: u16,
    mnc: u16,
    lac: u32,
}

impl AreaKey {
    pub fn mcc(&self) -> u32 {
        u32::from(self.mcc)
    }

    pub fn mnc(&self) -> u32 {
        u32::from(self.mnc)
    }

    pub fn lac(&self) -> u32 {
        self.lac
    }

    /// Returns `true` if `key` lies inside this area.
    pub fn contains(&self, key: &CellKey) -> bool {
        key.area() == *self
    }
}

impl fmt::Display for AreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.mcc, self.mnc, self.lac)
    }
}

/// Unvalidated cell identifier as received from a caller.
///
/// Fields are signed and wide so that negative or oversized query values
/// reach [`CellQuery::validate`] instead of failing during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CellQuery {
    pub mcc: i64,
    pub mnc: i64,
    pub lac: i64,
    #[serde(rename = "cellid", alias = "cellId", alias = "cid")]
    pub cell_id: i64,
}

impl CellQuery {
    pub fn new(mcc: i64, mnc: i64, lac: i64, cell_id: i64) -> Self {
        Self {
            mcc,
            mnc,
            lac,
            cell_id,
        }
    }

    /// Checks all four fields and produces a [`CellKey`].
    ///
    /// Fields are checked in key order; the first violation is reported.
    pub fn validate(&self) -> Result<CellKey> {
        let mcc = check("mcc", self.mcc, MAX_MCC)?;
        let mnc = check("mnc", self.mnc, MAX_MNC)?;
        let lac = check("lac", self.lac, MAX_LAC)?;
        let cell_id = check("cellid", self.cell_id, MAX_CELL_ID)?;

        Ok(CellKey {
            mcc: mcc as u16,
            mnc: mnc as u16,
            lac,
            cell_id,
        })
    }
}

fn check(field: &'static str, value: i64, max: u32) -> Result<u32> {
    if (0..=i64::from(max)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(CoreError::invalid_cell_key(field, value, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        let key = CellKey::new(228, 1, 1, 1).unwrap();
        assert_eq!(key.mcc(), 228);
        assert_eq!(key.mnc(), 1);
        assert_eq!(key.lac(), 1);
        assert_eq!(key.cell_id(), 1);
        assert_eq!(key.to_string(), "228/1/1/1");
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let key = CellKey::new(MAX_MCC, MAX_MNC, MAX_LAC, MAX_CELL_ID).unwrap();
        assert_eq!(key.cell_id(), 268_435_455);
        assert!(CellKey::new(0, 0, 0, 0).is_ok());
    }

    #[test]
    fn test_each_field_is_checked() {
        assert_eq!(
            CellQuery::new(1000, 1, 1, 1).validate().unwrap_err().field(),
            Some("mcc")
        );
        assert_eq!(
            CellQuery::new(228, 1000, 1, 1).validate().unwrap_err().field(),
            Some("mnc")
        );
        assert_eq!(
            CellQuery::new(228, 1, 65_536, 1).validate().unwrap_err().field(),
            Some("lac")
        );
        assert_eq!(
            CellQuery::new(228, 1, 1, 268_435_456)
                .validate()
                .unwrap_err()
                .field(),
            Some("cellid")
        );
    }

    #[test]
    fn test_negative_values_rejected() {
        let err = CellQuery::new(-1, 1, 1, 1).validate().unwrap_err();
        assert_eq!(err, CoreError::invalid_cell_key("mcc", -1, MAX_MCC));
    }

    #[test]
    fn test_area() {
        let a = CellKey::new(228, 1, 100, 1).unwrap();
        let b = CellKey::new(228, 1, 100, 2).unwrap();
        let c = CellKey::new(228, 1, 101, 1).unwrap();
        assert_eq!(a.area(), b.area());
        assert!(a.area().contains(&b));
        assert!(!a.area().contains(&c));
        assert_eq!(a.area().to_string(), "228/1/100");
    }

    #[test]
    fn test_query_deserialize_aliases() {
        let q: CellQuery =
            serde_json::from_str(r#"{"mcc":228,"mnc":1,"lac":2,"cellid":3}"#).unwrap();
        assert_eq!(q.cell_id, 3);
        let q: CellQuery =
            serde_json::from_str(r#"{"mcc":228,"mnc":1,"lac":2,"cellId":4}"#).unwrap();
        assert_eq!(q.cell_id, 4);
    }
}
