pub mod error;
pub mod key;
pub mod record;

pub use error::{CoreError, Result};
pub use key::{AreaKey, CellKey, CellQuery, MAX_CELL_ID, MAX_LAC, MAX_MCC, MAX_MNC};
pub use record::{
    APPROXIMATED_RANGE, DEFAULT_RANGE, EARTH_RADIUS_KM, LocationRecord, MAX_PLAUSIBLE_RANGE,
    RecordKind,
};

/// Current UTC time, used for record timestamps.
pub fn now_utc() -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc()
}
