use cellgeo_core::LocationRecord;

use crate::error::ProviderError;

/// Normalized answer of a remote provider.
#[derive(Debug)]
pub enum ProviderOutcome {
    /// The provider knows the cell.
    Found(LocationRecord),
    /// The provider answered but has no location for the cell.
    NotFound,
    /// The account's request quota is used up.
    QuotaExceeded,
    /// The provider could not be reached or its answer was unusable.
    TransportError(ProviderError),
}

impl ProviderOutcome {
    /// Short label used in logs and stats.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::QuotaExceeded => "quota_exceeded",
            Self::TransportError(_) => "transport_error",
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
