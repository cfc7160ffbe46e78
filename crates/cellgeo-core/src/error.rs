use thiserror::Error;

/// Core error types for cell key handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid cell key: {field} = {value} is outside 0..={max}")]
    InvalidCellKey {
        field: &'static str,
        value: i64,
        max: u32,
    },

    #[error("Invalid location: {message}")]
    InvalidLocation { message: String },
}

impl CoreError {
    /// Create a new InvalidCellKey error
    pub fn invalid_cell_key(field: &'static str, value: i64, max: u32) -> Self {
        Self::InvalidCellKey { field, value, max }
    }

    /// Create a new InvalidLocation error
    pub fn invalid_location(message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            message: message.into(),
        }
    }

    /// Name of the offending key field, if this is a key validation error
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCellKey { field, .. } => Some(field),
            Self::InvalidLocation { .. } => None,
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_cell_key("mcc", 1000, 999);
        assert_eq!(
            err.to_string(),
            "Invalid cell key: mcc = 1000 is outside 0..=999"
        );
        assert_eq!(err.field(), Some("mcc"));

        let err = CoreError::invalid_location("latitude 91 out of range");
        assert!(err.to_string().contains("latitude 91"));
        assert_eq!(err.field(), None);
    }
}
