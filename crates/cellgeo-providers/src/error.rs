use thiserror::Error;

/// Transport or decode failure while talking to a provider.
///
/// These never reach API callers; the pipeline treats them as "provider
/// unavailable" and moves on.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Classifies a reqwest error, reporting timeouts with the configured limit.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProviderError::Timeout { timeout_ms: 3000 }.to_string(),
            "Request timed out after 3000 ms"
        );
        assert_eq!(
            ProviderError::HttpStatus { status: 503 }.to_string(),
            "Unexpected HTTP status 503"
        );
        assert!(ProviderError::decode("short frame").to_string().contains("short frame"));
        assert!(ProviderError::Timeout { timeout_ms: 1 }.is_timeout());
    }
}
