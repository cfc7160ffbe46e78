//! Provider configuration.

use serde::{Deserialize, Serialize};

/// Default endpoint of the binary-protocol provider.
pub const DEFAULT_GLM_URL: &str = "https://www.google.com/glm/mmap";

/// Default endpoint of the Unwired Labs REST provider.
pub const DEFAULT_UNWIREDLABS_URL: &str = "https://eu1.unwiredlabs.com/v2/process.php";

/// Environment variables consulted, in order, when no token is configured.
pub const TOKEN_ENV_VARS: [&str; 2] = ["UNWIREDLABS_TOKEN", "OPENCELLID_API_KEY"];

/// Settings for all remote providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Per-request timeout applied to every provider.
    pub timeout_ms: u64,
    pub glm: GlmConfig,
    pub unwiredlabs: UnwiredLabsConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            glm: GlmConfig::default(),
            unwiredlabs: UnwiredLabsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for GlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_GLM_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnwiredLabsConfig {
    pub enabled: bool,
    pub url: String,
    /// API token. Falls back to [`TOKEN_ENV_VARS`] when unset.
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for UnwiredLabsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_UNWIREDLABS_URL.to_string(),
            token: None,
        }
    }
}

impl UnwiredLabsConfig {
    /// The configured token, or the first non-empty fallback variable.
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }

    /// Like [`resolve_token`](Self::resolve_token) with an injectable lookup.
    pub fn resolve_token_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                TOKEN_ENV_VARS
                    .iter()
                    .filter_map(|name| env(name))
                    .find(|t| !t.trim().is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProvidersConfig::default();
        assert_eq!(config.timeout_ms, 3000);
        assert!(config.glm.enabled);
        assert_eq!(config.glm.url, DEFAULT_GLM_URL);
        assert_eq!(config.unwiredlabs.url, DEFAULT_UNWIREDLABS_URL);
        assert!(config.unwiredlabs.token.is_none());
    }

    #[test]
    fn test_token_fallback_order() {
        let config = UnwiredLabsConfig::default();
        let env = |name: &str| match name {
            "UNWIREDLABS_TOKEN" => Some(String::new()),
            "OPENCELLID_API_KEY" => Some("oci-key".to_string()),
            _ => None,
        };
        assert_eq!(config.resolve_token_with(env), Some("oci-key".to_string()));

        let config = UnwiredLabsConfig {
            token: Some("configured".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_token_with(env), Some("configured".to_string()));

        assert_eq!(UnwiredLabsConfig::default().resolve_token_with(|_| None), None);
    }
}
