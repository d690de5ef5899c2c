use std::time::Duration;

use crate::error::AnalysisError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend connection settings, captured once from the environment and passed
/// by reference into the invocation engine. A missing credential is carried
/// here and surfaced on the first invocation attempt, before any network call.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(api_key: Option<String>) -> Self {
        BackendConfig {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `GEMINI_API_KEY` and, for non-default deployments,
    /// `GEMINI_API_BASE`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let mut config = BackendConfig::new(api_key);
        if let Ok(base) = std::env::var("GEMINI_API_BASE") {
            config.api_base = base;
        }
        config
    }

    pub fn require_api_key(&self) -> Result<&str, AnalysisError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AnalysisError::Configuration("GEMINI_API_KEY is not set".to_string()))
    }
}
