use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::error::AnalysisError;

/// Known-good model identifiers used when discovery is unavailable, in
/// preference order.
pub const FALLBACK_MODELS: [&str; 4] = [
    "gemini-pro",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-1.0-pro",
];

/// Distinct mechanisms for invoking the backend. `Rest` is the direct wire
/// call; `Client` mirrors the payload shape the vendor SDK sends against the
/// v1beta surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Rest,
    Client,
}

impl Transport {
    /// Fixed priority order: cheapest mechanism first, the heavier
    /// client-style call as the escalation path.
    pub const PRIORITY: [Transport; 2] = [Transport::Rest, Transport::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Rest => "rest",
            Transport::Client => "client",
        }
    }
}

/// Seam between the fallback search and the wire. One generation attempt per
/// call, no internal retries.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Deterministic precondition check; must fail without touching the
    /// network when the backend cannot possibly succeed.
    fn ensure_ready(&self) -> Result<(), AnalysisError>;

    /// One discovery attempt against the backend's listing endpoint.
    async fn discover_models(&self) -> Result<Vec<String>, AnalysisError>;

    /// One generation attempt against a specific transport and model.
    async fn attempt(
        &self,
        transport: Transport,
        model: &str,
        prompt: &str,
    ) -> Result<String, AnalysisError>;
}

/// Obtain raw model text for `prompt` by driving the fallback matrix of
/// transports and candidate models.
pub async fn invoke<B: GenerativeBackend>(
    backend: &B,
    prompt: &str,
) -> Result<String, AnalysisError> {
    backend.ensure_ready()?;
    let models = resolve_candidates(backend.discover_models().await);
    run_fallback_search(backend, &models, prompt).await
}

/// Discovery failover policy: any failure or an empty listing falls back to
/// the static known-good list. Discovery errors are never surfaced.
pub fn resolve_candidates(discovered: Result<Vec<String>, AnalysisError>) -> Vec<String> {
    match discovered {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => {
            warn!("model discovery returned an empty listing, using fallback models");
            FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
        }
        Err(err) => {
            warn!("model discovery failed ({err}), using fallback models");
            FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
        }
    }
}

/// Walks transports in priority order and candidate models in enumerator
/// order, one attempt per pair. The first success terminates the whole
/// search; exhaustion fails with the last observed error attached.
pub async fn run_fallback_search<B: GenerativeBackend>(
    backend: &B,
    models: &[String],
    prompt: &str,
) -> Result<String, AnalysisError> {
    let mut last_error: Option<AnalysisError> = None;

    for transport in Transport::PRIORITY {
        for model in models {
            match backend.attempt(transport, model, prompt).await {
                Ok(text) => {
                    info!(
                        "model {} succeeded via {} transport ({} chars)",
                        model,
                        transport.as_str(),
                        text.len()
                    );
                    return Ok(text);
                }
                Err(err) => {
                    warn!(
                        "{} transport with model {} failed: {}",
                        transport.as_str(),
                        model,
                        err
                    );
                    last_error = Some(err);
                }
            }
        }
    }

    let last = last_error
        .unwrap_or_else(|| AnalysisError::Transport("no candidate models to try".to_string()));
    Err(AnalysisError::InvocationExhausted(Box::new(last)))
}

/// Gemini-backed implementation of [`GenerativeBackend`].
pub struct GeminiBackend {
    http: Client,
    config: BackendConfig,
}

impl GeminiBackend {
    pub fn new(config: BackendConfig) -> Result<Self, AnalysisError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        Ok(GeminiBackend { http, config })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn ensure_ready(&self) -> Result<(), AnalysisError> {
        self.config.require_api_key().map(|_| ())
    }

    async fn discover_models(&self) -> Result<Vec<String>, AnalysisError> {
        let key = self.config.require_api_key()?;
        let url = format!("{}/v1/models?key={}", self.config.api_base, key);

        debug!("fetching available models from listing endpoint");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| AnalysisError::Discovery(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Discovery(format!(
                "listing endpoint returned status {status}"
            )));
        }

        let listing: ModelListing = response
            .json()
            .await
            .map_err(|err| AnalysisError::Discovery(err.to_string()))?;

        Ok(generation_capable_models(listing))
    }

    async fn attempt(
        &self,
        transport: Transport,
        model: &str,
        prompt: &str,
    ) -> Result<String, AnalysisError> {
        let key = self.config.require_api_key()?;
        let (url, payload) = match transport {
            Transport::Rest => (
                format!(
                    "{}/v1/models/{}:generateContent?key={}",
                    self.config.api_base, model, key
                ),
                json!({
                    "contents": [{ "parts": [{ "text": prompt }] }]
                }),
            ),
            Transport::Client => (
                format!(
                    "{}/v1beta/models/{}:generateContent?key={}",
                    self.config.api_base, model, key
                ),
                json!({
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": { "temperature": 0.2 }
                }),
            ),
        };

        debug!("calling model {} via {} transport", model, transport.as_str());
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Transport(format!(
                "{} transport returned status {status}: {body}",
                transport.as_str()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;

        parsed.into_text().ok_or_else(|| {
            AnalysisError::Transport("response carried no candidate text".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Keeps identifiers advertising the generateContent capability, stripped of
/// the listing's `models/` prefix.
fn generation_capable_models(listing: ModelListing) -> Vec<String> {
    listing
        .models
        .into_iter()
        .filter(|model| {
            model
                .supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|model| model.name.trim_start_matches("models/").to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}
