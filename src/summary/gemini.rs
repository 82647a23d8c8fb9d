//! Google Gemini client.
//!
//! Calls the `generateContent` method of the Generative Language REST API
//! with a single-turn text prompt and returns the first candidate's text.
//!
//! # API Reference
//!
//! See: <https://ai.google.dev/api/generate-content>

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{EMPTY_MESSAGE, MISSING_KEY_MESSAGE, SummaryService, UNAVAILABLE_MESSAGE, build_prompt};
use crate::dashboard::SummaryRequest;

/// Base URL for the Generative Language API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Client for the Gemini text-generation API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key. Without one, every summary is the
    ///   "not configured" message and no request is sent.
    /// * `model` - Model name, e.g. `gemini-2.5-flash`.
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        Self::with_base_url(GEMINI_API_BASE, api_key, model)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send `prompt` and return the generated text, if any.
    ///
    /// Unlike [`SummaryService::summarize`] this surfaces failures, so it
    /// can be used where the caller wants to distinguish them.
    pub async fn generate_content(&self, api_key: &str, prompt: &str) -> anyhow::Result<Option<String>> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            urlencoding::encode(&self.model),
            urlencoding::encode(api_key)
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        // The key travels in the query string, so URLs are stripped from errors
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.without_url())?;
        let data = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| e.without_url())?;
        Ok(data.text())
    }
}

impl SummaryService for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.model, session = request.session()))]
    async fn summarize(&self, request: &SummaryRequest) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Gemini API key not configured; returning fallback summary");
            return MISSING_KEY_MESSAGE.to_string();
        };

        let prompt = build_prompt(request);

        match self.generate_content(api_key, &prompt).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                info!(chars = text.len(), "Summary generated");
                text
            }
            Ok(_) => {
                warn!("Gemini returned no text");
                EMPTY_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Gemini request failed");
                UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

/// Response from the `generateContent` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// A single generated candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// A turn of conversation content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a content turn. Only text parts are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
