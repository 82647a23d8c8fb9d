//! Runtime configuration.
//!
//! Every setting comes from an environment variable and has a default. A
//! value that fails to parse is ignored with a warning and the default is
//! used instead.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::aggregation::DEFAULT_TOP_ZONES;
use crate::intake::EmptyFieldPolicy;
use crate::seed::DEFAULT_SEED_COUNT;
use crate::summary::GeminiClient;
use crate::summary::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};

pub const ENV_API_KEY: &str = "SINFUGAS_GEMINI_API_KEY";

/// Accepted when [`ENV_API_KEY`] is unset.
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";

pub const ENV_MODEL: &str = "SINFUGAS_GEMINI_MODEL";
pub const ENV_BASE_URL: &str = "SINFUGAS_GEMINI_BASE_URL";
pub const ENV_SEED_COUNT: &str = "SINFUGAS_SEED_COUNT";
pub const ENV_TOP_ZONES: &str = "SINFUGAS_TOP_ZONES";
pub const ENV_EMPTY_FIELDS: &str = "SINFUGAS_EMPTY_FIELDS";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. Without one the summary is a fixed message.
    pub gemini_api_key: Option<String>,

    /// Gemini model name.
    pub gemini_model: String,

    /// Gemini API base URL.
    pub gemini_base_url: String,

    /// Number of demo incidents seeded at start.
    pub seed_count: usize,

    /// Size of the zone ranking.
    pub top_zones: usize,

    /// Handling of blank address/description in reports.
    pub empty_fields: EmptyFieldPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: GEMINI_API_BASE.to_string(),
            seed_count: DEFAULT_SEED_COUNT,
            top_zones: DEFAULT_TOP_ZONES,
            empty_fields: EmptyFieldPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            gemini_api_key: non_empty(ENV_API_KEY).or_else(|| non_empty(ENV_API_KEY_FALLBACK)),
            gemini_model: non_empty(ENV_MODEL).unwrap_or(defaults.gemini_model),
            gemini_base_url: non_empty(ENV_BASE_URL).unwrap_or(defaults.gemini_base_url),
            seed_count: parse_or(ENV_SEED_COUNT, non_empty(ENV_SEED_COUNT), defaults.seed_count),
            top_zones: parse_or(ENV_TOP_ZONES, non_empty(ENV_TOP_ZONES), defaults.top_zones),
            empty_fields: parse_or(
                ENV_EMPTY_FIELDS,
                non_empty(ENV_EMPTY_FIELDS),
                defaults.empty_fields,
            ),
        }
    }

    /// A Gemini client for this configuration.
    pub fn gemini_client(&self) -> GeminiClient {
        GeminiClient::with_base_url(
            &self.gemini_base_url,
            self.gemini_api_key.clone(),
            &self.gemini_model,
        )
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
