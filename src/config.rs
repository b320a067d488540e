use std::time::Duration;

use crate::error::QuizError;
use crate::llm::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::llm::secrets::{API_KEY_ENV, ApiKeyLookup, ApiKeySource, get_api_key_from_sources};

/// Settings resolved once at startup and handed to the client.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub key_source: ApiKeySource,
    pub model: String,
    pub api_base: String,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn load(model: Option<String>, timeout_secs: Option<u64>) -> Result<Self, QuizError> {
        let lookup = get_api_key_from_sources()
            .map_err(|err| QuizError::Configuration(format!("{err:#}")))?;
        Self::from_lookup(lookup, model, timeout_secs)
    }

    pub fn from_lookup(
        lookup: ApiKeyLookup,
        model: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, QuizError> {
        let (Some(api_key), Some(key_source)) = (lookup.api_key, lookup.source) else {
            return Err(QuizError::Configuration(format!(
                "{API_KEY_ENV} is not set. Set it and restart, or run `quizgen key --set`."
            )));
        };

        let model = model
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            key_source,
            model,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}
