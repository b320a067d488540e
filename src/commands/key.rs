use anyhow::{Result, bail};
use tracing::info;

use crate::config::Config;
use crate::llm::gemini::GeminiClient;
use crate::llm::secrets::{ApiKeySource, clear_api_key, prompt_for_api_key, store_api_key};
use crate::utils::{ask_yn, trim_line};

/// `set` is `Some(None)` when `--set` was passed without a value.
pub async fn run(set: Option<Option<String>>, clear: bool, test: bool) -> Result<()> {
    let mut action_taken = false;

    if let Some(value) = set {
        let key = match value.as_deref().and_then(trim_line) {
            Some(key) => key.to_string(),
            None => prompt_for_api_key()?,
        };
        store_api_key(&key)?;
        info!("stored api key in auth file");
        println!("Stored Gemini API key in the local auth file.");
        action_taken = true;
    }

    if clear {
        if ask_yn("This removes the stored Gemini API key from the local auth file.".to_string())? {
            if clear_api_key()? {
                println!("Removed the stored Gemini API key.");
            } else {
                println!("No Gemini API key found in the auth file.");
            }
        }
        action_taken = true;
    }

    if test {
        let source = test_configured_api_key().await?;
        println!("Gemini API key from the {} is valid.", source.description());
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}

async fn test_configured_api_key() -> Result<ApiKeySource> {
    let config = Config::load(None, None)?;
    let client = GeminiClient::new(&config)?;
    client.healthcheck().await?;
    info!(source = config.key_source.description(), "api key verified");
    Ok(config.key_source)
}
