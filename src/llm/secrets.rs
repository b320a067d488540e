use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::{Password, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};

use crate::palette::Tone;
use crate::utils::{get_data_dir, strip_controls_and_escapes, trim_line};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const AUTH_FILE_NAME: &str = "auth.json";
const GEMINI_ENTRY: &str = "gemini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment,
    AuthFile,
}

impl ApiKeySource {
    pub fn description(&self) -> &'static str {
        match self {
            ApiKeySource::Environment => "environment variable",
            ApiKeySource::AuthFile => "local auth file",
        }
    }
}

#[derive(Debug)]
pub struct ApiKeyLookup {
    pub api_key: Option<String>,
    pub source: Option<ApiKeySource>,
}

/// Keys by service name. Entries for other services are carried through untouched.
type KeyEntries = BTreeMap<String, StoredKey>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredKey {
    key: String,
}

/// The `auth.json` file holding the Gemini key.
struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    fn in_data_dir() -> Result<Self> {
        Ok(Self::at(get_data_dir()?.join(AUTH_FILE_NAME)))
    }

    fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn entries(&self) -> Result<KeyEntries> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(KeyEntries::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read auth file at {}", self.path.display())
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(KeyEntries::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse auth file at {}", self.path.display()))
    }

    fn gemini_key(&self) -> Result<Option<String>> {
        Ok(self
            .entries()?
            .get(GEMINI_ENTRY)
            .and_then(|entry| trim_line(&entry.key))
            .map(str::to_string))
    }

    fn save_gemini_key(&self, api_key: &str) -> Result<()> {
        let key = trim_line(api_key).context("Cannot store an empty API key")?;
        let mut entries = self.entries()?;
        entries.insert(
            GEMINI_ENTRY.to_string(),
            StoredKey {
                key: key.to_string(),
            },
        );
        self.write(&entries)
    }

    /// Returns whether a key was removed. The file goes away with its last entry.
    fn remove_gemini_key(&self) -> Result<bool> {
        let mut entries = self.entries()?;
        if entries.remove(GEMINI_ENTRY).is_none() {
            return Ok(false);
        }
        if entries.is_empty() {
            remove_if_present(&self.path)?;
        } else {
            self.write(&entries)?;
        }
        Ok(true)
    }

    fn write(&self, entries: &KeyEntries) -> Result<()> {
        let mut contents = serde_json::to_string_pretty(entries)?;
        contents.push('\n');
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write auth file at {}", self.path.display()))
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err)
            .with_context(|| format!("Failed to remove auth file at {}", path.display())),
        _ => Ok(()),
    }
}

pub fn prompt_for_api_key() -> Result<String> {
    println!(
        "{} (https://aistudio.google.com/app/apikey). It's stored locally for future use.",
        Tone::Success.paint("Enter your Gemini API key")
    );
    let entered = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API Key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read API key")?;

    Ok(strip_controls_and_escapes(&entered))
}

pub fn store_api_key(api_key: &str) -> Result<()> {
    AuthStore::in_data_dir()?.save_gemini_key(api_key)
}

pub fn clear_api_key() -> Result<bool> {
    AuthStore::in_data_dir()?.remove_gemini_key()
}

/// `GEMINI_API_KEY` first, then the auth file.
pub fn get_api_key_from_sources() -> Result<ApiKeyLookup> {
    resolve_api_key(env::var(API_KEY_ENV).ok(), &AuthStore::in_data_dir()?)
}

fn resolve_api_key(env_value: Option<String>, store: &AuthStore) -> Result<ApiKeyLookup> {
    if let Some(key) = env_value.as_deref().and_then(trim_line) {
        return Ok(ApiKeyLookup {
            api_key: Some(key.to_string()),
            source: Some(ApiKeySource::Environment),
        });
    }

    let stored = store.gemini_key()?;
    Ok(ApiKeyLookup {
        source: stored.as_ref().map(|_| ApiKeySource::AuthFile),
        api_key: stored,
    })
}
