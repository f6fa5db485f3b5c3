//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the [`AppConfig`] struct, which selects the generation backend and
//! its connection settings, and a [`load_config`] function to load it from a
//! YAML file.
//!
//! # Examples
//!
//! ```no_run
//! use applemar_bot::config::{AppConfig, load_config};
//!
//! let config: AppConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config.provider);
//! ```
//!
//! A minimal file only needs the fields that differ from the defaults:
//!
//! ```yaml
//! provider: gemini
//! model: gemini-3-flash-preview
//! request_timeout_secs: 20
//! history:
//!   max_turns: 30
//!   max_tokens: 4000
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs, path::Path, path::PathBuf, time::Duration};

use crate::conversation::HistoryWindow;

/// Environment variable read for the upstream credential when the file has none.
pub const API_KEY_ENV: &str = "API_KEY";

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Which wire protocol the generation service speaks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Google Gemini `generateContent`.
    #[default]
    Gemini,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    OpenAi,
}

/// Runtime configuration of the bot.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Backend protocol.
    pub provider: Provider,

    /// Base URL of the generation API.
    pub api_base: String,

    /// Credential. When absent, [`API_KEY_ENV`] is read once at start-up.
    pub api_key: Option<String>,

    /// The name of the model to be used for generating responses.
    pub model: String,

    /// Upper bound on a single upstream call.
    pub request_timeout_secs: u64,

    /// Bounding policy for history sent upstream.
    pub history: HistoryWindow,

    /// Where bot settings and the connection flag are kept.
    /// Defaults to `<config_dir>/state.yaml`.
    pub state_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 30,
            history: HistoryWindow::default(),
            state_path: None,
        }
    }
}

impl AppConfig {
    /// The configured key, else the `API_KEY` environment variable, else empty.
    ///
    /// An empty key is not rejected here; it surfaces as an authentication
    /// failure on the first upstream call.
    pub fn resolve_api_key(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .unwrap_or_default()
    }

    /// Reject settings that would make every reply fail.
    ///
    /// # Errors
    ///
    /// Returns an error if `request_timeout_secs` is zero.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1".into());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the state file location.
    pub fn state_path(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::config_dir()?.join("state.yaml")),
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML for
/// [`AppConfig`], or fails [`AppConfig::validate`].
pub fn load_config(file: impl AsRef<Path>) -> Result<AppConfig, Box<dyn Error>> {
    let file = file.as_ref();
    tracing::debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`AppConfig::default`].
pub fn load_config_or_default(file: impl AsRef<Path>) -> Result<AppConfig, Box<dyn Error>> {
    let file = file.as_ref();
    if !file.exists() {
        tracing::info!(
            "No config at {}, using defaults (run `applemar init` to create one)",
            file.display()
        );
        return Ok(AppConfig::default());
    }
    load_config(file)
}
