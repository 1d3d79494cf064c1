//! The optional settings file.
//!
//! ```toml
//! [openai]
//! base_url = "http://localhost:11434/v1"
//! api_key = "sk-..."
//!
//! [[agents]]
//! name = "butler"
//! instructions = "You serve tea."
//! model = "ollama/llama3"
//! tools = ["get_weather"]
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Everything read from the settings file and the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The OpenAI-compatible endpoint.
    pub openai: OpenAISettings,
    /// Agents defined in addition to the built-in ones.
    pub agents: Vec<AgentSettings>,
}

/// Connection settings of the `openai` provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Base URL of the chat-completions API.
    pub base_url: Option<String>,
    /// Bearer token, if the endpoint wants one.
    pub api_key: Option<String>,
}

/// An agent defined in the settings file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Unique agent name.
    pub name: String,
    /// System instruction.
    pub instructions: String,
    /// Model reference, the default model when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Names of built-in tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

impl Settings {
    /// Returns `<config_dir>/alfred/config.toml`, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("alfred").join("config.toml"))
    }

    /// Loads the settings and applies environment overrides.
    ///
    /// An explicit `path` must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Parses the TOML form.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings")
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read settings from {}", path.display())
        })?;
        debug!("loaded settings from {}", path.display());
        toml::from_str(&text).with_context(|| {
            format!("failed to parse settings from {}", path.display())
        })
    }

    /// Overrides the `[openai]` values with `OPENAI_BASE_URL` (or
    /// `OPENAI_API_BASE`) and `OPENAI_API_KEY`. Empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(base_url) =
            var("OPENAI_BASE_URL").or_else(|| var("OPENAI_API_BASE"))
        {
            self.openai.base_url = Some(base_url);
        }
        if let Some(api_key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(api_key);
        }
    }
}
