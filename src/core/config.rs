//! Configuration management for Threadkeep
//!
//! Supports environment variables, config files, and runtime overrides.
//! Credentials are only ever read from the environment (or a `.env` file)
//! and are never written back to the config file.
//!
//! Config file location: ~/.config/threadkeep/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::error::{Result, ThreadkeepError};

/// Environment variable holding the Gemini credential
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Environment variable holding the Alpha Vantage credential
pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";

/// Main configuration for Threadkeep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which model provider drives the agent
    #[serde(default)]
    pub provider: ProviderType,
    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Checkpoint storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Built-in tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    Ollama,
}

impl Default for ProviderType {
    fn default() -> Self {
        env::var("THREADKEEP_PROVIDER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(ProviderType::Gemini)
    }
}

impl FromStr for ProviderType {
    type Err = ThreadkeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "ollama" => Ok(ProviderType::Ollama),
            other => Err(ThreadkeepError::config(format!(
                "Unknown provider '{}'. Available: gemini, ollama",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::Ollama => write!(f, "ollama"),
        }
    }
}

/// Google Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key, from GOOGLE_API_KEY
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Model name
    /// Default: gemini-2.0-flash-exp
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Model name (must support tool calling)
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Checkpoint storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
}

/// Built-in tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Alpha Vantage API key, from ALPHA_VANTAGE_API_KEY
    #[serde(skip)]
    pub alpha_vantage_api_key: Option<String>,
    /// Alpha Vantage query endpoint
    pub alpha_vantage_url: String,
    /// DuckDuckGo instant answer endpoint
    pub search_url: String,
    /// Search region
    pub search_region: String,
    /// Maximum number of snippets returned by a search
    pub max_search_results: usize,
    /// Per-call timeout for tool execution in seconds
    pub timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model + tool steps per turn before the turn is stopped
    /// Default: 25
    pub max_steps: usize,
    /// Dispatch the tool calls of one batch concurrently
    pub parallel_tools: bool,
    /// System prompt sent with every model call (never stored in threads)
    pub system_prompt: Option<String>,
    /// Whether to show debug output
    pub debug: bool,
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn env_secret(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: env_secret(GOOGLE_API_KEY),
            model: env::var("THREADKEEP_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string()),
            temperature: 0.0,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            timeout_secs: 120,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: env::var("THREADKEEP_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("chatbot.db")),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: env_secret(ALPHA_VANTAGE_API_KEY),
            alpha_vantage_url: "https://www.alphavantage.co/query".to_string(),
            search_url: "https://api.duckduckgo.com/".to_string(),
            search_region: "us-en".to_string(),
            max_search_results: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: env::var("THREADKEEP_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            parallel_tools: true,
            system_prompt: None,
            debug: env_flag("THREADKEEP_DEBUG", false),
        }
    }
}

impl Config {
    /// `<platform config dir>/threadkeep`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("threadkeep")
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Build the effective configuration.
    ///
    /// `.env` is read first so its values reach the env-backed defaults; a
    /// readable config file then wins over those defaults. CLI flags are
    /// applied by the caller afterwards.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::read_file().unwrap_or_default()
    }

    /// Parse the config file, or `None` when it is absent or unreadable
    pub fn read_file() -> Option<Self> {
        let text = fs::read_to_string(Self::config_file()).ok()?;
        Self::from_toml(&text).ok()
    }

    /// Parse configuration from TOML text, filling credentials from the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| ThreadkeepError::config(format!("Invalid config TOML: {}", e)))?;

        config.gemini.api_key = env_secret(GOOGLE_API_KEY);
        config.tools.alpha_vantage_api_key = env_secret(ALPHA_VANTAGE_API_KEY);
        Ok(config)
    }

    /// Write the non-secret settings to the config file and return its path
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file();
        let io_err = |e: std::io::Error| {
            ThreadkeepError::config(format!("Cannot write {}: {}", path.display(), e))
        };

        fs::create_dir_all(Self::config_dir()).map_err(io_err)?;
        let text = toml::to_string_pretty(self)
            .map_err(|e| ThreadkeepError::config(format!("Cannot serialize config: {}", e)))?;
        fs::write(&path, text).map_err(io_err)?;
        Ok(path)
    }

    /// Check the settings the process cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderType::Gemini && self.gemini.api_key.is_none() {
            return Err(ThreadkeepError::MissingCredential(GOOGLE_API_KEY.to_string()));
        }

        if self.agent.max_steps == 0 {
            return Err(ThreadkeepError::config("agent.max_steps must be at least 1"));
        }

        Ok(())
    }

    /// Name of the model used by the active provider
    pub fn model_name(&self) -> &str {
        match self.provider {
            ProviderType::Gemini => &self.gemini.model,
            ProviderType::Ollama => &self.ollama.model,
        }
    }

    /// Override the model of the active provider
    pub fn set_model(&mut self, model: impl Into<String>) {
        match self.provider {
            ProviderType::Gemini => self.gemini.model = model.into(),
            ProviderType::Ollama => self.ollama.model = model.into(),
        }
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.temperature, 0.0);
        assert_eq!(config.tools.search_region, "us-en");
        assert_eq!(config.tools.max_search_results, 5);
        assert!(config.agent.parallel_tools);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            provider = "ollama"

            [agent]
            max_steps = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.provider, ProviderType::Ollama);
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.tools.timeout_secs, 30);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml("provider = [").unwrap_err();
        assert!(matches!(
            err,
            ThreadkeepError::Config(ref m) if m.starts_with("Invalid config TOML")
        ));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = Config::default();
        config.gemini.api_key = Some("secret-key".to_string());
        config.tools.alpha_vantage_api_key = Some("other-secret".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("secret"));
        assert!(toml_str.contains("max_steps"));
    }

    #[test]
    fn test_validate_requires_gemini_key() {
        let mut config = Config::default();
        config.provider = ProviderType::Gemini;
        config.gemini.api_key = None;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ThreadkeepError::MissingCredential(ref k) if k == GOOGLE_API_KEY));
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = Config::default();
        config.provider = ProviderType::Ollama;
        config.gemini.api_key = None;
        config.agent.max_steps = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let mut config = Config::default();
        config.provider = ProviderType::Ollama;
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Gemini".parse::<ProviderType>().unwrap(), ProviderType::Gemini);
        assert_eq!("ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
        assert!("openrouter".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("threadkeep"));
    }
}
