//! # Environment-Based Configuration
//!
//! LLM settings are read from `TRIAGENT_*` environment variables so the same
//! binary can run fully offline in development and against a real provider in
//! production.
//!
//! ## Environment Variables
//!
//! - `TRIAGENT_USE_STUB_LLM` - Force offline stub output (default: true)
//! - `TRIAGENT_LLM_API_KEY` - Provider credentials; absent means offline
//! - `TRIAGENT_LLM_BASE_URL` - OpenAI-compatible API root (default: `https://api.openai.com/v1`)
//! - `TRIAGENT_LLM_MODEL` - Primary model (default: `gpt-4o-mini`)
//! - `TRIAGENT_LLM_FALLBACK_MODEL` - Optional second model, tried after the primary
//! - `TRIAGENT_LLM_TEMPERATURE` - Sampling temperature 0.0-2.0 (default: 0.2)
//! - `TRIAGENT_LLM_MAX_OUTPUT_TOKENS` - Response token cap (default: 2048)
//! - `TRIAGENT_LLM_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `TRIAGENT_LLM_MAX_RETRIES` - Corrective retries per backend (default: 2)

use std::env;
use std::fmt;
use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Validated LLM configuration.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub use_stub_llm: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub fallback_model: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl LlmConfig {
    /// Whether a real backend should be used.
    ///
    /// Requires credentials and the stub switch turned off.
    pub fn is_llm_available(&self) -> bool {
        !self.use_stub_llm && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Models in fallback order.
    pub fn models(&self) -> Vec<&str> {
        let mut models = vec![self.model.as_str()];
        if let Some(fallback) = self.fallback_model.as_deref() {
            if fallback != self.model {
                models.push(fallback);
            }
        }
        models
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            use_stub_llm: true,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            fallback_model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("use_stub_llm", &self.use_stub_llm)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Builder for [`LlmConfig`] with environment variable support
#[derive(Debug, Clone, Default)]
pub struct LlmConfigBuilder {
    config: LlmConfig,
    timeout_secs: Option<u64>,
}

impl LlmConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(use_stub) = get_env_bool("TRIAGENT_USE_STUB_LLM")? {
            builder = builder.use_stub_llm(use_stub);
        }
        if let Some(key) = get_env_string("TRIAGENT_LLM_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(url) = get_env_string("TRIAGENT_LLM_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(model) = get_env_string("TRIAGENT_LLM_MODEL") {
            builder = builder.model(model);
        }
        if let Some(model) = get_env_string("TRIAGENT_LLM_FALLBACK_MODEL") {
            builder = builder.fallback_model(model);
        }
        if let Some(temperature) = get_env_f64("TRIAGENT_LLM_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }
        if let Some(tokens) = get_env_u32("TRIAGENT_LLM_MAX_OUTPUT_TOKENS")? {
            builder = builder.max_output_tokens(tokens);
        }
        if let Some(secs) = get_env_u64("TRIAGENT_LLM_TIMEOUT_SECS")? {
            builder = builder.timeout_secs(secs);
        }
        if let Some(retries) = get_env_u32("TRIAGENT_LLM_MAX_RETRIES")? {
            builder = builder.max_retries(retries);
        }

        Ok(builder)
    }

    pub fn use_stub_llm(mut self, use_stub: bool) -> Self {
        self.config.use_stub_llm = use_stub;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.config.fallback_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = tokens;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Validate configuration and build [`LlmConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<LlmConfig, ConfigError> {
        self.validate()?;

        let mut config = self.config;
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.config;

        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err(ConfigError::ValidationError(
                    "timeout_secs must be greater than 0".to_string(),
                ));
            }
            if secs > 300 {
                return Err(ConfigError::ValidationError(
                    "timeout_secs must be <= 300 (5 minutes)".to_string(),
                ));
            }
        }

        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if config.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_output_tokens must be greater than 0".to_string(),
            ));
        }

        if config.max_retries > 10 {
            return Err(ConfigError::ValidationError(
                "max_retries must be <= 10".to_string(),
            ));
        }

        if config.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model cannot be empty".to_string(),
            ));
        }

        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }

        Ok(())
    }
}

// Environment variable helper functions

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        Err(_) => Ok(None),
    }
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_f64(key: &str) -> Result<Option<f64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<f64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid f64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
