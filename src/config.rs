use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// Config file read from the working directory when `CONFIG_PATH` is unset.
/// Missing is fine; every field has a default.
pub const DEFAULT_CONFIG_PATH: &str = "conf.yaml";

/// Prefix for environment overrides, e.g. `KANNADA__SYSTEM_CONFIG__PORT=8080`.
pub const ENV_PREFIX: &str = "KANNADA";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub translator_config: TranslatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Model directory, relative paths resolve from the working directory
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Prefixed to every input to select the output language of
    /// multilingual checkpoints. Empty disables the prefix.
    #[serde(default = "default_target_language_token")]
    pub target_language_token: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,
    #[serde(default)]
    pub device: DevicePreference,
}

fn default_model_path() -> String {
    "./model".to_string()
}

fn default_target_language_token() -> String {
    ">>kan<<".to_string()
}

fn default_max_output_tokens() -> usize {
    512
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            target_language_token: default_target_language_token(),
            max_output_tokens: default_max_output_tokens(),
            device: DevicePreference::default(),
        }
    }
}

impl TranslatorConfig {
    pub fn target_language_token(&self) -> Option<&str> {
        let token = self.target_language_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Cpu,
    Cuda,
    Metal,
    /// First available accelerator, else CPU
    Auto,
}

impl Config {
    /// Load configuration from `CONFIG_PATH` (must exist) or the default
    /// path (optional), then apply `KANNADA__*` environment overrides.
    ///
    /// Returns the config together with the file path that was consulted.
    pub fn load() -> Result<(Self, String)> {
        let (path, required) = match std::env::var("CONFIG_PATH") {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };

        let config = Self::load_from(&path, required, environment())?;
        Ok((config, path))
    }

    pub fn load_from(path: &str, required: bool, env: ::config::Environment) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(required))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: Config = settings
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.translator_config.max_output_tokens == 0 {
            anyhow::bail!("translator_config.max_output_tokens must be greater than 0");
        }
        if self.translator_config.model_path.trim().is_empty() {
            anyhow::bail!("translator_config.model_path must not be empty");
        }
        Ok(())
    }
}

/// Environment source for `KANNADA__SECTION__FIELD` overrides.
pub fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
