use crate::log_debug;
use crate::providers::{Provider, ProviderConfig, ProviderError};

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the provider
pub const PROVIDER_ENV: &str = "CODE_SCRIBE_PROVIDER";
/// Environment variable overriding the active provider's model
pub const MODEL_ENV: &str = "CODE_SCRIBE_MODEL";

/// Configuration structure for the code-scribe server
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    /// LLM provider used for every task
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Upper bound on a single model call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Language assumed for snippets that do not name one
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Append-only operations log
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// HTTP listener configuration
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

fn default_provider() -> String {
    Provider::default().name().to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_language() -> String {
    crate::types::DEFAULT_LANGUAGE.to_string()
}

fn default_log_file() -> String {
    "logs/agent.log".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            server: ServerConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            default_language: default_language(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Load the personal configuration file if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            log_debug!("No configuration file at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        log_debug!("Configuration loaded for provider {}", config.default_provider);
        Ok(config)
    }

    /// Load an explicitly requested configuration file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!(
                "Configuration file not found: {}",
                path.display()
            ));
        }

        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| {
            format!(
                "Invalid configuration file format in {}. Please check it for syntax errors.",
                path.display()
            )
        })
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a function so callers other than `load` can supply
    /// values without touching the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(PROVIDER_ENV).filter(|p| !p.trim().is_empty()) {
            log_debug!("Provider overridden from environment: {}", provider);
            self.default_provider = provider.trim().to_lowercase();
        }
        self.canonicalize_provider_names();

        for provider in Provider::ALL {
            if let Some(key) = lookup(provider.api_key_env()) {
                self.providers
                    .entry(provider.name().to_string())
                    .or_default()
                    .api_key = key.trim().to_string();
            }
        }

        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            let name = self.default_provider.clone();
            self.providers.entry(name).or_default().model = model.trim().to_string();
        }
    }

    /// Rewrite provider aliases (`gemini`, `claude`) to their canonical names,
    /// both for the selected provider and for the keys of the provider tables.
    /// A canonical table wins over an alias table for the same provider.
    fn canonicalize_provider_names(&mut self) {
        if let Ok(provider) = self.default_provider.parse::<Provider>() {
            self.default_provider = provider.name().to_string();
        }

        let aliased: Vec<(String, Provider)> = self
            .providers
            .keys()
            .filter_map(|key| {
                let provider = key.parse::<Provider>().ok()?;
                (key != provider.name()).then(|| (key.clone(), provider))
            })
            .collect();
        for (alias, provider) in aliased {
            if let Some(table) = self.providers.remove(&alias) {
                self.providers
                    .entry(provider.name().to_string())
                    .or_insert(table);
            }
        }
    }

    /// The configured provider
    pub fn provider(&self) -> Result<Provider, ProviderError> {
        self.default_provider.parse()
    }

    /// Configuration of the active provider, falling back to defaults
    pub fn active_provider_config(&self) -> Result<ProviderConfig, ProviderError> {
        let provider = self.provider()?;
        Ok(self
            .providers
            .get(provider.name())
            .cloned()
            .unwrap_or_default())
    }

    /// API key of the active provider, if one is usable
    pub fn credential(&self) -> Result<String, ProviderError> {
        let provider = self.provider()?;
        let provider_config = self.active_provider_config()?;
        if provider_config.has_api_key() {
            Ok(provider_config.api_key.trim().to_string())
        } else {
            Err(ProviderError::MissingApiKey {
                provider,
                env_var: provider.api_key_env(),
            })
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }

    /// Get the path to the personal configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("code-scribe");
        path.push("config.toml");
        Ok(path)
    }
}
