use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// `memory` selects the in-process catalog; anything else is a sqlite URL.
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "memory".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434/v1".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 45,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// TOML shape of a config file: every field optional, patched over defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Defaults, patched by an optional TOML file, then `PROCURA_*` env
    /// variables, then programmatic overrides; validated last.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                return Err(ConfigError::MissingConfigFile(
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
                ));
            }
            None => {}
        }

        config.apply_overrides(overrides_from_env()?);
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            apply_some(&mut self.database.url, database.url);
            apply_some(&mut self.database.max_connections, database.max_connections);
            apply_some(&mut self.database.timeout_secs, database.timeout_secs);
        }
        if let Some(llm) = patch.llm {
            apply_some(&mut self.llm.provider, llm.provider);
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            apply_some(&mut self.llm.model, llm.model);
            apply_some(&mut self.llm.timeout_secs, llm.timeout_secs);
            apply_some(&mut self.llm.max_retries, llm.max_retries);
        }
        if let Some(server) = patch.server {
            apply_some(&mut self.server.bind_address, server.bind_address);
            apply_some(&mut self.server.port, server.port);
            apply_some(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
        }
        if let Some(logging) = patch.logging {
            apply_some(&mut self.logging.level, logging.level);
            apply_some(&mut self.logging.format, logging.format);
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        apply_some(&mut self.database.url, overrides.database_url);
        apply_some(&mut self.logging.level, overrides.log_level);
        apply_some(&mut self.logging.format, overrides.log_format);
        apply_some(&mut self.llm.provider, overrides.llm_provider);
        apply_some(&mut self.llm.model, overrides.llm_model);
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        apply_some(&mut self.server.bind_address, overrides.bind_address);
        apply_some(&mut self.server.port, overrides.port);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.is_none() {
            return Err(ConfigError::Validation(
                "llm.api_key is required when llm.provider is openai".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const DEFAULT_CONFIG_FILE: &str = "procura.toml";

fn apply_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var("PROCURA_CONFIG") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn overrides_from_env() -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides {
        database_url: env_string("PROCURA_DATABASE_URL"),
        log_level: env_string("PROCURA_LOG_LEVEL"),
        llm_model: env_string("PROCURA_LLM_MODEL"),
        llm_api_key: env_string("PROCURA_LLM_API_KEY"),
        llm_base_url: env_string("PROCURA_LLM_BASE_URL"),
        bind_address: env_string("PROCURA_BIND_ADDRESS"),
        ..ConfigOverrides::default()
    };

    if let Some(value) = env_string("PROCURA_LOG_FORMAT") {
        overrides.log_format = Some(value.parse()?);
    }
    if let Some(value) = env_string("PROCURA_LLM_PROVIDER") {
        overrides.llm_provider = Some(value.parse()?);
    }
    if let Some(value) = env_string("PROCURA_SERVER_PORT") {
        overrides.port = Some(value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
            key: "PROCURA_SERVER_PORT".to_string(),
            value,
        })?);
    }
    Ok(overrides)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    #[test]
    fn defaults_use_in_memory_catalog_and_local_model() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert_eq!(config.database.url, "memory");
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[server]\nport = 9999\n\n[llm]\nmodel = \"llama3.2\"\n\n[logging]\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect("config loads");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.logging.format, LogFormat::Json);
        // Untouched sections keep their defaults.
        assert_eq!(config.database.url, "memory");
    }

    #[test]
    fn programmatic_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[database]\nurl = \"sqlite://from-file.db\"\n").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config loads");

        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/procura.toml".into()),
            require_file: false,
            ..LoadOptions::default()
        });
        // An explicit path that cannot be read fails regardless of require_file.
        assert!(result.is_err());
    }

    #[test]
    fn openai_provider_requires_an_api_key() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("validation error").to_string();
        assert!(message.contains("llm.api_key"));
    }

    #[test]
    fn api_key_override_satisfies_openai_validation() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                llm_api_key: Some("sk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config loads");

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert!(config.llm.api_key.is_some());
    }

    #[test]
    fn provider_and_format_parse_from_str() {
        assert_eq!("OpenAI".parse::<LlmProvider>().expect("parses"), LlmProvider::OpenAi);
        assert_eq!(" json ".parse::<LogFormat>().expect("parses"), LogFormat::Json);
        assert!("gpt".parse::<LlmProvider>().is_err());
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
