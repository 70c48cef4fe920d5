
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::index::Distance;

const APP_DIR_NAME: &str = "idontreadpdfs";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Overrides the provider's default chunk window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingConfig>,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Hosted API used for embeddings and chat completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::OpenAi, Self::Gemini];

    /// Chunk window each provider variant was tuned with
    #[inline]
    pub const fn default_chunking(self) -> ChunkingConfig {
        match self {
            Self::OpenAi => ChunkingConfig::new(500, 50),
            Self::Gemini => ChunkingConfig::new(300, 50),
        }
    }
}

impl fmt::Display for Provider {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub batch_size: u32,
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 1000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub batch_size: u32,
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            chat_model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            batch_size: 100,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the chat model as context
    pub top_k: usize,
    pub distance: Distance,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            distance: Distance::Euclidean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    /// Total attempts per request; 1 disables retries
    pub retry_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            retry_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where uploaded PDFs are written; defaults to a directory under the system temp dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<PathBuf>,
    pub max_upload_mb: usize,
    /// Sessions untouched for this long lose their document and upload
    pub session_idle_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            upload_dir: None,
            max_upload_mb: 200,
            session_idle_minutes: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid host: {0:?} (cannot be empty)")]
    InvalidHost(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key variable name: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    InvalidChunkOverlap(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid upload limit: {0} MB (must be between 1 and 2048)")]
    InvalidUploadLimit(usize),
    #[error("Invalid session idle time: {0} minutes (must be between 1 and 10080)")]
    InvalidSessionIdle(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            chunking: None,
            retrieval: RetrievalConfig::default(),
            http: HttpConfig::default(),
            server: ServerConfig::default(),
            base_dir: Self::config_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Default configuration directory for the current user
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Chunk window in effect: the explicit override or the provider default
    #[inline]
    pub fn chunking(&self) -> ChunkingConfig {
        self.chunking
            .unwrap_or_else(|| self.provider.default_chunking())
    }

    /// Directory uploaded PDFs are written to
    #[inline]
    pub fn upload_dir(&self) -> PathBuf {
        self.server
            .upload_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME))
    }

    /// Name of the environment variable the active provider reads its key from
    #[inline]
    pub fn api_key_env(&self) -> &str {
        match self.provider {
            Provider::OpenAi => &self.openai.api_key_env,
            Provider::Gemini => &self.gemini.api_key_env,
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.gemini.validate()?;
        validate_chunking(&self.chunking())?;
        self.retrieval.validate()?;
        self.http.validate()?;
        self.server.validate()?;
        Ok(())
    }

    #[inline]
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
    }

    #[inline]
    pub fn set_chunking(&mut self, chunking: ChunkingConfig) -> Result<(), ConfigError> {
        validate_chunking(&chunking)?;
        self.chunking = Some(chunking);
        Ok(())
    }

    #[inline]
    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.retrieval.top_k = top_k;
        Ok(())
    }
}

/// Read an API key from the named environment variable. Blank values count as missing.
#[inline]
pub fn read_api_key(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

fn validate_chunking(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if !(1..=100_000).contains(&config.chunk_size) {
        return Err(ConfigError::InvalidChunkSize(config.chunk_size));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(ConfigError::InvalidChunkOverlap(
            config.chunk_overlap,
            config.chunk_size,
        ));
    }

    Ok(())
}

fn validate_endpoint(
    base_url: &str,
    models: [&str; 2],
    api_key_env: &str,
    batch_size: u32,
    temperature: f32,
) -> Result<(), ConfigError> {
    let url = Url::parse(base_url).map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(base_url.to_string()));
    }

    if let Some(model) = models.iter().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::InvalidModel((*model).to_string()));
    }

    if api_key_env.trim().is_empty() {
        return Err(ConfigError::InvalidApiKeyEnv(api_key_env.to_string()));
    }

    if batch_size == 0 || batch_size > 2048 {
        return Err(ConfigError::InvalidBatchSize(batch_size));
    }

    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::InvalidTemperature(temperature));
    }

    Ok(())
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(
            &self.base_url,
            [&self.embedding_model, &self.chat_model],
            &self.api_key_env,
            self.batch_size,
            self.temperature,
        )
    }

    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(
            &self.base_url,
            [&self.embedding_model, &self.chat_model],
            &self.api_key_env,
            self.batch_size,
            self.temperature,
        )
    }

    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }
        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if !(1..=2048).contains(&self.max_upload_mb) {
            return Err(ConfigError::InvalidUploadLimit(self.max_upload_mb));
        }
        if !(1..=10_080).contains(&self.session_idle_minutes) {
            return Err(ConfigError::InvalidSessionIdle(self.session_idle_minutes));
        }
        Ok(())
    }

    /// Address the web server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub const fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes * 60)
    }
}
