use anyhow::{anyhow, Result};
use crate::llm::providers::ACCESS_TOKEN_ENV;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the Hoops Analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vertex AI endpoint settings
    pub vertex: VertexConfig,

    /// Submission retry settings
    pub retry: RetryConfig,

    /// Prompt template settings
    pub prompts: PromptConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexConfig {
    /// Google Cloud project hosting the model
    pub project: String,

    /// Region of the Vertex AI endpoint
    pub location: String,

    /// Model identifier
    pub model: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// OAuth access token; blank values fall back to `access_token_env`
    pub access_token: Option<String>,

    /// Environment variable holding the access token
    pub access_token_env: String,

    /// Scheme and host replacing `https://{location}-aiplatform.googleapis.com`;
    /// the `/v1/projects/...` path is still appended
    pub endpoint: Option<String>,

    /// MIME type declared for the video part
    pub video_mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum submission attempts per analysis
    pub max_attempts: u32,

    /// Delay before the second attempt, doubled for each further attempt
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Custom analysis prompt file
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project: "project-01".to_string(),
            location: "us-central1".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 600, // long videos take minutes to process
            access_token: None,
            access_token_env: ACCESS_TOKEN_ENV.to_string(),
            endpoint: None,
            video_mime_type: "video/mp4".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff_ms: 500,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first readable config file, otherwise
    /// from defaults overridden by environment variables
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "hoops-analyzer.toml",
            "config/hoops-analyzer.toml",
            "/etc/hoops-analyzer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` yields for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(project) = lookup("HOOPS_ANALYZER_PROJECT") {
            config.vertex.project = project;
        }

        if let Some(location) = lookup("HOOPS_ANALYZER_LOCATION") {
            config.vertex.location = location;
        }

        if let Some(model) = lookup("HOOPS_ANALYZER_MODEL") {
            config.vertex.model = model;
        }

        if let Some(attempts) = lookup("HOOPS_ANALYZER_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts.trim().parse().map_err(|e| {
                anyhow!("Invalid HOOPS_ANALYZER_MAX_ATTEMPTS '{}': {}", attempts, e)
            })?;
        }

        if let Some(log_level) = lookup("HOOPS_ANALYZER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.vertex.project.trim().is_empty() {
            return Err(anyhow!("vertex.project must not be empty"));
        }

        if self.vertex.location.trim().is_empty() {
            return Err(anyhow!("vertex.location must not be empty"));
        }

        if self.vertex.model.trim().is_empty() {
            return Err(anyhow!("vertex.model must not be empty"));
        }

        if self.vertex.timeout_seconds == 0 {
            return Err(anyhow!("vertex.timeout_seconds must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Hoops Analyzer Configuration:\n\
            - Project: {}\n\
            - Location: {}\n\
            - Model: {}\n\
            - Timeout: {}s\n\
            - Max Attempts: {}\n\
            - Custom Prompt: {}",
            self.vertex.project,
            self.vertex.location,
            self.vertex.model,
            self.vertex.timeout_seconds,
            self.retry.max_attempts,
            self.prompts
                .prompt_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string())
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.config.vertex.project = project.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.config.vertex.location = location.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.vertex.model = model.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.vertex.access_token = Some(token.into());
        self
    }

    pub fn with_access_token_env(mut self, variable: impl Into<String>) -> Self {
        self.config.vertex.access_token_env = variable.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.vertex.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.config.retry.initial_backoff_ms = backoff_ms;
        self
    }

    pub fn with_prompt_file(mut self, path: PathBuf) -> Self {
        self.config.prompts.prompt_file = Some(path);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
