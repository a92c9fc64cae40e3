/// Hoops Analyzer
///
/// Submits cloud-stored basketball videos to Vertex AI Gemini with a shot
/// analysis prompt and normalizes the answer into structured data, raw text
/// or a diagnosable failure.

pub mod analysis;
pub mod config;
pub mod llm;
pub mod prompts;

pub use crate::analysis::{analyze, AnalysisOutput, AnalysisRequest, AnalysisResult, AnalysisStage, VideoAnalyzer};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::llm::{ContentPart, GenerateRequest, InferenceClient, InferenceResponse, SessionFactory};
pub use crate::llm::providers::{VertexProvider, VertexSessionFactory};
pub use crate::prompts::{basketball_prompt, PromptCatalog, PromptVariant};

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error types for analysis operations
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("File not found: {0}")]
    VideoNotFound(String),

    #[error("Error analyzing video: {0}")]
    VideoAnalysis(String),

    #[error("Invalid video input: {0}")]
    InvalidVideo(String),

    #[error("No text in Gemini response: {0}")]
    NoText(String),

    #[error("Transient submission failure: {0}")]
    Transient(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AnalysisError {
    /// Whether a submission that failed with this error may be attempted again
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Transient(_) => true,
            AnalysisError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
