pub mod providers;

use crate::config::VertexConfig;
use crate::{AnalysisError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ordered piece of multimodal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    FileData { file_uri: String, mime_type: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn video(file_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentPart::FileData {
            file_uri: file_uri.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A single generateContent call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
}

/// Response returned by the inference endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    /// Top-level aggregated text, when the endpoint provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub total_token_count: u32,
}

impl InferenceResponse {
    /// Response carrying only top-level text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Response carrying text in its first candidate only
    pub fn from_candidate_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part { text: Some(text.into()) }],
                    role: Some("model".to_string()),
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            ..Self::default()
        }
    }

    /// Primary accessor: top-level text, ignoring blank values
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Secondary accessor: `candidates[0].content.parts[0].text`
    pub fn first_candidate_text(&self) -> Result<&str> {
        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| AnalysisError::NoText("response has no candidates".to_string()))?;

        let content = candidate.content.as_ref().ok_or_else(|| {
            AnalysisError::NoText(format!(
                "first candidate has no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let part = content
            .parts
            .first()
            .ok_or_else(|| AnalysisError::NoText("first candidate has no parts".to_string()))?;

        part.text
            .as_deref()
            .ok_or_else(|| AnalysisError::NoText("first part has no text".to_string()))
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    pub fn tokens_used(&self) -> Option<u32> {
        self.usage_metadata.as_ref().map(|u| u.total_token_count)
    }
}

/// Trait for inference endpoints
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<InferenceResponse>;
    fn endpoint(&self) -> &str;
}

/// Establishes an authenticated session against an inference endpoint
pub trait SessionFactory: Send + Sync {
    fn connect(&self, config: &VertexConfig) -> Result<Box<dyn InferenceClient>>;
}
