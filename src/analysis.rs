//! Video analysis orchestration: session setup, bounded submission retries,
//! response text extraction and the JSON-to-text fallback.

use crate::config::Config;
use crate::llm::providers::VertexSessionFactory;
use crate::llm::{ContentPart, GenerateRequest, InferenceClient, InferenceResponse, SessionFactory};
use crate::prompts::{PromptCatalog, PromptVariant};
use crate::{AnalysisError, Result};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One video analysis invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub video_reference: String,
    pub prompt_variant: PromptVariant,
}

impl AnalysisRequest {
    pub fn new(video_reference: impl Into<String>, prompt_variant: PromptVariant) -> Self {
        Self {
            video_reference: video_reference.into(),
            prompt_variant,
        }
    }
}

/// Successful analysis payload
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    /// JSON decoded from the model answer, unwrapped
    Structured(Value),
    /// Trimmed model answer that was not valid JSON
    RawText(String),
}

/// Outcome of a single analysis call
#[derive(Debug)]
pub enum AnalysisResult {
    Success(AnalysisOutput),
    Failure(AnalysisError),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }

    pub fn structured(&self) -> Option<&Value> {
        match self {
            AnalysisResult::Success(AnalysisOutput::Structured(value)) => Some(value),
            _ => None,
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success(AnalysisOutput::RawText(text)) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            AnalysisResult::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Caller-facing JSON form: the parsed value, a string, or
    /// `{"ok": false, "error": "..."}` for every failure.
    pub fn to_value(&self) -> Value {
        match self {
            AnalysisResult::Success(AnalysisOutput::Structured(value)) => value.clone(),
            AnalysisResult::Success(AnalysisOutput::RawText(text)) => Value::String(text.clone()),
            AnalysisResult::Failure(e) => json!({ "ok": false, "error": e.to_string() }),
        }
    }
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Progress of an analysis call, reported in log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Init,
    SessionReady,
    Submitting(u32),
    ResponseReceived,
    TextExtracted,
    Parsed,
    RawText,
    Error,
    Done,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStage::Init => f.write_str("init"),
            AnalysisStage::SessionReady => f.write_str("session_ready"),
            AnalysisStage::Submitting(attempt) => write!(f, "submitting#{}", attempt),
            AnalysisStage::ResponseReceived => f.write_str("response_received"),
            AnalysisStage::TextExtracted => f.write_str("text_extracted"),
            AnalysisStage::Parsed => f.write_str("parsed"),
            AnalysisStage::RawText => f.write_str("raw_text"),
            AnalysisStage::Error => f.write_str("error"),
            AnalysisStage::Done => f.write_str("done"),
        }
    }
}

/// Submits basketball videos to the inference endpoint
pub struct VideoAnalyzer {
    config: Config,
    prompts: PromptCatalog,
    sessions: Box<dyn SessionFactory>,
}

impl VideoAnalyzer {
    /// Analyzer backed by Vertex AI and the built-in prompt
    pub fn new(config: Config) -> Self {
        Self::with_session_factory(config, PromptCatalog::default(), Box::new(VertexSessionFactory))
    }

    /// Analyzer backed by Vertex AI, loading the configured prompt file
    pub async fn from_config(config: Config) -> Self {
        let prompts = PromptCatalog::from_config(&config.prompts).await;
        Self::with_session_factory(config, prompts, Box::new(VertexSessionFactory))
    }

    pub fn with_session_factory(
        config: Config,
        prompts: PromptCatalog,
        sessions: Box<dyn SessionFactory>,
    ) -> Self {
        Self {
            config,
            prompts,
            sessions,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn analyze(&self, video_reference: &str, prompt_variant: PromptVariant) -> AnalysisResult {
        self.analyze_request(AnalysisRequest::new(video_reference, prompt_variant))
            .await
    }

    /// Run one analysis. Every failure is returned as `AnalysisResult::Failure`.
    pub async fn analyze_request(&self, request: AnalysisRequest) -> AnalysisResult {
        debug!(stage = %AnalysisStage::Init, "Analyzing {}", request.video_reference);

        match self.run(&request).await {
            Ok(output) => {
                info!(stage = %AnalysisStage::Done, "Analysis of {} complete", request.video_reference);
                AnalysisResult::Success(output)
            }
            Err(e) => {
                error!(
                    stage = %AnalysisStage::Error,
                    "Analysis of {} failed: {}", request.video_reference, e
                );
                AnalysisResult::Failure(e)
            }
        }
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisOutput> {
        let video_reference = request.video_reference.trim();
        validate_video_reference(video_reference)?;

        let client = self.sessions.connect(&self.config.vertex)?;
        info!(
            stage = %AnalysisStage::SessionReady,
            "Vertex session configured for {} (analysis choice: {})",
            client.endpoint(),
            request.prompt_variant
        );

        let prompt_text = self.prompts.resolve(request.prompt_variant);
        debug!("Using {} analysis prompt", request.prompt_variant);

        let generate = GenerateRequest {
            model: self.config.vertex.model.clone(),
            parts: vec![
                ContentPart::text(prompt_text),
                ContentPart::video(video_reference, self.config.vertex.video_mime_type.as_str()),
            ],
        };

        let response = self.submit_with_retry(client.as_ref(), &generate).await?;

        let text = extract_text(&response)?;
        debug!(stage = %AnalysisStage::TextExtracted, "Raw Gemini output: {}", text);

        Ok(parse_output(text))
    }

    /// Submit until a response object arrives. Only transient failures are
    /// retried; a response is never retried regardless of its content.
    async fn submit_with_retry(
        &self,
        client: &dyn InferenceClient,
        request: &GenerateRequest,
    ) -> Result<InferenceResponse> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut backoff = Duration::from_millis(self.config.retry.initial_backoff_ms);
        let mut attempt = 1;

        loop {
            info!(
                stage = %AnalysisStage::Submitting(attempt),
                "Submitting to {}, attempt {}/{}", request.model, attempt, max_attempts
            );

            match client.generate_content(request).await {
                Ok(response) => {
                    info!(
                        stage = %AnalysisStage::ResponseReceived,
                        "Response received (tokens: {:?})",
                        response.tokens_used()
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!("Attempt {} failed: {}; retrying in {:?}", attempt, e, backoff);
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Analyze a video with a Vertex-backed analyzer built from `config`
pub async fn analyze(
    video_reference: &str,
    prompt_variant: PromptVariant,
    config: Config,
) -> AnalysisResult {
    VideoAnalyzer::from_config(config)
        .await
        .analyze(video_reference, prompt_variant)
        .await
}

fn validate_video_reference(video_reference: &str) -> Result<()> {
    url::Url::parse(video_reference)
        .map(|_| ())
        .map_err(|e| {
            AnalysisError::InvalidVideo(format!("'{}' is not a valid URI: {}", video_reference, e))
        })
}

/// Trimmed answer text: top-level text first, then the first candidate part
fn extract_text(response: &InferenceResponse) -> Result<&str> {
    if let Some(text) = response.text() {
        return Ok(text.trim());
    }

    let text = match response.first_candidate_text() {
        Ok(text) => text.trim(),
        Err(e) => {
            if let Some(reason) = response.block_reason() {
                return Err(AnalysisError::InvalidVideo(format!(
                    "request blocked by endpoint: {}",
                    reason
                )));
            }
            return Err(e);
        }
    };

    if text.is_empty() {
        return Err(AnalysisError::NoText("first candidate text is blank".to_string()));
    }

    Ok(text)
}

fn parse_output(text: &str) -> AnalysisOutput {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            debug!(stage = %AnalysisStage::Parsed, "Parsed Gemini output as JSON");
            AnalysisOutput::Structured(value)
        }
        Err(e) => {
            info!(
                stage = %AnalysisStage::RawText,
                "Failed to parse Gemini output as JSON: {}", e
            );
            AnalysisOutput::RawText(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Candidate, Content, Part, PromptFeedback};

    #[test]
    fn test_extract_prefers_top_level_text() {
        let mut response = InferenceResponse::from_candidate_text("candidate");
        response.text = Some("  top level \n".to_string());
        assert_eq!(extract_text(&response).unwrap(), "top level");
    }

    #[test]
    fn test_extract_falls_back_to_candidate() {
        let mut response = InferenceResponse::from_candidate_text("\n candidate ");
        response.text = Some("   ".to_string());
        assert_eq!(extract_text(&response).unwrap(), "candidate");
    }

    #[test]
    fn test_extract_blank_candidate_is_error() {
        let response = InferenceResponse::from_candidate_text(" \t ");
        let err = extract_text(&response).unwrap_err();
        assert!(matches!(err, AnalysisError::NoText(_)));
    }

    #[test]
    fn test_extract_missing_part_text_is_error() {
        let response = InferenceResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part { text: None }],
                    role: None,
                }),
                finish_reason: None,
            }],
            ..InferenceResponse::default()
        };
        let err = extract_text(&response).unwrap_err();
        assert!(err.to_string().starts_with("No text in Gemini response:"));
    }

    #[test]
    fn test_extract_blocked_prompt_is_invalid_video() {
        let response = InferenceResponse {
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some("PROHIBITED_CONTENT".to_string()),
            }),
            ..InferenceResponse::default()
        };
        let err = extract_text(&response).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidVideo(ref m) if m.contains("PROHIBITED_CONTENT")));
    }

    #[test]
    fn test_parse_output_tiers() {
        assert_eq!(
            parse_output(r#"{"shots": []}"#),
            AnalysisOutput::Structured(json!({"shots": []}))
        );
        assert_eq!(
            parse_output("- Shot 1: make"),
            AnalysisOutput::RawText("- Shot 1: make".to_string())
        );
    }

    #[test]
    fn test_validate_video_reference() {
        assert!(validate_video_reference("gs://bucket/valid.mp4").is_ok());
        assert!(validate_video_reference("https://storage.googleapis.com/b/v.mp4").is_ok());
        assert!(matches!(
            validate_video_reference("just-a-file.mp4"),
            Err(AnalysisError::InvalidVideo(_))
        ));
        assert!(validate_video_reference("").is_err());
    }

    #[test]
    fn test_failure_envelope_is_uniform() {
        let credentials = AnalysisResult::Failure(AnalysisError::InvalidCredentials("expired".into()));
        let no_text = AnalysisResult::Failure(AnalysisError::NoText("empty".into()));

        for result in [credentials, no_text] {
            let value = result.to_value();
            assert_eq!(value["ok"], json!(false));
            assert!(value["error"].is_string());
        }
    }

    #[test]
    fn test_success_values_are_unwrapped() {
        let structured = AnalysisResult::Success(AnalysisOutput::Structured(json!({"a": 1})));
        assert_eq!(serde_json::to_value(&structured).unwrap(), json!({"a": 1}));

        let text = AnalysisResult::Success(AnalysisOutput::RawText("miss".into()));
        assert_eq!(serde_json::to_value(&text).unwrap(), json!("miss"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(AnalysisStage::Submitting(2).to_string(), "submitting#2");
        assert_eq!(AnalysisStage::SessionReady.to_string(), "session_ready");
    }
}
