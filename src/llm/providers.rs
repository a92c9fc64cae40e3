use super::{ContentPart, GenerateRequest, InferenceClient, InferenceResponse, SessionFactory};
use crate::config::VertexConfig;
use crate::{AnalysisError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Environment variable consulted when no access token is configured
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Vertex AI Gemini provider implementation
pub struct VertexProvider {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct VertexRequest<'a> {
    contents: Vec<VertexContent<'a>>,
}

#[derive(Debug, Serialize)]
struct VertexContent<'a> {
    role: &'static str,
    parts: Vec<VertexPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum VertexPart<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: VertexFileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexFileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

impl<'a> From<&'a GenerateRequest> for VertexRequest<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => VertexPart::Text { text },
                ContentPart::FileData { file_uri, mime_type } => VertexPart::FileData {
                    file_data: VertexFileData { mime_type, file_uri },
                },
            })
            .collect();

        Self {
            contents: vec![VertexContent { role: "user", parts }],
        }
    }
}

impl VertexProvider {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        let access_token = resolve_access_token(
            config.access_token.as_deref(),
            std::env::var(&config.access_token_env).ok(),
        )
        .ok_or_else(|| {
            AnalysisError::InvalidCredentials(format!(
                "no access token configured; set vertex.access_token or {}",
                config.access_token_env
            ))
        })?;

        if config.project.trim().is_empty() || config.location.trim().is_empty() {
            return Err(AnalysisError::Configuration(
                "Vertex project and location are required".to_string(),
            ));
        }

        let host = config.endpoint.clone().unwrap_or_else(|| {
            format!("https://{}-aiplatform.googleapis.com", config.location)
        });
        let base_url = format!(
            "{}/v1/projects/{}/locations/{}",
            host.trim_end_matches('/'),
            config.project,
            config.location
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!(
            "{}/publishers/google/models/{}:generateContent",
            self.base_url, model
        )
    }
}

#[async_trait]
impl InferenceClient for VertexProvider {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<InferenceResponse> {
        let url = self.model_url(&request.model);
        let body = VertexRequest::from(request);

        debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let text = response.text().await.map_err(classify_transport)?;
        decode_response(&text)
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

/// Opens Vertex AI sessions from configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexSessionFactory;

impl SessionFactory for VertexSessionFactory {
    fn connect(&self, config: &VertexConfig) -> Result<Box<dyn InferenceClient>> {
        Ok(Box::new(VertexProvider::new(config)?))
    }
}

/// Configured token first, then the environment; blank values count as absent
fn resolve_access_token(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| {
            from_env
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
}

fn decode_response(body: &str) -> Result<InferenceResponse> {
    serde_json::from_str(body).map_err(|e| {
        AnalysisError::Unexpected(format!("failed to decode Vertex response: {}", e))
    })
}

fn classify_transport(error: reqwest::Error) -> AnalysisError {
    if error.is_timeout() || error.is_connect() {
        AnalysisError::Transient(error.to_string())
    } else {
        AnalysisError::Http(error)
    }
}

/// Map a non-success HTTP status onto the analysis error taxonomy
pub(crate) fn classify_status(status: StatusCode, body: &str) -> AnalysisError {
    let detail = format!("Vertex API error {}: {}", status, body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalysisError::InvalidCredentials(detail),
        StatusCode::NOT_FOUND => AnalysisError::VideoNotFound(detail),
        StatusCode::BAD_REQUEST => AnalysisError::InvalidVideo(detail),
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS
        | StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => AnalysisError::Transient(detail),
        _ => AnalysisError::VideoAnalysis(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> VertexConfig {
        VertexConfig {
            access_token: token.map(str::to_string),
            access_token_env: "HOOPS_ANALYZER_PROVIDER_TEST_TOKEN_UNSET".to_string(),
            ..VertexConfig::default()
        }
    }

    #[test]
    fn test_request_wire_format() {
        let request = GenerateRequest {
            model: "gemini-2.5-flash".to_string(),
            parts: vec![
                ContentPart::text("Analyze"),
                ContentPart::video("gs://bucket/game.mp4", "video/mp4"),
            ],
        };

        let value = serde_json::to_value(VertexRequest::from(&request)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Analyze"},
                        {"fileData": {"mimeType": "video/mp4", "fileUri": "gs://bucket/game.mp4"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_model_url_uses_project_and_location() {
        let provider = VertexProvider::new(&config_with_token(Some("token"))).unwrap();
        assert_eq!(
            provider.model_url("gemini-2.5-flash"),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/project-01/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let config = VertexConfig {
            endpoint: Some("http://localhost:8080/".to_string()),
            ..config_with_token(Some("token"))
        };
        let provider = VertexProvider::new(&config).unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1/projects/project-01/locations/us-central1"
        );
    }

    #[test]
    fn test_blank_token_is_invalid_credentials() {
        let result = VertexProvider::new(&config_with_token(Some("   ")));
        assert!(matches!(result, Err(AnalysisError::InvalidCredentials(_))));

        let result = VertexProvider::new(&config_with_token(None));
        assert!(matches!(result, Err(AnalysisError::InvalidCredentials(_))));
    }

    #[test]
    fn test_blank_configured_token_falls_back_to_env() {
        assert_eq!(
            resolve_access_token(Some(""), Some("env-token".to_string())),
            Some("env-token".to_string())
        );
        assert_eq!(
            resolve_access_token(Some("  "), Some(" env-token\n".to_string())),
            Some("env-token".to_string())
        );
        assert_eq!(
            resolve_access_token(Some("cfg-token"), Some("env-token".to_string())),
            Some("cfg-token".to_string())
        );
        assert_eq!(resolve_access_token(Some(""), Some(" ".to_string())), None);
        assert_eq!(resolve_access_token(None, None), None);
    }

    #[test]
    fn test_blank_configured_token_uses_env_variable() {
        let config = VertexConfig {
            access_token: Some(String::new()),
            access_token_env: "HOOPS_ANALYZER_PROVIDER_TEST_TOKEN_SET".to_string(),
            ..VertexConfig::default()
        };
        std::env::set_var("HOOPS_ANALYZER_PROVIDER_TEST_TOKEN_SET", "env-token");

        let provider = VertexProvider::new(&config).unwrap();
        assert_eq!(provider.access_token, "env-token");
    }

    #[test]
    fn test_undecodable_body_is_unexpected() {
        let err = decode_response("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, AnalysisError::Unexpected(_)));
        assert!(err.to_string().starts_with("Unexpected error: failed to decode Vertex response"));

        let response = decode_response(r#"{"text": "Shot 1: make."}"#).unwrap();
        assert_eq!(response.text(), Some("Shot 1: make."));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            AnalysisError::InvalidCredentials(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "object gs://bucket/x.mp4 not found"),
            AnalysisError::VideoNotFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "unsupported mime type"),
            AnalysisError::InvalidVideo(_)
        ));
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "corrupt stream"),
            AnalysisError::VideoAnalysis(_)
        ));
    }
}
