//! Gemini API client.
//!
//! This module talks to the Generative Language REST API
//! (`models/{model}:generateContent`) and maps its failures onto
//! [`GeminiError`]. [`classify`] turns an error into the action the
//! summarization pipeline should take.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur when calling Gemini
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gemini returned no text")]
    EmptyResponse,

    #[error("Invalid JSON response from Gemini: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Failed to render prompt: {0}")]
    Prompt(String),
}

/// What the caller should do about a failed generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The key is out of quota; rotate to another one
    QuotaExceeded,
    /// Worth retrying with backoff
    Transient,
    /// Retrying cannot help
    Fatal,
}

/// Map an error onto an [`ErrorClass`].
///
/// Quota is recognized by status 429 or a message mentioning "quota",
/// regardless of where the message came from.
pub fn classify(error: &GeminiError) -> ErrorClass {
    if error.to_string().to_lowercase().contains("quota") {
        return ErrorClass::QuotaExceeded;
    }

    match error {
        GeminiError::Api { status: 429, .. } => ErrorClass::QuotaExceeded,
        GeminiError::Api { status, message } if message.contains("RESOURCE_EXHAUSTED") => {
            debug!("Treating {} RESOURCE_EXHAUSTED as quota", status);
            ErrorClass::QuotaExceeded
        }
        GeminiError::Api {
            status: 400 | 401 | 403 | 404,
            ..
        } => ErrorClass::Fatal,
        GeminiError::Api { .. } => ErrorClass::Transient,
        GeminiError::Transport(_) => ErrorClass::Transient,
        GeminiError::EmptyResponse => ErrorClass::Transient,
        GeminiError::JsonParseError(_) => ErrorClass::Transient,
        GeminiError::Prompt(_) => ErrorClass::Fatal,
    }
}

/// Anything that can turn a prompt into text using a given API key
pub trait TextGenerator {
    fn generate(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GeminiError>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// HTTP client for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub const DEFAULT_API_BASE: &'static str = "https://generativelanguage.googleapis.com";

    /// Create a client for a model with the given request timeout
    pub fn new(model: impl Into<String>, timeout: Duration) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            model: model.into(),
        })
    }

    /// Point the client at a different API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    /// Call Gemini with a text prompt
    #[instrument(skip(self, api_key, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn call_text(&self, api_key: &str, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Gemini responded with {}", status);

        if !status.is_success() {
            let message = parse_error_message(&body);
            warn!("Gemini request failed with {}: {}", status, message);
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        extract_text(parsed)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, GeminiError> {
        self.call_text(api_key, prompt).await
    }
}

/// Pull a readable message out of an error body, falling back to the raw text
fn parse_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{} ({})", envelope.error.message, envelope.error.status),
        Err(_) => body.trim().to_string(),
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GeminiError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GeminiError::EmptyResponse);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn api_error(status: u16, message: &str) -> GeminiError {
        GeminiError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_quota() {
        assert_eq!(
            classify(&api_error(429, "Too many requests")),
            ErrorClass::QuotaExceeded
        );
        assert_eq!(
            classify(&api_error(403, "You exceeded your current Quota")),
            ErrorClass::QuotaExceeded
        );
        assert_eq!(
            classify(&api_error(503, "busy (RESOURCE_EXHAUSTED)")),
            ErrorClass::QuotaExceeded
        );
    }

    #[test]
    fn test_classify_transient_and_fatal() {
        assert_eq!(
            classify(&api_error(500, "internal")),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&api_error(503, "overloaded")),
            ErrorClass::Transient
        );
        assert_eq!(classify(&GeminiError::EmptyResponse), ErrorClass::Transient);
        assert_eq!(
            classify(&api_error(400, "API key not valid")),
            ErrorClass::Fatal
        );
        assert_eq!(
            classify(&GeminiError::Prompt("bad template".to_string())),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            parse_error_message(body),
            "Resource has been exhausted (RESOURCE_EXHAUSTED)"
        );
        assert_eq!(parse_error_message("  plain failure \n"), "plain failure");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}}]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Hello, world");

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            extract_text(empty),
            Err(GeminiError::EmptyResponse)
        ));
    }

    async fn generate_content(
        Path(model): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if key == "spent" {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}})),
            );
        }

        let prompt = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": format!("{} says: {}", model, prompt)}]}}]
            })),
        )
    }

    async fn spawn_gemini() -> String {
        let app = Router::new().route("/v1beta/models/:model", post(generate_content));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_call_text_against_local_server() {
        let base = spawn_gemini().await;
        let client = GeminiClient::new("gemini-test", Duration::from_secs(5))
            .unwrap()
            .with_api_base(format!("{}/", base));

        let text = client.generate("good", "hello").await.unwrap();
        assert_eq!(text, "gemini-test:generateContent says: hello");
    }

    #[tokio::test]
    async fn test_quota_error_from_server() {
        let base = spawn_gemini().await;
        let client = GeminiClient::new("gemini-test", Duration::from_secs(5))
            .unwrap()
            .with_api_base(base);

        let err = client.generate("spent", "hello").await.unwrap_err();
        assert!(matches!(err, GeminiError::Api { status: 429, .. }));
        assert_eq!(classify(&err), ErrorClass::QuotaExceeded);
    }
}
