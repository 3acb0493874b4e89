//! The response-generating collaborator and its Gemini implementation.

#![allow(missing_docs)]

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::core::config::ModelConfig;
use crate::core::errors::{Result, TutorError};

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One prior exchange half, owned by the caller and passed on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Everything a responder needs to answer one query.
#[derive(Debug, Clone, Copy)]
pub struct ResponseRequest<'a> {
    pub query: &'a str,
    /// Prior turns, oldest first, not including `query`.
    pub turns: &'a [Turn],
    pub system_instruction: &'a str,
    pub max_output_tokens: u32,
}

/// Produces a tutor reply. Implementations report transient throttling as
/// [`TutorError::RateLimited`]; every other error is final.
pub trait Responder {
    fn model_id(&self) -> &str;
    fn respond(&self, request: &ResponseRequest<'_>) -> Result<String>;
}

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| TutorError::Runtime {
                details: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_id.clone(),
            api_key: api_key.into(),
        })
    }

    /// Build a client with the key read from `config.api_key_env`.
    pub fn from_env(config: &ModelConfig) -> Result<Self> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TutorError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(config, key)
    }
}

impl Responder for GeminiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn respond(&self, request: &ResponseRequest<'_>) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest::from_request(request);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|err| TutorError::ModelApi {
                status: None,
                message: format!("request failed: {err}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body_text, retry_after));
        }

        let parsed: GenerateContentResponse =
            response.json().map_err(|err| TutorError::ModelApi {
                status: Some(status.as_u16()),
                message: format!("unreadable response body: {err}"),
            })?;
        extract_text(parsed)
    }
}

// ──────────────────── wire types ────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemContent>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_request(request: &ResponseRequest<'_>) -> Self {
        let mut contents: Vec<Content> = request
            .turns
            .iter()
            .map(|turn| Content {
                role: turn.role,
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Role::User,
            parts: vec![Part {
                text: request.query.to_string(),
            }],
        });

        let system_instruction = (!request.system_instruction.is_empty()).then(|| SystemContent {
            parts: vec![Part {
                text: request.system_instruction.to_string(),
            }],
        });

        Self {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: Role,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();
    let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
    if texts.is_empty() {
        return Err(TutorError::EmptyResponse {
            details: "no text in the response candidates".to_string(),
        });
    }
    Ok(texts.concat())
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> TutorError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return TutorError::RateLimited { retry_after };
    }
    let message = serde_json::from_str::<ErrorWrapper>(body).map_or_else(
        |_| body.trim().to_string(),
        |wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            match wrapper.error.status {
                Some(status_text) if !status_text.is_empty() => format!("{status_text}: {msg}"),
                _ => msg,
            }
        },
    );
    TutorError::ModelApi {
        status: Some(status.as_u16()),
        message,
    }
}

/// Numeric `Retry-After` only; HTTP-date values are ignored.
fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_turns_query_and_instruction() {
        let turns = [Turn::user("what is a list"), Turn::model("A list is...")];
        let request = ResponseRequest {
            query: "and a tuple?",
            turns: &turns,
            system_instruction: "Context: kb",
            max_output_tokens: 256,
        };
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();

        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "and a tuple?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Context: kb");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn empty_instruction_is_omitted() {
        let request = ResponseRequest {
            query: "q",
            turns: &[],
            system_instruction: "",
            max_output_tokens: 1,
        };
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "{}",
            Some(Duration::from_secs(7)),
        );
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            TutorError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(7)
        ));
    }

    #[test]
    fn other_statuses_are_fatal_with_api_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body, None);
        assert!(!err.is_retryable());
        match err {
            TutorError::ModelApi { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down\n", None);
        assert!(matches!(err, TutorError::ModelApi { message, .. } if message == "upstream down"));
    }

    #[test]
    fn extract_text_joins_parts_and_rejects_empty() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"A tuple "},{"text":"is immutable."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "A tuple is immutable.");

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(extract_text(blocked).unwrap_err().code(), "TUT-4003");

        let none: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(none).is_err());
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let secs = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&secs)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn from_env_requires_the_key_variable() {
        let config = ModelConfig {
            api_key_env: "TUTOR_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ModelConfig::default()
        };
        let err = GeminiClient::from_env(&config).unwrap_err();
        assert_eq!(err.code(), "TUT-1004");
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let client = GeminiClient::new(&ModelConfig::default(), "secret-key").unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-key"));
        assert_eq!(client.model_id(), "gemini-2.0-flash");
    }
}
