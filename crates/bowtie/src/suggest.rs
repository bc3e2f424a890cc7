//! Blocking chat-completion client for the suggestion side channel.
//!
//! Requests follow the OpenAI-compatible `chat/completions` shape. The answer is returned verbatim;
//! nothing in it feeds back into the diagram.

use crate::SuggestionPrompt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("completion service rejected the API key ({status}): {body}")]
    Authentication { status: u16, body: String },
    #[error("completion service rate limit exceeded: {body}")]
    RateLimited { body: String },
    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, SuggestError>;

#[derive(Debug, Clone)]
pub struct SuggestConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

impl SuggestConfig {
    /// Defaults with the API key taken from `OPENAI_API_KEY`, if set and non-blank.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            api_key,
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct SuggestionClient {
    config: SuggestConfig,
    http: reqwest::blocking::Client,
}

impl SuggestionClient {
    pub fn new(config: SuggestConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    /// Sends one request and returns the first choice's content. No retry.
    pub fn suggest(&self, prompt: &SuggestionPrompt) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SuggestError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.config.temperature,
        };

        tracing::info!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting suggestions");
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "completion request rejected");
            return Err(match status.as_u16() {
                401 | 403 => SuggestError::Authentication {
                    status: status.as_u16(),
                    body,
                },
                429 => SuggestError::RateLimited { body },
                code => SuggestError::Status { status: code, body },
            });
        }
        parse_completion(&body)
    }
}

/// Extracts `choices[0].message.content` from a chat-completion response body.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| SuggestError::MalformedResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| SuggestError::MalformedResponse("no choices[0].message.content".to_string()))
}
