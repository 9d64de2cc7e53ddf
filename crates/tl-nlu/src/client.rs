//! Claude API client and response parsing.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tl_core::ExtractedFields;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const EXTRACTION_MAX_TOKENS: u32 = 1000;
const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// The literal reply when the text mentions no events.
const NO_EVENTS_MARKER: &str = "NO EVENTS FOUND";

/// NLU client errors.
#[derive(Debug, Error)]
pub enum NluError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The primary analysis did not finish in time.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
}

/// Claude API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, NluError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(NluError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(NluError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(NluError::ClientBuild)?;

        Ok(Self { http, api_key })
    }

    /// Extract candidate event fields from free text using the Claude API.
    pub async fn extract_fields(
        &self,
        model: &str,
        text: &str,
    ) -> Result<Vec<ExtractedFields>, NluError> {
        let request = MessageRequest {
            model: model.to_string(),
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: EXTRACTION_TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: build_extraction_prompt(text),
            }],
        };

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| NluError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: MessageResponse = serde_json::from_str(&body)
            .map_err(|err| NluError::InvalidResponse(err.to_string()))?;
        let analysis = extract_text(payload.content)?;
        Ok(parse_analysis(&analysis))
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

fn extract_text(blocks: Vec<ContentBlock>) -> Result<String, NluError> {
    let mut pieces = Vec::new();
    for block in blocks {
        let ContentBlock::Text { text } = block;
        pieces.push(text);
    }
    if pieces.is_empty() {
        return Err(NluError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(pieces.join("\n"))
}

fn parse_api_error(body: &str) -> Option<NluError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| NluError::Api {
            message: payload.error.message,
        })
}

fn build_extraction_prompt(text: &str) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You are a calendar assistant. Extract every scheduled event mentioned in the text."
            .to_string(),
    );
    lines.push("For each event, reply with exactly this block format:".to_string());
    lines.push("Title: <short event title>".to_string());
    lines.push("Date: <date as written, or blank>".to_string());
    lines.push("Start Time: <start time as written, or blank>".to_string());
    lines.push("End Time: <end time as written, or blank>".to_string());
    lines.push("Location: <location, or blank>".to_string());
    lines.push("Description: <one-line description, or blank>".to_string());
    lines.push("Participants: <comma-separated names, or blank>".to_string());
    lines.push(String::new());
    lines.push("Separate events with a blank line. Keep date and time text verbatim.".to_string());
    lines.push(format!(
        "If the text mentions no events, reply with exactly: {NO_EVENTS_MARKER}"
    ));
    lines.push(String::new());
    lines.push("Text:".to_string());
    lines.push(text.to_string());
    lines.join("\n")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse the model's block-format reply into candidate fields.
///
/// Tolerant by design: unknown lines are skipped, blocks without a title
/// are dropped, and the no-events marker yields an empty list. This
/// function never errors; a malformed reply just extracts nothing, which
/// the pipeline treats as a fallback trigger.
#[must_use]
pub fn parse_analysis(text: &str) -> Vec<ExtractedFields> {
    if text.contains(NO_EVENTS_MARKER) {
        return Vec::new();
    }

    let mut events = Vec::new();
    let mut current: Option<ExtractedFields> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(title) = line.strip_prefix("Title:") {
            // A new title starts the next block.
            if let Some(fields) = current.take() {
                events.push(fields);
            }
            current = Some(ExtractedFields {
                title: title.trim().to_string(),
                ..ExtractedFields::default()
            });
            continue;
        }
        let Some(fields) = current.as_mut() else {
            continue;
        };
        if let Some(value) = line.strip_prefix("Date:") {
            fields.date = non_empty(value);
        } else if let Some(value) = line.strip_prefix("Start Time:") {
            fields.start_time = non_empty(value);
        } else if let Some(value) = line.strip_prefix("End Time:") {
            fields.end_time = non_empty(value);
        } else if let Some(value) = line.strip_prefix("Location:") {
            fields.location = non_empty(value);
        } else if let Some(value) = line.strip_prefix("Description:") {
            fields.description = non_empty(value);
        } else if let Some(value) = line.strip_prefix("Participants:") {
            fields.participants = value.split(',').filter_map(non_empty).collect();
        }
    }
    if let Some(fields) = current.take() {
        events.push(fields);
    }

    events.retain(|f| !f.title.is_empty());
    events
}
