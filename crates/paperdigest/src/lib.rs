//! Verified lay summaries of research papers.
//!
//! `paperdigest` turns the full plaintext of a paper into a four-paragraph
//! summary that a reader with only a casual interest in the topic can follow.
//! The core abstraction is the [`SummaryPipeline`](pipeline::SummaryPipeline):
//! a closed loop that generates a candidate summary, checks it against the
//! original paper and for readability, and regenerates with the verifiers'
//! feedback until both approve or the attempt budget runs out.
//!
//! Papers too long for a single generation call are first condensed with a
//! map-reduce pass: the text is split into paragraph-aligned chunks, each
//! chunk is summarized independently, and the chunk summaries are synthesized
//! into one narrative. Verification always runs against the original text,
//! never against the condensed one.
//!
//! # Getting started
//!
//! ```ignore
//! use paperdigest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DigestError> {
//!     let api_key = std::env::var("OPENROUTER_KEY")
//!         .map_err(|_| DigestError::Configuration("OPENROUTER_KEY not set".into()))?;
//!     let client = OpenRouterClient::new(api_key)?;
//!     let config = PipelineConfig::default().with_max_attempts(3);
//!
//!     let paper = std::fs::read_to_string("paper.txt").unwrap_or_default();
//!     let outcome = SummaryPipeline::new(&client, config)?
//!         .with_event_handler(&LoggingHandler)
//!         .summarize_and_verify(&paper)
//!         .await?;
//!
//!     println!("{}", outcome.text_or_sentinel());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Run the loop:** [`SummaryPipeline`](pipeline::SummaryPipeline) and
//!   [`PipelineConfig`](pipeline::PipelineConfig).
//! - **Observe it:** implement [`PipelineEventHandler`](pipeline::events::PipelineEventHandler)
//!   or use [`LoggingHandler`](pipeline::events::LoggingHandler).
//! - **Swap the model:** implement [`ChatModel`](api::model::ChatModel). The
//!   bundled implementation is [`OpenRouterClient`].
//! - **Tune retries:** [`RetryPolicy`](api::retry::RetryPolicy).
//! - **Chunk text yourself:** [`text::chunker`] and [`text::tokens`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Model seam, retry policy, trace IDs |
//! | [`text`] | Token estimation, paragraph splitting, chunking |
//! | [`agents`] | Condenser, generator, verifiers, jargon definer, prompts |
//! | [`pipeline`] | Orchestrator, configuration, feedback, events |
//! | [`error`] | [`DigestError`](error::DigestError) taxonomy |

pub mod agents;
pub mod api;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod text;

use error::{DigestError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for generation and verification calls.
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    // Zero is meaningful (deterministic verification), so only `None` is
    // omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat()`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
///
/// Implements [`ChatModel`](api::model::ChatModel), so it can be handed
/// straight to a [`SummaryPipeline`](pipeline::SummaryPipeline).
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) endpoint: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_headers(api_key, "https://github.com/paperdigest", "paperdigest")
    }

    /// Create a new client with custom Referer and X-Title headers.
    ///
    /// Returns [`DigestError::Configuration`] for an empty API key.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DigestError::Configuration("API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .user_agent("paperdigest/0.1")
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| DigestError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            endpoint: OPENROUTER_URL.to_string(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={:?}, temp={:?}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(DigestError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_chat_response(&text)
    }
}

/// Turn a successful response body into a [`ChatCompletion`].
fn parse_chat_response(text: &str) -> Result<ChatCompletion> {
    let parsed: RawChatResponse = serde_json::from_str(text)?;

    if let Some(err) = parsed.error {
        return Err(DigestError::Api(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let choice = parsed.choices.and_then(|c| c.into_iter().next());
    Ok(match choice {
        Some(c) => ChatCompletion {
            content: c.message.content,
            usage: parsed.usage,
            finish_reason: c.finish_reason,
        },
        None => ChatCompletion {
            content: None,
            usage: parsed.usage,
            finish_reason: None,
        },
    })
}
