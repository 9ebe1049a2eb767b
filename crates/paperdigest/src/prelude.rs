//! Convenience re-exports for common `paperdigest` types.
//!
//! ```ignore
//! use paperdigest::prelude::*;
//! ```
//!
//! Pulls in the client, the pipeline and its configuration, the outcome
//! types, and the event handlers. Prompt builders and the individual agent
//! functions stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::error::{DigestError, Result};
pub use crate::{DEFAULT_MODEL, OpenRouterClient};

// ── Model seam ──────────────────────────────────────────────────────
pub use crate::api::{
    Backoff, CallKind, ChatModel, CompletionRequest, ModelConfig, ModelFuture, ModelReply,
    RetryPolicy, UsageTracker,
};

// ── Pipeline ────────────────────────────────────────────────────────
pub use crate::agents::{Summary, Verdict};
pub use crate::pipeline::{
    CompositeEventHandler, ExhaustionReason, Feedback, FnEventHandler, LoggingHandler,
    NoopHandler, PipelineConfig, PipelineEvent, PipelineEventHandler, SENTINEL, SummaryOutcome,
    SummaryPipeline,
};

// ── Text ────────────────────────────────────────────────────────────
pub use crate::text::{CharRatioEstimator, Chunk, TokenCounter};
