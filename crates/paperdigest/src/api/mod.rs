//! API interaction layer: the model seam, retries, and run accounting.
//!
//! These modules sit between the agents and whatever answers their prompts:
//!
//! - [`model`]: [`ChatModel`] trait, [`ModelConfig`], [`CompletionRequest`],
//!   and [`ModelCaller`], which every agent call goes through.
//! - [`retry`]: transient error handling (429, 5xx, network timeouts, empty
//!   or malformed output) under a configurable [`RetryPolicy`]. Never retries
//!   400/401 errors.
//! - [`tracing`]: correlation IDs (`trace_id` / `span_id`) and per-call-kind
//!   [`UsageTracker`].

pub mod model;
pub mod retry;
pub mod tracing;

pub use model::{
    CallKind, ChatModel, CompletionRequest, ModelCaller, ModelConfig, ModelFuture, ModelReply,
};
pub use retry::{Backoff, RetryNotice, RetryPolicy, call_with_retry};
pub use tracing::{UsageTracker, generate_span_id, generate_trace_id};
