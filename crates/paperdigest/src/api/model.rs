//! The seam between agents and a chat model.
//!
//! Agents never talk to HTTP directly. They build a [`CompletionRequest`] and
//! hand it to a [`ModelCaller`], which sends it through a [`ChatModel`] under
//! the configured [`RetryPolicy`] and records usage. [`OpenRouterClient`] is
//! the bundled [`ChatModel`]; tests substitute scripted ones.

use super::retry::{RetryNotice, RetryPolicy, call_with_retry};
use super::tracing::UsageTracker;
use crate::error::{DigestError, Result};
use crate::{
    ChatRequest, DEFAULT_MODEL, Message, OpenRouterClient, ResponseFormat, ResponseFormatType,
    UsageInfo,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Model handle and sampling settings for one family of calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: None,
        }
    }

    /// Default generation settings: [`DEFAULT_MODEL`] at temperature 0.7.
    pub fn generation() -> Self {
        Self::new(DEFAULT_MODEL, 0.7)
    }

    /// Default verification settings: [`DEFAULT_MODEL`] at temperature 0.
    pub fn verification() -> Self {
        Self::new(DEFAULT_MODEL, 0.0)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Reject an empty model id or a temperature outside `[0, 2]`.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DigestError::Configuration("model id is empty".into()));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(DigestError::Configuration(format!(
                "temperature {} for model {} is outside [0, 2]",
                self.temperature, self.model
            )));
        }
        Ok(())
    }
}

/// What a model call is for. Used for logging, usage accounting, and by test
/// doubles to script responses per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    MapChunk,
    Reduce,
    Generate,
    Reflect,
    Readability,
    Define,
}

impl CallKind {
    pub fn label(self) -> &'static str {
        match self {
            CallKind::MapChunk => "map",
            CallKind::Reduce => "reduce",
            CallKind::Generate => "generate",
            CallKind::Reflect => "reflect",
            CallKind::Readability => "readability",
            CallKind::Define => "define",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single system + user prompt pair sent to a model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub kind: CallKind,
    pub model: ModelConfig,
    pub system: String,
    pub user: String,
    /// Ask the model for a JSON object response.
    pub json: bool,
}

impl CompletionRequest {
    pub fn new(
        kind: CallKind,
        model: &ModelConfig,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            model: model.clone(),
            system: system.into(),
            user: user.into(),
            json: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Text returned by a model, with token usage when the backend reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub usage: Option<UsageInfo>,
}

impl ModelReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageInfo) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Boxed future returned by [`ChatModel::complete`].
pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelReply>> + Send + 'a>>;

/// Anything that can answer a [`CompletionRequest`].
///
/// Implementations return transient failures as errors for which
/// [`DigestError::is_transient`] is true; the caller decides whether to retry.
pub trait ChatModel: Send + Sync {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a>;
}

impl<T: ChatModel + ?Sized> ChatModel for &T {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a> {
        (**self).complete(request)
    }
}

impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a> {
        (**self).complete(request)
    }
}

impl<T: ChatModel + ?Sized> ChatModel for Box<T> {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a> {
        (**self).complete(request)
    }
}

impl ChatModel for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: request.model.model.clone(),
                messages: vec![
                    Message::system(request.system.as_str()),
                    Message::user(request.user.as_str()),
                ],
                max_tokens: request.model.max_tokens,
                temperature: Some(request.model.temperature),
                response_format: request.json.then_some(ResponseFormat {
                    fmt_type: ResponseFormatType::JsonObject,
                }),
                ..Default::default()
            };
            let completion = self.chat(&body).await?;
            match completion.content {
                Some(text) if !text.trim().is_empty() => Ok(ModelReply {
                    text,
                    usage: completion.usage,
                }),
                _ => Err(DigestError::EmptyResponse {
                    model: request.model.model.clone(),
                }),
            }
        })
    }
}

/// Sends requests through a [`ChatModel`] under a [`RetryPolicy`].
///
/// Every successful call is recorded in a [`UsageTracker`]; each retry is
/// reported to the observer before the backoff delay.
pub struct ModelCaller<'a> {
    model: &'a dyn ChatModel,
    retry: &'a RetryPolicy,
    observer: &'a (dyn Fn(&RetryNotice<'_>) + Send + Sync),
    usage: Mutex<UsageTracker>,
}

impl<'a> ModelCaller<'a> {
    pub fn new(model: &'a dyn ChatModel, retry: &'a RetryPolicy) -> Self {
        Self {
            model,
            retry,
            observer: &super::retry::ignore_retries,
            usage: Mutex::new(UsageTracker::new()),
        }
    }

    pub fn with_observer(mut self, observer: &'a (dyn Fn(&RetryNotice<'_>) + Send + Sync)) -> Self {
        self.observer = observer;
        self
    }

    /// Send `request`, retrying transient failures. Returns the reply text.
    pub async fn call(&self, request: &CompletionRequest) -> Result<String> {
        self.call_parsed(request, |text| Ok(text.to_string())).await
    }

    /// Send `request` and run `parse` on the reply inside the retry loop, so
    /// a transient parse failure (e.g. a malformed verdict) re-sends the
    /// same request.
    pub async fn call_parsed<T, F>(&self, request: &CompletionRequest, parse: F) -> Result<T>
    where
        F: Fn(&str) -> Result<T> + Sync,
    {
        debug!(
            "{} call: model={}, temp={}, prompt={} chars",
            request.kind,
            request.model.model,
            request.model.temperature,
            request.system.len() + request.user.len()
        );
        let parse = &parse;
        let (value, usage) =
            call_with_retry(self.retry, request.kind.label(), self.observer, move || async move {
                let reply = self.model.complete(request).await?;
                let value = parse(&reply.text)?;
                Ok((value, reply.usage))
            })
            .await?;
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(request.kind, usage.as_ref());
        Ok(value)
    }

    /// Snapshot of usage recorded so far.
    pub fn usage(&self) -> UsageTracker {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::retry::Backoff;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails with a 503 `failures` times, then echoes the user prompt.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl ChatModel for Flaky {
        fn complete<'a>(&'a self, request: &'a CompletionRequest) -> ModelFuture<'a> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n < self.failures {
                    Err(DigestError::Http {
                        status: 503,
                        body: "busy".into(),
                    })
                } else {
                    Ok(ModelReply::new(request.user.clone()).with_usage(UsageInfo {
                        prompt_tokens: Some(7),
                        completion_tokens: Some(3),
                        total_tokens: Some(10),
                    }))
                }
            })
        }
    }

    fn instant() -> RetryPolicy {
        RetryPolicy::default()
            .with_backoff(Backoff::Fixed(Duration::ZERO))
            .with_max_elapsed(None)
    }

    #[test]
    fn replies_compare_by_text_and_usage() {
        let usage = UsageInfo {
            prompt_tokens: Some(1),
            ..Default::default()
        };
        let reply = ModelReply::new("a").with_usage(usage.clone());
        assert_eq!(reply, ModelReply::new("a").with_usage(usage));
        assert_ne!(reply, ModelReply::new("a"));
        assert_ne!(ModelReply::new("a"), ModelReply::new("b"));
    }

    #[test]
    fn default_configs() {
        let generation = ModelConfig::generation();
        assert_eq!(generation.model, DEFAULT_MODEL);
        assert!((generation.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(ModelConfig::verification().temperature, 0.0);
    }

    #[test]
    fn validate_rejects_bad_handles() {
        assert!(ModelConfig::new("", 0.0).validate().unwrap_err().is_configuration());
        assert!(ModelConfig::new("m", f32::NAN).validate().is_err());
        assert!(ModelConfig::new("m", 3.0).validate().is_err());
        assert!(ModelConfig::new("m", 0.0).validate().is_ok());
    }

    #[test]
    fn call_kind_labels() {
        assert_eq!(CallKind::MapChunk.to_string(), "map");
        assert_eq!(CallKind::Readability.label(), "readability");
    }

    #[test]
    fn json_builder_sets_flag() {
        let req = CompletionRequest::new(CallKind::Reflect, &ModelConfig::verification(), "s", "u");
        assert!(!req.json);
        assert!(req.json().json);
    }

    #[tokio::test]
    async fn caller_retries_and_records_usage() {
        let model = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let policy = instant();
        let retries = AtomicU32::new(0);
        let observer = |_: &RetryNotice<'_>| {
            retries.fetch_add(1, Ordering::SeqCst);
        };
        let caller = ModelCaller::new(&model, &policy).with_observer(&observer);
        let req = CompletionRequest::new(CallKind::Generate, &ModelConfig::generation(), "sys", "hello");

        let text = caller.call(&req).await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
        let usage = caller.usage();
        assert_eq!(usage.calls(CallKind::Generate), 1);
        assert_eq!(usage.total_tokens(), 10);
    }

    #[tokio::test]
    async fn parse_failures_resend_request() {
        let model = Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
        };
        let policy = instant();
        let caller = ModelCaller::new(&model, &policy);
        let req = CompletionRequest::new(CallKind::Reflect, &ModelConfig::verification(), "s", "u");
        let attempts = AtomicU32::new(0);

        let value = caller
            .call_parsed(&req, |text| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DigestError::MalformedVerdict(text.to_string()))
                } else {
                    Ok(text.len())
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }
}
