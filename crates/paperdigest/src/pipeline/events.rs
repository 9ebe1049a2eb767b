//! Events and handlers for the [`SummaryPipeline`](super::SummaryPipeline).
//!
//! The pipeline reports its progress through [`PipelineEvent`] variants,
//! from measuring the document through condensation and every attempt to
//! the final outcome. Callers implement [`PipelineEventHandler`] to observe
//! them for logging, progress display, metrics, or tests.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use super::ExhaustionReason;
use crate::agents::{Summary, Verdict};
use crate::api::UsageTracker;
use crate::error::DigestError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Events emitted by the pipeline during a document run.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    /// The document was measured against the token budget.
    DocumentMeasured {
        trace_id: &'a str,
        tokens: usize,
        token_budget: usize,
        /// Whether the document will be condensed first.
        condense: bool,
    },
    /// A map-reduce pass is starting.
    CondenseStarted { pass: u32, chunks: usize },
    /// One chunk summary arrived (completion order, not source order).
    ChunkSummarized {
        pass: u32,
        index: usize,
        total: usize,
        tokens: usize,
    },
    /// A map-reduce pass finished; `tokens` is the condensed size.
    CondenseFinished { pass: u32, tokens: usize },
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
        /// Whether the generator is working from feedback.
        with_feedback: bool,
    },
    /// Both verifiers answered for this attempt.
    VerifiersFinished {
        attempt: u32,
        reflection: &'a Verdict,
        readability: &'a Verdict,
    },
    /// Both verifiers approved but the paragraph count was wrong.
    StructuralViolation {
        attempt: u32,
        expected: usize,
        found: usize,
    },
    Accepted { attempts: u32, summary: &'a Summary },
    Exhausted {
        attempts: u32,
        reason: ExhaustionReason,
    },
    /// A model call failed transiently and is about to be retried.
    CallRetrying {
        label: &'a str,
        retry: u32,
        delay: Duration,
        error: &'a DigestError,
    },
    /// The run ended with an outcome or an error. Not emitted when a
    /// deadline cancels the run.
    RunFinished { usage: &'a UsageTracker },
}

/// Observer for pipeline events.
///
/// Called synchronously from the pipeline task, possibly from several
/// concurrent map calls; keep handlers cheap.
///
/// # Example
///
/// ```ignore
/// struct Progress;
///
/// impl PipelineEventHandler for Progress {
///     fn on_event(&self, event: &PipelineEvent<'_>) {
///         if let PipelineEvent::AttemptStarted { attempt, max_attempts, .. } = event {
///             eprintln!("attempt {attempt}/{max_attempts}");
///         }
///     }
/// }
/// ```
pub trait PipelineEventHandler: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        let _ = event;
    }
}

/// An event handler that ignores everything.
pub struct NoopHandler;
impl PipelineEventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let PipelineEvent::Accepted { attempts, .. } = event {
///         println!("accepted after {attempts}");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&PipelineEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&PipelineEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PipelineEventHandler for FnEventHandler<F>
where
    F: Fn(&PipelineEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent<'_>) {
        (self.0)(event)
    }
}

/// An event handler that delegates to multiple inner handlers, in
/// registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(my_metrics_handler);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn PipelineEventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl PipelineEventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Add a handler only when `condition` holds.
    pub fn with_if(self, condition: bool, handler: impl PipelineEventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEventHandler for CompositeEventHandler {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl PipelineEventHandler for LoggingHandler {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::DocumentMeasured {
                trace_id,
                tokens,
                token_budget,
                condense,
            } => {
                if *condense {
                    info!(
                        "[{trace_id}] Document is {tokens} tokens (budget {token_budget}); condensing first"
                    );
                } else {
                    info!("[{trace_id}] Document is {tokens} tokens (budget {token_budget})");
                }
            }
            PipelineEvent::CondenseStarted { pass, chunks } => {
                info!("Condense pass {pass}: summarizing {chunks} chunk(s)");
            }
            PipelineEvent::ChunkSummarized {
                index,
                total,
                tokens,
                ..
            } => {
                debug!("Chunk {}/{total} summarized ({tokens} tokens in)", index + 1);
            }
            PipelineEvent::CondenseFinished { pass, tokens } => {
                info!("Condense pass {pass} finished: {tokens} tokens");
            }
            PipelineEvent::AttemptStarted {
                attempt,
                max_attempts,
                with_feedback,
            } => {
                if *with_feedback {
                    info!("[attempt {attempt}/{max_attempts}] Regenerating with feedback");
                } else {
                    info!("[attempt {attempt}/{max_attempts}] Generating first draft");
                }
            }
            PipelineEvent::VerifiersFinished {
                attempt,
                reflection,
                readability,
            } => {
                info!(
                    "[attempt {attempt}] reflection: {}, readability: {}",
                    verdict_label(reflection),
                    verdict_label(readability)
                );
                for (name, verdict) in [("reflection", reflection), ("readability", readability)] {
                    if let Some(feedback) = verdict.feedback() {
                        debug!("{name} feedback: {feedback}");
                    }
                }
            }
            PipelineEvent::StructuralViolation {
                attempt,
                expected,
                found,
            } => {
                warn!(
                    "[attempt {attempt}] Verifiers approved but summary has {found} paragraph(s), expected {expected}"
                );
            }
            PipelineEvent::Accepted { attempts, summary } => {
                info!(
                    "Summary accepted after {attempts} attempt(s) ({} chars)",
                    summary.as_str().len()
                );
            }
            PipelineEvent::Exhausted { attempts, reason } => {
                warn!("No verified summary after {attempts} attempt(s): {reason}");
            }
            PipelineEvent::CallRetrying {
                label,
                retry,
                delay,
                error,
            } => {
                warn!("{label} call failed ({error}); retry {retry} in {delay:?}");
            }
            PipelineEvent::RunFinished { usage } => {
                info!("Run finished: {}", usage.summary());
            }
        }
    }
}

fn verdict_label(verdict: &Verdict) -> &'static str {
    if verdict.is_approved() {
        "approved"
    } else {
        "rejected"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn composite_calls_all_handlers_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let handler = CompositeEventHandler::new()
            .with(FnEventHandler::new(move |_: &PipelineEvent<'_>| a.lock().unwrap().push("a")))
            .with_if(false, NoopHandler)
            .with(FnEventHandler::new(move |_: &PipelineEvent<'_>| b.lock().unwrap().push("b")));

        handler.on_event(&PipelineEvent::CondenseStarted { pass: 1, chunks: 3 });

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn fn_handler_sees_events() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let handler = FnEventHandler::new(move |event: &PipelineEvent<'_>| {
            if matches!(event, PipelineEvent::AttemptStarted { .. }) {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        handler.on_event(&PipelineEvent::AttemptStarted {
            attempt: 1,
            max_attempts: 3,
            with_feedback: false,
        });
        handler.on_event(&PipelineEvent::CondenseFinished { pass: 1, tokens: 10 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn logging_handler_accepts_every_event() {
        let usage = UsageTracker::new();
        let summary = Summary::new("a\n\nb\n\nc\n\nd");
        let rejected = Verdict::Rejected {
            feedback: "too dense".into(),
        };
        let error = DigestError::Http {
            status: 429,
            body: String::new(),
        };
        let events = [
            PipelineEvent::DocumentMeasured {
                trace_id: "pd-1",
                tokens: 10,
                token_budget: 5,
                condense: true,
            },
            PipelineEvent::VerifiersFinished {
                attempt: 1,
                reflection: &Verdict::Approved,
                readability: &rejected,
            },
            PipelineEvent::Accepted {
                attempts: 2,
                summary: &summary,
            },
            PipelineEvent::Exhausted {
                attempts: 3,
                reason: ExhaustionReason::AttemptsExhausted,
            },
            PipelineEvent::CallRetrying {
                label: "generate",
                retry: 1,
                delay: Duration::ZERO,
                error: &error,
            },
            PipelineEvent::RunFinished { usage: &usage },
        ];
        for event in &events {
            LoggingHandler.on_event(event);
        }
    }
}
