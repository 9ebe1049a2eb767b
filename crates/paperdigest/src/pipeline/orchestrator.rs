use super::events::{NoopHandler, PipelineEvent, PipelineEventHandler};
use super::feedback::Feedback;
use super::{ExhaustionReason, PipelineConfig, REQUIRED_PARAGRAPHS, SummaryOutcome};
use crate::agents::condense::condense;
use crate::agents::generator::generate;
use crate::agents::glossary;
use crate::agents::verifier::{verify_readability, verify_reflection};
use crate::api::{ChatModel, ModelCaller, RetryNotice, generate_span_id, generate_trace_id};
use crate::error::{DigestError, Result};
use crate::text::{CharRatioEstimator, Chunk, TokenCounter, chunk};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{Instrument, debug, info_span, warn};

/// Turns a paper into a verified four-paragraph lay summary.
///
/// One pipeline can summarize many documents; each call to
/// [`summarize_and_verify`](Self::summarize_and_verify) is independent.
/// Configuration is fixed at construction.
///
/// ```ignore
/// let pipeline = SummaryPipeline::new(&client, PipelineConfig::default())?
///     .with_event_handler(&LoggingHandler);
/// match pipeline.summarize_and_verify(&paper).await? {
///     SummaryOutcome::Accepted { summary, .. } => println!("{summary}"),
///     SummaryOutcome::Exhausted { .. } => println!("{SENTINEL}"),
/// }
/// ```
pub struct SummaryPipeline<'a> {
    model: &'a dyn ChatModel,
    config: PipelineConfig,
    counter: Box<dyn TokenCounter>,
    handler: &'a dyn PipelineEventHandler,
}

impl<'a> SummaryPipeline<'a> {
    /// Validate `config` and build a pipeline over `model`.
    ///
    /// Token counts use a [`CharRatioEstimator`] for the generation model;
    /// replace it with [`with_token_counter`](Self::with_token_counter).
    pub fn new(model: &'a dyn ChatModel, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let counter = CharRatioEstimator::for_model(&config.generation.model)?;
        Ok(Self {
            model,
            config,
            counter: Box::new(counter),
            handler: &NoopHandler,
        })
    }

    pub fn with_event_handler(mut self, handler: &'a dyn PipelineEventHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_token_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = Box::new(counter);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Summarize `document` and verify the result.
    ///
    /// Returns [`SummaryOutcome::Exhausted`] when every attempt is rejected.
    /// Errors are reserved for empty input, configuration problems, and
    /// transient failures the retry policy gave up on.
    pub async fn summarize_and_verify(&self, document: &str) -> Result<SummaryOutcome> {
        let progress = AtomicU32::new(0);
        self.run(document, &progress).await
    }

    /// Like [`summarize_and_verify`](Self::summarize_and_verify), but gives up
    /// after `deadline` with [`ExhaustionReason::DeadlineElapsed`]. In-flight
    /// model calls are dropped.
    pub async fn summarize_with_deadline(
        &self,
        document: &str,
        deadline: Duration,
    ) -> Result<SummaryOutcome> {
        let progress = AtomicU32::new(0);
        match tokio::time::timeout(deadline, self.run(document, &progress)).await {
            Ok(result) => result,
            Err(_) => {
                let attempts = progress.load(Ordering::SeqCst);
                let reason = ExhaustionReason::DeadlineElapsed;
                self.handler
                    .on_event(&PipelineEvent::Exhausted { attempts, reason });
                Ok(SummaryOutcome::Exhausted { attempts, reason })
            }
        }
    }

    /// Define the key technical term in `snippet` for a lay reader.
    pub async fn define_unclear_terms(&self, snippet: &str) -> Result<String> {
        let observer = self.retry_observer();
        let caller = ModelCaller::new(self.model, &self.config.retry).with_observer(&observer);
        let definition =
            glossary::define_unclear_terms(&caller, &self.config.generation, snippet).await;
        self.handler.on_event(&PipelineEvent::RunFinished {
            usage: &caller.usage(),
        });
        definition
    }

    fn retry_observer(&self) -> impl Fn(&RetryNotice<'_>) + Send + Sync + '_ {
        move |notice: &RetryNotice<'_>| {
            self.handler.on_event(&PipelineEvent::CallRetrying {
                label: notice.label,
                retry: notice.retry,
                delay: notice.delay,
                error: notice.error,
            })
        }
    }

    async fn run(&self, document: &str, progress: &AtomicU32) -> Result<SummaryOutcome> {
        if document.trim().is_empty() {
            return Err(DigestError::InvalidInput("document is empty".into()));
        }
        let trace_id = generate_trace_id();
        let observer = self.retry_observer();
        let caller = ModelCaller::new(self.model, &self.config.retry).with_observer(&observer);

        let result = self
            .attempt_loop(&caller, document, &trace_id, progress)
            .instrument(info_span!("summarize", trace_id = %trace_id))
            .await;

        self.handler.on_event(&PipelineEvent::RunFinished {
            usage: &caller.usage(),
        });
        result
    }

    async fn attempt_loop(
        &self,
        caller: &ModelCaller<'_>,
        document: &str,
        trace_id: &str,
        progress: &AtomicU32,
    ) -> Result<SummaryOutcome> {
        let working = self.working_text(caller, document, trace_id).await?;
        let max_attempts = self.config.max_attempts;
        let mut feedback: Option<Feedback> = None;

        for attempt in 1..=max_attempts {
            progress.store(attempt, Ordering::SeqCst);
            let span_id = generate_span_id(trace_id, attempt);
            self.handler.on_event(&PipelineEvent::AttemptStarted {
                attempt,
                max_attempts,
                with_feedback: feedback.is_some(),
            });

            let summary = generate(caller, &self.config.generation, &working, feedback.as_ref())
                .instrument(info_span!("generate", span_id = %span_id))
                .await?;

            // Reflection always sees the original document, never the
            // condensed working text.
            let (reflection, readability) = tokio::join!(
                verify_reflection(caller, &self.config.verification, document, summary.as_str()),
                verify_readability(caller, &self.config.verification, summary.as_str()),
            );
            let (reflection, readability) = (reflection?, readability?);
            self.handler.on_event(&PipelineEvent::VerifiersFinished {
                attempt,
                reflection: &reflection,
                readability: &readability,
            });

            if reflection.is_approved() && readability.is_approved() {
                let found = summary.paragraph_count();
                if found == REQUIRED_PARAGRAPHS {
                    self.handler.on_event(&PipelineEvent::Accepted {
                        attempts: attempt,
                        summary: &summary,
                    });
                    return Ok(SummaryOutcome::Accepted {
                        summary,
                        attempts: attempt,
                    });
                }
                self.handler.on_event(&PipelineEvent::StructuralViolation {
                    attempt,
                    expected: REQUIRED_PARAGRAPHS,
                    found,
                });
                feedback = Some(Feedback::structural(found));
            } else {
                feedback = Some(Feedback::from_verdicts(&reflection, &readability));
            }
            debug!("[{span_id}] attempt rejected, carrying feedback forward");
        }

        let reason = ExhaustionReason::AttemptsExhausted;
        self.handler.on_event(&PipelineEvent::Exhausted {
            attempts: max_attempts,
            reason,
        });
        Ok(SummaryOutcome::Exhausted {
            attempts: max_attempts,
            reason,
        })
    }

    /// The text the generator works from: the document itself when it fits
    /// the budget, otherwise its condensation.
    async fn working_text<'d>(
        &self,
        caller: &ModelCaller<'_>,
        document: &'d str,
        trace_id: &str,
    ) -> Result<Cow<'d, str>> {
        let budget = self.config.token_budget;
        let mut tokens = self.counter.count_tokens(document)?;
        self.handler.on_event(&PipelineEvent::DocumentMeasured {
            trace_id,
            tokens,
            token_budget: budget,
            condense: tokens > budget,
        });

        let mut working = Cow::Borrowed(document);
        let mut pass = 0;
        while tokens > budget && pass < self.config.max_condense_passes {
            pass += 1;
            let chunks = chunk(&working, self.config.chunk_token_budget, self.counter.as_ref())?;
            let total = chunks.len();
            self.handler
                .on_event(&PipelineEvent::CondenseStarted { pass, chunks: total });

            let on_chunk = |c: &Chunk, _: &str| {
                self.handler.on_event(&PipelineEvent::ChunkSummarized {
                    pass,
                    index: c.index,
                    total,
                    tokens: c.tokens,
                })
            };
            let condensed = condense(
                caller,
                &self.config.generation,
                &chunks,
                self.config.map_concurrency,
                &on_chunk,
            )
            .await?;

            tokens = self.counter.count_tokens(&condensed)?;
            self.handler
                .on_event(&PipelineEvent::CondenseFinished { pass, tokens });
            working = Cow::Owned(condensed);
        }

        if tokens > budget {
            warn!(
                "Working text is still {tokens} tokens after {pass} condense pass(es) (budget {budget})"
            );
        }
        Ok(working)
    }
}
