//! The verify-and-retry loop and everything it needs.
//!
//! [`SummaryPipeline`] measures a document, condenses it when it is over
//! budget, then runs up to `max_attempts` generate-then-verify cycles. The
//! result is a [`SummaryOutcome`]: a value, not an error, when the attempt
//! budget runs out. Only transport and configuration problems come back as
//! [`DigestError`](crate::error::DigestError).

pub mod config;
pub mod events;
pub mod feedback;
mod orchestrator;

pub use config::PipelineConfig;
pub use events::{
    CompositeEventHandler, FnEventHandler, LoggingHandler, NoopHandler, PipelineEvent,
    PipelineEventHandler,
};
pub use feedback::Feedback;
pub use orchestrator::SummaryPipeline;

use crate::agents::Summary;

/// Text returned in place of a summary when no attempt was accepted.
pub const SENTINEL: &str = "Could not generate a verified summary. Please try again.";

/// Paragraphs an accepted summary must have.
pub const REQUIRED_PARAGRAPHS: usize = 4;

/// Why a run ended without an accepted summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionReason {
    /// Every attempt was rejected (by a verifier or the paragraph check).
    AttemptsExhausted,
    /// The caller's deadline elapsed first.
    DeadlineElapsed,
}

impl std::fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustionReason::AttemptsExhausted => write!(f, "attempt budget exhausted"),
            ExhaustionReason::DeadlineElapsed => write!(f, "deadline elapsed"),
        }
    }
}

/// Terminal state of a document run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Accepted { summary: Summary, attempts: u32 },
    Exhausted {
        attempts: u32,
        reason: ExhaustionReason,
    },
}

impl SummaryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SummaryOutcome::Accepted { .. })
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            SummaryOutcome::Accepted { summary, .. } => Some(summary),
            SummaryOutcome::Exhausted { .. } => None,
        }
    }

    /// Attempts started before the run ended.
    pub fn attempts(&self) -> u32 {
        match self {
            SummaryOutcome::Accepted { attempts, .. } | SummaryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The accepted summary text, or [`SENTINEL`].
    pub fn text_or_sentinel(&self) -> &str {
        self.summary().map_or(SENTINEL, Summary::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_outcome_exposes_text() {
        let outcome = SummaryOutcome::Accepted {
            summary: Summary::new("a\n\nb\n\nc\n\nd"),
            attempts: 2,
        };
        assert!(outcome.is_accepted());
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.text_or_sentinel(), "a\n\nb\n\nc\n\nd");
    }

    #[test]
    fn exhausted_outcome_yields_sentinel() {
        let outcome = SummaryOutcome::Exhausted {
            attempts: 3,
            reason: ExhaustionReason::AttemptsExhausted,
        };
        assert!(!outcome.is_accepted());
        assert!(outcome.summary().is_none());
        assert_eq!(
            outcome.text_or_sentinel(),
            "Could not generate a verified summary. Please try again."
        );
    }

    #[test]
    fn reason_display() {
        assert_eq!(ExhaustionReason::DeadlineElapsed.to_string(), "deadline elapsed");
    }
}
