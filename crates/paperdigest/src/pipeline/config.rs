//! Configuration for [`SummaryPipeline`](super::SummaryPipeline).

use crate::api::{ModelConfig, RetryPolicy};
use crate::error::{DigestError, Result};

/// Attempt budget, token budgets, model settings, and retry policy for one
/// pipeline.
///
/// Defaults: 3 attempts, 30 000-token document budget, 7 000-token chunks,
/// 4 concurrent map calls, one condense pass, generation at temperature 0.7,
/// verification at temperature 0, and [`RetryPolicy::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Settings for map, reduce, generation, and definition calls.
    pub generation: ModelConfig,
    /// Settings for both verifiers.
    pub verification: ModelConfig,
    /// Maximum generate-then-verify cycles per document.
    pub max_attempts: u32,
    /// Documents above this many tokens are condensed before generation.
    pub token_budget: usize,
    /// Upper bound for each chunk in the map step.
    pub chunk_token_budget: usize,
    /// Maximum map calls in flight at once.
    pub map_concurrency: usize,
    /// How many times to re-condense while the text is still over budget.
    pub max_condense_passes: u32,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation: ModelConfig::generation(),
            verification: ModelConfig::verification(),
            max_attempts: 3,
            token_budget: 30_000,
            chunk_token_budget: 7_000,
            map_concurrency: 4,
            max_condense_passes: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_generation(mut self, generation: ModelConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_verification(mut self, verification: ModelConfig) -> Self {
        self.verification = verification;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_token_budget(mut self, token_budget: usize) -> Self {
        self.token_budget = token_budget;
        self
    }

    pub fn with_chunk_token_budget(mut self, chunk_token_budget: usize) -> Self {
        self.chunk_token_budget = chunk_token_budget;
        self
    }

    pub fn with_map_concurrency(mut self, map_concurrency: usize) -> Self {
        self.map_concurrency = map_concurrency;
        self
    }

    pub fn with_max_condense_passes(mut self, passes: u32) -> Self {
        self.max_condense_passes = passes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check every field. All failures are [`DigestError::Configuration`].
    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        self.verification.validate()?;
        let positive = [
            ("max_attempts", self.max_attempts as usize),
            ("token_budget", self.token_budget),
            ("chunk_token_budget", self.chunk_token_budget),
            ("map_concurrency", self.map_concurrency),
            ("max_condense_passes", self.max_condense_passes as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DigestError::Configuration(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
