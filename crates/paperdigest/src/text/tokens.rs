//! Approximate token counting.
//!
//! The pipeline only needs a count good enough to decide whether a paper fits
//! in one generation call and where to cut chunks, so the bundled estimator
//! is a characters-per-token ratio rather than a real tokenizer. Plug in an
//! exact tokenizer by implementing [`TokenCounter`].

use crate::error::{DigestError, Result};

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Gemini tokenizers run closer to 4 chars per token on English prose.
pub const GEMINI_CHARS_PER_TOKEN: f64 = 4.0;

/// Counts tokens for one model. Deterministic and side-effect free.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// Estimates tokens as `ceil(chars / chars_per_token)`.
///
/// Counts Unicode scalar values, not bytes, so non-ASCII text is not
/// over-counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CharRatioEstimator {
    model: String,
    chars_per_token: f64,
}

impl CharRatioEstimator {
    /// Build an estimator with an explicit ratio.
    ///
    /// An empty model id or a non-positive or non-finite ratio is a
    /// [`DigestError::Configuration`].
    pub fn new(model: impl Into<String>, chars_per_token: f64) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(DigestError::Configuration(
                "token estimator needs a model id".into(),
            ));
        }
        if !chars_per_token.is_finite() || chars_per_token <= 0.0 {
            return Err(DigestError::Configuration(format!(
                "chars_per_token must be positive, got {chars_per_token}"
            )));
        }
        Ok(Self {
            model,
            chars_per_token,
        })
    }

    /// Build an estimator with the ratio for `model`'s family.
    pub fn for_model(model: &str) -> Result<Self> {
        let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();
        let ratio = if name.contains("gemini") {
            GEMINI_CHARS_PER_TOKEN
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self::new(model, ratio)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl TokenCounter for CharRatioEstimator {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let chars = text.chars().count();
        Ok((chars as f64 / self.chars_per_token).ceil() as usize)
    }
}
