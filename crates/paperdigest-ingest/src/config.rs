//! Ingest job settings with the defaults the daily job runs with.

use crate::error::{IngestError, Result};
use crate::scholar::SEMANTIC_SCHOLAR_URL;
use std::time::Duration;

/// Weights of the author prestige score
/// `alpha * h_index + beta * ln(citations + 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrestigeWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for PrestigeWeights {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 2.0,
        }
    }
}

/// Configuration for a [`DigestJob`](crate::job::DigestJob).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How far back the source looks for new papers. Default: `3` days.
    pub recent_days: u32,
    /// Papers requested from the source per category. Default: `15`.
    pub max_results: usize,
    /// Rank of the selection cutoff. Default: `50`.
    pub top_n: usize,
    /// Pause between author lookups. Default: 1 s.
    pub lookup_delay: Duration,
    /// Weight of the existing user embedding when blending. Default: `0.8`.
    pub user_decay: f32,
    pub weights: PrestigeWeights,
    /// Author search endpoint. Default: [`SEMANTIC_SCHOLAR_URL`].
    pub scholar_endpoint: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recent_days: 3,
            max_results: 15,
            top_n: 50,
            lookup_delay: Duration::from_secs(1),
            user_decay: 0.8,
            weights: PrestigeWeights::default(),
            scholar_endpoint: SEMANTIC_SCHOLAR_URL.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn with_recent_days(mut self, days: u32) -> Self {
        self.recent_days = days;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn with_user_decay(mut self, decay: f32) -> Self {
        self.user_decay = decay;
        self
    }

    pub fn with_weights(mut self, weights: PrestigeWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_scholar_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.scholar_endpoint = endpoint.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.recent_days == 0 {
            return Err(IngestError::Configuration("recent_days must be at least 1".into()));
        }
        if self.max_results == 0 {
            return Err(IngestError::Configuration("max_results must be at least 1".into()));
        }
        if self.top_n == 0 {
            return Err(IngestError::Configuration("top_n must be at least 1".into()));
        }
        if !self.user_decay.is_finite() || self.user_decay < 0.0 {
            return Err(IngestError::Configuration(format!(
                "user_decay {} must be a non-negative number",
                self.user_decay
            )));
        }
        let PrestigeWeights { alpha, beta } = self.weights;
        if !alpha.is_finite() || !beta.is_finite() {
            return Err(IngestError::Configuration("prestige weights must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_daily_job() {
        let config = IngestConfig::default();
        assert_eq!(config.recent_days, 3);
        assert_eq!(config.max_results, 15);
        assert_eq!(config.top_n, 50);
        assert_eq!(config.lookup_delay, Duration::from_secs(1));
        assert!((config.user_decay - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.weights, PrestigeWeights { alpha: 1.0, beta: 2.0 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_override_defaults() {
        let config = IngestConfig::default()
            .with_recent_days(7)
            .with_max_results(100)
            .with_top_n(10)
            .with_lookup_delay(Duration::ZERO)
            .with_scholar_endpoint("http://localhost:9/search");
        assert_eq!(config.recent_days, 7);
        assert_eq!(config.max_results, 100);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.lookup_delay, Duration::ZERO);
        assert_eq!(config.scholar_endpoint, "http://localhost:9/search");
    }

    #[test]
    fn rejects_zero_limits() {
        for config in [
            IngestConfig::default().with_recent_days(0),
            IngestConfig::default().with_max_results(0),
            IngestConfig::default().with_top_n(0),
            IngestConfig::default().with_user_decay(-0.5),
            IngestConfig::default().with_weights(PrestigeWeights {
                alpha: f64::NAN,
                beta: 2.0,
            }),
        ] {
            assert!(matches!(
                config.validate(),
                Err(IngestError::Configuration(_))
            ));
        }
    }
}
