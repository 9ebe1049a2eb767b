//! Error taxonomy for the summarization core.
//!
//! Errors fall into two families. *Transient* errors (rate limits, 5xx
//! responses, network timeouts, empty or unparseable model output) are
//! absorbed by the [`RetryPolicy`](crate::api::retry::RetryPolicy) wrapped
//! around every model call. *Permanent* errors (bad credentials, unknown
//! model, invalid input) propagate to the caller immediately.
//!
//! Verifier rejections and exhausted attempt budgets are not errors at all:
//! they are carried as [`Verdict`](crate::agents::verifier::Verdict) and
//! [`SummaryOutcome`](crate::pipeline::SummaryOutcome) values.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    /// Invalid model handle, missing credentials, or other setup problem.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-success HTTP status from the chat completions endpoint.
    #[error("chat API HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Error object in an otherwise successful response body.
    #[error("chat API error: {0}")]
    Api(String),

    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The model returned no text content.
    #[error("empty response from model {model}")]
    EmptyResponse { model: String },

    /// A verifier response did not follow the verdict contract.
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The retry policy gave up on a transient error.
    #[error("giving up after {attempts} attempt(s) over {elapsed:?}: {last}")]
    RetriesExhausted {
        attempts: u32,
        elapsed: Duration,
        last: Box<DigestError>,
    },
}

impl DigestError {
    /// Whether retrying the same request may succeed.
    ///
    /// 429 and 5xx statuses, transport failures, empty responses, and
    /// malformed verdicts are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            DigestError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            DigestError::Request(e) => !e.is_builder(),
            DigestError::EmptyResponse { .. } | DigestError::MalformedVerdict(_) => true,
            DigestError::Api(message) => {
                let lower = message.to_lowercase();
                ["rate limit", "overloaded", "timeout", "temporarily"]
                    .iter()
                    .any(|p| lower.contains(p))
            }
            _ => false,
        }
    }

    /// Whether the error indicates a setup problem that retrying cannot fix.
    pub fn is_configuration(&self) -> bool {
        match self {
            DigestError::Configuration(_) => true,
            DigestError::Http { status, .. } => matches!(status, 400 | 401 | 403 | 404 | 422),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        for status in [429, 500, 502, 503, 504] {
            let err = DigestError::Http {
                status,
                body: String::new(),
            };
            assert!(err.is_transient(), "HTTP {status} should be transient");
            assert!(!err.is_configuration());
        }
    }

    #[test]
    fn auth_and_bad_request_are_configuration() {
        for status in [400, 401, 403, 404, 422] {
            let err = DigestError::Http {
                status,
                body: String::new(),
            };
            assert!(!err.is_transient(), "HTTP {status} should not be retried");
            assert!(err.is_configuration());
        }
        assert!(DigestError::Configuration("no key".into()).is_configuration());
    }

    #[test]
    fn malformed_output_is_retryable() {
        assert!(DigestError::MalformedVerdict("garbage".into()).is_transient());
        assert!(
            DigestError::EmptyResponse {
                model: "m".into()
            }
            .is_transient()
        );
        assert!(!DigestError::InvalidInput("empty".into()).is_transient());
    }

    #[test]
    fn api_error_messages_classified() {
        assert!(DigestError::Api("Rate limit exceeded".into()).is_transient());
        assert!(!DigestError::Api("model not found".into()).is_transient());
    }

    #[test]
    fn display_formats() {
        let err = DigestError::Http {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "chat API HTTP 503: overloaded");

        let wrapped = DigestError::RetriesExhausted {
            attempts: 3,
            elapsed: Duration::from_secs(2),
            last: Box::new(err),
        };
        assert!(wrapped.to_string().contains("3 attempt(s)"));
        assert!(wrapped.to_string().contains("HTTP 503"));
    }
}
