//! Reflection and readability verifiers.
//!
//! Both verifiers ask for a JSON verdict and decide approval by parsing it
//! with [`Verdict::parse`]. Free-text heuristics such as "does the reply
//! contain OK" are never used: a rejection whose explanation mentions "OK"
//! is still a rejection.

use super::prompt::{readability_prompt, reflection_prompt};
use crate::api::{CallKind, CompletionRequest, ModelCaller, ModelConfig};
use crate::error::{DigestError, Result};
use serde::Deserialize;

/// Feedback used when a verifier rejects without explaining why.
pub const GENERIC_REJECTION: &str =
    "The verifier rejected the summary without details. Revise it for accuracy and clarity.";

/// Outcome of one verifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected { feedback: String },
}

#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    feedback: Option<String>,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }

    /// Rejection feedback, or `None` when approved.
    pub fn feedback(&self) -> Option<&str> {
        match self {
            Verdict::Approved => None,
            Verdict::Rejected { feedback } => Some(feedback),
        }
    }

    /// Parse a verifier reply.
    ///
    /// Accepts a bare JSON object or one inside a markdown code fence. The
    /// `verdict` field is matched case-insensitively. A rejection with empty
    /// feedback gets [`GENERIC_REJECTION`]. Anything else is
    /// [`DigestError::MalformedVerdict`].
    pub fn parse(raw: &str) -> Result<Verdict> {
        let body = json_body(raw)
            .ok_or_else(|| DigestError::MalformedVerdict(preview(raw)))?;
        let parsed: RawVerdict = serde_json::from_str(body)
            .map_err(|e| DigestError::MalformedVerdict(format!("{e}: {}", preview(raw))))?;

        match parsed.verdict.trim().to_lowercase().as_str() {
            "approved" => Ok(Verdict::Approved),
            "rejected" => {
                let feedback = parsed
                    .feedback
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| GENERIC_REJECTION.to_string());
                Ok(Verdict::Rejected { feedback })
            }
            other => Err(DigestError::MalformedVerdict(format!(
                "unknown verdict {other:?}"
            ))),
        }
    }
}

/// The JSON object inside `raw`: from the first `{` to the last `}`. Covers
/// bare objects, fenced blocks, and stray prose around the object.
fn json_body(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}

fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out: String = trimmed.chars().take(120).collect();
    if trimmed.chars().count() > 120 {
        out.push_str("...");
    }
    out
}

/// Check `summary` against the full, original paper text.
pub async fn verify_reflection(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    original_text: &str,
    summary: &str,
) -> Result<Verdict> {
    let (system, user) = reflection_prompt(original_text, summary);
    let request = CompletionRequest::new(CallKind::Reflect, model, system, user).json();
    caller.call_parsed(&request, Verdict::parse).await
}

/// Check that `summary` reads well for a lay audience.
pub async fn verify_readability(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    summary: &str,
) -> Result<Verdict> {
    let (system, user) = readability_prompt(summary);
    let request = CompletionRequest::new(CallKind::Readability, model, system, user).json();
    caller.call_parsed(&request, Verdict::parse).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        assert_eq!(
            Verdict::parse(r#"{"verdict": "approved", "feedback": ""}"#).unwrap(),
            Verdict::Approved
        );
        assert_eq!(
            Verdict::parse(r#"{"verdict": "rejected", "feedback": "missing results section"}"#)
                .unwrap(),
            Verdict::Rejected {
                feedback: "missing results section".into()
            }
        );
    }

    #[test]
    fn parses_fenced_json_case_insensitive() {
        let raw = "```json\n{\"verdict\": \"APPROVED\"}\n```";
        assert!(Verdict::parse(raw).unwrap().is_approved());

        let raw = "Here is my verdict:\n```\n{\"verdict\": \" Rejected \", \"feedback\": \"too dense\"}\n```";
        assert_eq!(Verdict::parse(raw).unwrap().feedback(), Some("too dense"));
    }

    #[test]
    fn rejection_mentioning_ok_is_still_rejected() {
        let raw = r#"{"verdict": "rejected", "feedback": "The intro is OK but the results are wrong."}"#;
        let verdict = Verdict::parse(raw).unwrap();
        assert!(!verdict.is_approved());
        assert!(verdict.feedback().unwrap().contains("OK"));
    }

    #[test]
    fn empty_rejection_gets_generic_feedback() {
        let verdict = Verdict::parse(r#"{"verdict": "rejected", "feedback": "  "}"#).unwrap();
        assert_eq!(verdict.feedback(), Some(GENERIC_REJECTION));
        let verdict = Verdict::parse(r#"{"verdict": "rejected"}"#).unwrap();
        assert_eq!(verdict.feedback(), Some(GENERIC_REJECTION));
    }

    #[test]
    fn free_text_is_malformed() {
        for raw in ["OK", "Looks good to me.", "", "} oops {", r#"{"verdict": "maybe"}"#] {
            let err = Verdict::parse(raw).unwrap_err();
            assert!(
                matches!(err, DigestError::MalformedVerdict(_)),
                "{raw:?} should be malformed, got {err:?}"
            );
            assert!(err.is_transient());
        }
    }

    #[test]
    fn preview_truncates_long_replies() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 123);
    }
}
