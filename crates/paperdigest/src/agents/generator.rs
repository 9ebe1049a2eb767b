use super::prompt::generate_prompt;
use crate::api::{CallKind, CompletionRequest, ModelCaller, ModelConfig};
use crate::error::Result;
use crate::pipeline::feedback::Feedback;
use crate::text::chunker::paragraphs;

/// A candidate lay summary produced by one generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    text: String,
}

impl Summary {
    /// Wrap model output, trimming surrounding whitespace.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn paragraphs(&self) -> Vec<String> {
        paragraphs(&self.text)
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().len()
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Write a four-paragraph summary of `text`, guided by `feedback` from the
/// previous attempt when present.
pub async fn generate(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    text: &str,
    feedback: Option<&Feedback>,
) -> Result<Summary> {
    let (system, user) = generate_prompt(text, feedback);
    let request = CompletionRequest::new(CallKind::Generate, model, system, user);
    let reply = caller.call(&request).await?;
    Ok(Summary::new(reply))
}
