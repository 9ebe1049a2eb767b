use super::prompt::define_prompt;
use crate::api::{CallKind, CompletionRequest, ModelCaller, ModelConfig};
use crate::error::{DigestError, Result};

/// Find the most important technical term in `snippet` and return a plain
/// definition of it. The term itself is not named in the answer.
pub async fn define_unclear_terms(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    snippet: &str,
) -> Result<String> {
    let snippet = snippet.trim();
    if snippet.is_empty() {
        return Err(DigestError::InvalidInput("snippet to define is empty".into()));
    }
    let (system, user) = define_prompt(snippet);
    let request = CompletionRequest::new(CallKind::Define, model, system, user);
    let definition = caller.call(&request).await?;
    Ok(definition.trim().to_string())
}
