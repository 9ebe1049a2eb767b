//! Map-reduce condensation for papers too long for one generation call.
//!
//! The map step summarizes every chunk independently, at most
//! `concurrency` at a time; the reduce step synthesizes the chunk summaries
//! into one narrative with a single call. Chunk summaries come back in
//! source order regardless of completion order, and the first failed chunk
//! aborts the whole condense.

use super::prompt::{map_chunk_prompt, reduce_prompt};
use crate::api::{CallKind, CompletionRequest, ModelCaller, ModelConfig};
use crate::error::{DigestError, Result};
use crate::text::Chunk;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

/// Separator between chunk summaries in the reduce input.
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Summarize each chunk, in source order.
///
/// `on_chunk` is called as each chunk summary arrives (completion order).
pub async fn map_chunks(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    chunks: &[Chunk],
    concurrency: usize,
    on_chunk: &(dyn Fn(&Chunk, &str) + Send + Sync),
) -> Result<Vec<String>> {
    stream::iter(chunks)
        .map(|chunk| async move {
            let (system, user) = map_chunk_prompt(&chunk.text);
            let request = CompletionRequest::new(CallKind::MapChunk, model, system, user);
            let summary = caller.call(&request).await?;
            debug!(
                "Chunk {} summarized: {} tokens -> {} chars",
                chunk.index,
                chunk.tokens,
                summary.len()
            );
            on_chunk(chunk, &summary);
            Ok::<_, DigestError>(summary)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Synthesize chunk summaries into one narrative.
pub async fn reduce(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    summaries: &[String],
) -> Result<String> {
    let combined = summaries.join(SUMMARY_SEPARATOR);
    let (system, user) = reduce_prompt(&combined);
    let request = CompletionRequest::new(CallKind::Reduce, model, system, user);
    caller.call(&request).await
}

/// Map then reduce. Returns the condensed text.
pub async fn condense(
    caller: &ModelCaller<'_>,
    model: &ModelConfig,
    chunks: &[Chunk],
    concurrency: usize,
    on_chunk: &(dyn Fn(&Chunk, &str) + Send + Sync),
) -> Result<String> {
    if chunks.is_empty() {
        return Err(DigestError::InvalidInput("nothing to condense".into()));
    }
    info!(
        "Condensing {} chunk(s), up to {} at a time",
        chunks.len(),
        concurrency.max(1)
    );
    let summaries = map_chunks(caller, model, chunks, concurrency, on_chunk).await?;
    let condensed = reduce(caller, model, &summaries).await?;
    info!("Condensed to {} chars", condensed.len());
    Ok(condensed)
}
