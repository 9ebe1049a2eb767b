//! User interest vectors and feed previews.

use crate::error::{IngestError, Result};
use crate::sources::PaperStore;
use tracing::debug;

const PREVIEW_START: usize = 3;
const PREVIEW_END: usize = 120;

/// `current * decay + article`, element-wise.
pub fn blend_user_embedding(current: &[f32], article: &[f32], decay: f32) -> Result<Vec<f32>> {
    if current.len() != article.len() {
        return Err(IngestError::DimensionMismatch {
            expected: current.len(),
            found: article.len(),
        });
    }
    Ok(current
        .iter()
        .zip(article)
        .map(|(c, a)| c * decay + a)
        .collect())
}

/// Characters 3..120 of a stored body followed by `"..."`.
///
/// Bodies start with `<p>`, so the preview skips the opening tag. Counts
/// characters, not bytes. An HTML entity cut off at the end is dropped.
pub fn early_summary(body: &str) -> String {
    let mut preview: String = body
        .chars()
        .skip(PREVIEW_START)
        .take(PREVIEW_END - PREVIEW_START)
        .collect();
    if let Some(amp) = preview.rfind('&')
        && preview.get(amp..).is_some_and(|tail| !tail.contains(';'))
    {
        preview.truncate(amp);
    }
    preview.push_str("...");
    preview
}

/// Fold a liked paper into a user's interest vector and store the result.
///
/// A user with no vector yet starts from zeros, so their first like becomes
/// their vector.
pub async fn record_interest(
    store: &dyn PaperStore,
    user: &str,
    paper_id: &str,
    decay: f32,
) -> Result<Vec<f32>> {
    let paper = store
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| IngestError::Store(format!("paper {paper_id} not found")))?;
    let current = store
        .get_user_embedding(user)
        .await?
        .unwrap_or_else(|| vec![0.0; paper.embedding.len()]);

    let blended = blend_user_embedding(&current, &paper.embedding, decay)?;
    debug!("Updated interests of {user} with paper {paper_id}");
    store.update_user_embedding(user, blended.clone()).await?;
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_decays_current_and_adds_article() {
        let blended = blend_user_embedding(&[1.0, 0.5, 0.0], &[0.0, 1.0, 2.0], 0.8).unwrap();
        let expected = [0.8, 1.4, 2.0];
        for (got, want) in blended.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn blend_rejects_mismatched_dimensions() {
        let err = blend_user_embedding(&[1.0, 2.0], &[1.0], 0.8).unwrap_err();
        assert!(matches!(
            err,
            IngestError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn preview_skips_opening_tag_and_truncates() {
        let body = format!("<p>{}</p>", "a".repeat(200));
        let preview = early_summary(&body);
        assert_eq!(preview, format!("{}...", "a".repeat(117)));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let body = format!("<p>{}", "é".repeat(150));
        let preview = early_summary(&body);
        assert_eq!(preview.chars().count(), 117 + 3);
        assert!(preview.starts_with('é'));
    }

    #[test]
    fn preview_drops_a_truncated_entity() {
        let body = format!("<p>{}&amp; more</p>", "a".repeat(114));
        assert_eq!(early_summary(&body), format!("{}...", "a".repeat(114)));

        let whole = format!("<p>{}&lt; b</p>", "a".repeat(100));
        assert!(early_summary(&whole).contains("&lt; b"));
    }

    #[test]
    fn preview_of_short_body() {
        assert_eq!(early_summary("<p>"), "...");
        assert_eq!(early_summary(""), "...");
    }
}
