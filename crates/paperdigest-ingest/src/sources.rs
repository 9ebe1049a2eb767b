//! Collaborators of the daily job: where papers come from, how their text is
//! extracted and embedded, and where summaries are stored.
//!
//! Each collaborator is a dyn-compatible trait returning a boxed future, so a
//! job can hold them as `&dyn` references and tests can substitute in-memory
//! fakes.

use crate::embedding::early_summary;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// One paper as listed by a [`PaperSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub pdf_url: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub entry_id: String,
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
}

impl PaperMetadata {
    /// The text embedded for similarity search: title, a space, then the
    /// abstract.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// A feed of newly submitted papers.
pub trait PaperSource: Send + Sync {
    /// Up to `max_results` papers in `category` submitted in the last
    /// `days` days, newest first.
    fn fetch_recent<'a>(
        &'a self,
        category: &'a str,
        days: u32,
        max_results: usize,
    ) -> BoxFuture<'a, Result<Vec<PaperMetadata>>>;
}

/// Pulls the full plaintext out of a paper (typically its PDF).
pub trait TextExtractor: Send + Sync {
    fn extract_full_text<'a>(&'a self, paper: &'a PaperMetadata) -> BoxFuture<'a, Result<String>>;
}

/// Maps text to a fixed-length vector.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// A paper ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaper {
    pub title: String,
    /// HTML body: the summary wrapped in `<p>...</p>`.
    pub body: String,
    pub link: String,
    pub embedding: Vec<f32>,
    pub categories: Vec<String>,
}

impl NewPaper {
    /// The summary as an HTML paragraph, with markup characters escaped.
    pub fn html_body(summary: &str) -> String {
        format!("<p>{}</p>", escape_html(summary))
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A paper as read back from a [`PaperStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPaper {
    pub id: String,
    pub title: String,
    pub body: String,
    pub link: String,
    pub liked_count: u32,
    pub embedding: Vec<f32>,
    pub categories: Vec<String>,
}

impl StoredPaper {
    /// The feed preview of the body.
    pub fn early_summary(&self) -> String {
        early_summary(&self.body)
    }
}

/// Persistence for papers and user interest vectors.
pub trait PaperStore: Send + Sync {
    /// Store a paper with a like count of zero and return its id.
    fn store_paper<'a>(&'a self, paper: NewPaper) -> BoxFuture<'a, Result<String>>;

    fn get_paper<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<StoredPaper>>>;

    /// `None` for a user with no recorded interests yet.
    fn get_user_embedding<'a>(&'a self, user: &'a str) -> BoxFuture<'a, Result<Option<Vec<f32>>>>;

    fn update_user_embedding<'a>(
        &'a self,
        user: &'a str,
        embedding: Vec<f32>,
    ) -> BoxFuture<'a, Result<()>>;
}

/// arXiv search query for `category` papers submitted in the `days` days
/// up to `now`, with day-granularity bounds.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use paperdigest_ingest::sources::submitted_date_query;
///
/// let now = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap();
/// assert_eq!(
///     submitted_date_query("cs.AI", 3, now),
///     "cat:cs.AI AND submittedDate:[20250307000000 TO 20250310000000]"
/// );
/// ```
pub fn submitted_date_query(category: &str, days: u32, now: DateTime<Utc>) -> String {
    let start = now - Duration::days(i64::from(days));
    format!(
        "cat:{category} AND submittedDate:[{} TO {}]",
        start.format("%Y%m%d000000"),
        now.format("%Y%m%d000000")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn metadata_serializes_abstract_under_its_wire_name() {
        let paper = PaperMetadata {
            title: "Sparse Attention".into(),
            authors: vec!["Ada".into()],
            pdf_url: "https://arxiv.org/pdf/2501.00001".into(),
            abstract_text: "We study sparsity.".into(),
            entry_id: "2501.00001".into(),
            categories: vec!["cs.AI".into()],
            published: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["abstract"], "We study sparsity.");
        assert_eq!(paper.embedding_text(), "Sparse Attention We study sparsity.");

        let back: PaperMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, paper);
    }

    #[test]
    fn html_body_wraps_summary() {
        assert_eq!(NewPaper::html_body("One.\n\nTwo."), "<p>One.\n\nTwo.</p>");
    }

    #[test]
    fn html_body_escapes_markup() {
        let body = NewPaper::html_body("Effect held at p < 0.05 & <b>n</b> > 30.");
        assert_eq!(
            body,
            "<p>Effect held at p &lt; 0.05 &amp; &lt;b&gt;n&lt;/b&gt; &gt; 30.</p>"
        );
        let inner = body
            .strip_prefix("<p>")
            .and_then(|b| b.strip_suffix("</p>"))
            .unwrap();
        assert!(!inner.contains('<') && !inner.contains('>'));
    }

    #[test]
    fn query_spans_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(
            submitted_date_query("cs.LG", 3, now),
            "cat:cs.LG AND submittedDate:[20250226000000 TO 20250301000000]"
        );
    }

    #[test]
    fn stored_paper_preview() {
        let paper = StoredPaper {
            id: "p1".into(),
            title: "T".into(),
            body: "<p>Short body.</p>".into(),
            link: String::new(),
            liked_count: 0,
            embedding: Vec::new(),
            categories: Vec::new(),
        };
        assert_eq!(paper.early_summary(), "Short body.</p>...");
    }
}
