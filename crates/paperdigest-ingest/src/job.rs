use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::prestige::{score_papers, select_top};
use crate::scholar::ScholarLookup;
use crate::sources::{Embedder, NewPaper, PaperMetadata, PaperSource, PaperStore, TextExtractor};
use chrono::{DateTime, Utc};
use paperdigest::pipeline::{ExhaustionReason, SummaryOutcome, SummaryPipeline};
use std::fmt;
use tracing::{Instrument, info, info_span, warn};

/// The external systems a [`DigestJob`] talks to.
pub struct IngestServices<'a> {
    pub source: &'a dyn PaperSource,
    pub scholar: &'a dyn ScholarLookup,
    pub extractor: &'a dyn TextExtractor,
    pub embedder: &'a dyn Embedder,
    pub store: &'a dyn PaperStore,
}

/// Why a selected paper was not stored.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Extraction(String),
    /// Every summary attempt was rejected, or the deadline passed.
    NotVerified {
        attempts: u32,
        reason: ExhaustionReason,
    },
    Summarization(String),
    Embedding(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Extraction(e) => write!(f, "text extraction failed: {e}"),
            SkipReason::NotVerified { attempts, reason } => {
                write!(f, "no verified summary after {attempts} attempt(s): {reason}")
            }
            SkipReason::Summarization(e) => write!(f, "summarization failed: {e}"),
            SkipReason::Embedding(e) => write!(f, "embedding failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPaper {
    pub entry_id: String,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRef {
    pub id: String,
    pub entry_id: String,
    pub title: String,
}

/// What one category run did.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestReport {
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub fetched: usize,
    pub selected: usize,
    pub stored: Vec<StoredRef>,
    pub skipped: Vec<SkippedPaper>,
}

impl DigestReport {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            started_at: Utc::now(),
            fetched: 0,
            selected: 0,
            stored: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{}: fetched {}, selected {}, stored {}, skipped {}",
            self.category,
            self.fetched,
            self.selected,
            self.stored.len(),
            self.skipped.len()
        )
    }
}

/// Fetches a category's recent papers, keeps those by prestigious authors,
/// and stores a verified lay summary of each.
///
/// Papers are summarized one at a time. A paper that cannot be extracted,
/// summarized, verified, or embedded is skipped and reported; configuration
/// errors and store failures abort the run.
///
/// ```ignore
/// let job = DigestJob::new(services, &pipeline, IngestConfig::default())?;
/// let report = job.run_category("cs.AI").await?;
/// println!("{}", report.summary());
/// ```
pub struct DigestJob<'a> {
    services: IngestServices<'a>,
    pipeline: &'a SummaryPipeline<'a>,
    config: IngestConfig,
}

impl<'a> DigestJob<'a> {
    pub fn new(
        services: IngestServices<'a>,
        pipeline: &'a SummaryPipeline<'a>,
        config: IngestConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            services,
            pipeline,
            config,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub async fn run_category(&self, category: &str) -> Result<DigestReport> {
        self.run(category)
            .instrument(info_span!("digest", category = %category))
            .await
    }

    async fn run(&self, category: &str) -> Result<DigestReport> {
        let mut report = DigestReport::new(category);
        let papers = self
            .services
            .source
            .fetch_recent(category, self.config.recent_days, self.config.max_results)
            .await?;
        report.fetched = papers.len();
        info!(
            "Fetched {} paper(s) from the last {} day(s)",
            papers.len(),
            self.config.recent_days
        );

        let scores = score_papers(
            self.services.scholar,
            &papers,
            self.config.weights,
            self.config.lookup_delay,
        )
        .await;
        let selected = select_top(&scores, self.config.top_n);
        report.selected = selected.len();
        info!("Selected {} of {} paper(s)", selected.len(), papers.len());

        for paper in selected.iter().filter_map(|&i| papers.get(i)) {
            match self.process(paper).await? {
                Ok(id) => {
                    info!("Stored \"{}\" as {id}", paper.title);
                    report.stored.push(StoredRef {
                        id,
                        entry_id: paper.entry_id.clone(),
                        title: paper.title.clone(),
                    });
                }
                Err(reason) => {
                    warn!("Skipping \"{}\": {reason}", paper.title);
                    report.skipped.push(SkippedPaper {
                        entry_id: paper.entry_id.clone(),
                        title: paper.title.clone(),
                        reason,
                    });
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// The outer result aborts the run; the inner one skips the paper.
    async fn process(
        &self,
        paper: &PaperMetadata,
    ) -> Result<std::result::Result<String, SkipReason>> {
        let text = match self.services.extractor.extract_full_text(paper).await {
            Ok(text) => text,
            Err(e) => return Ok(Err(SkipReason::Extraction(e.to_string()))),
        };

        let summary = match self.pipeline.summarize_and_verify(&text).await {
            Ok(SummaryOutcome::Accepted { summary, .. }) => summary,
            Ok(SummaryOutcome::Exhausted { attempts, reason }) => {
                return Ok(Err(SkipReason::NotVerified { attempts, reason }));
            }
            Err(e) if e.is_configuration() => return Err(IngestError::Digest(e)),
            Err(e) => return Ok(Err(SkipReason::Summarization(e.to_string()))),
        };

        let embedding = match self.services.embedder.embed(&paper.embedding_text()).await {
            Ok(embedding) => embedding,
            Err(e) => return Ok(Err(SkipReason::Embedding(e.to_string()))),
        };

        let id = self
            .services
            .store
            .store_paper(NewPaper {
                title: paper.title.clone(),
                body: NewPaper::html_body(summary.as_str()),
                link: paper.pdf_url.clone(),
                embedding,
                categories: paper.categories.clone(),
            })
            .await?;
        Ok(Ok(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reasons_display() {
        let reason = SkipReason::NotVerified {
            attempts: 3,
            reason: ExhaustionReason::AttemptsExhausted,
        };
        assert!(reason.to_string().starts_with("no verified summary after 3 attempt(s)"));
        assert_eq!(
            SkipReason::Extraction("corrupt PDF".into()).to_string(),
            "text extraction failed: corrupt PDF"
        );
    }

    #[test]
    fn report_summary_line() {
        let mut report = DigestReport::new("cs.AI");
        report.fetched = 15;
        report.selected = 14;
        report.stored.push(StoredRef {
            id: "1".into(),
            entry_id: "2501.00001".into(),
            title: "T".into(),
        });
        assert_eq!(
            report.summary(),
            "cs.AI: fetched 15, selected 14, stored 1, skipped 0"
        );
    }
}
