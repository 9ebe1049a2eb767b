//! Daily ingest for paperdigest.
//!
//! Each run pulls a category's newest papers, ranks them by the prestige of
//! their first and last authors, summarizes the selected ones with a
//! [`SummaryPipeline`](paperdigest::pipeline::SummaryPipeline), and stores
//! each verified summary with an embedding of the paper's title and
//! abstract. Liked papers are folded into a user's interest vector with
//! [`record_interest`](embedding::record_interest).
//!
//! The paper feed, PDF text extraction, embedding model, and database are
//! traits in [`sources`]; [`SemanticScholarClient`] is the bundled author
//! lookup.
//!
//! ```ignore
//! use paperdigest_ingest::{DigestJob, IngestConfig, IngestServices, SemanticScholarClient};
//!
//! let scholar = SemanticScholarClient::new()?;
//! let services = IngestServices {
//!     source: &arxiv,
//!     scholar: &scholar,
//!     extractor: &pdf_text,
//!     embedder: &minilm,
//!     store: &db,
//! };
//! let job = DigestJob::new(services, &pipeline, IngestConfig::default())?;
//! let report = job.run_category("cs.AI").await?;
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod job;
pub mod prestige;
pub mod scholar;
pub mod sources;

pub use config::{IngestConfig, PrestigeWeights};
pub use error::{IngestError, Result};
pub use job::{DigestJob, DigestReport, IngestServices, SkipReason, SkippedPaper, StoredRef};
pub use prestige::AuthorStats;
pub use scholar::{ScholarLookup, SemanticScholarClient};
pub use sources::{
    Embedder, NewPaper, PaperMetadata, PaperSource, PaperStore, StoredPaper, TextExtractor,
};
