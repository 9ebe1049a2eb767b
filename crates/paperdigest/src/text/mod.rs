//! Text handling: token estimation and paragraph-aligned chunking.

pub mod chunker;
pub mod tokens;

pub use chunker::{Chunk, PARAGRAPH_SEPARATOR, chunk, paragraph_count, paragraphs};
pub use tokens::{CharRatioEstimator, TokenCounter};
