//! Paragraph splitting and token-bounded chunking.
//!
//! A paragraph is a maximal run of non-blank lines. One or more blank
//! (whitespace-only) lines separate paragraphs, and paragraph text is
//! trimmed. [`paragraphs`] is the only place this rule lives: the chunker,
//! the four-paragraph check, and the generator's formatting instruction all
//! rely on it.

use super::tokens::TokenCounter;
use crate::error::{DigestError, Result};
use tracing::{debug, warn};

/// Separator re-inserted between paragraphs inside a chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A contiguous run of whole paragraphs from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the document, starting at 0.
    pub index: usize,
    pub text: String,
    /// Estimated token count of `text`.
    pub tokens: usize,
}

/// Split `text` into trimmed, non-empty paragraphs.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut out);
        } else {
            current.push(line);
        }
    }
    flush_paragraph(&mut current, &mut out);
    out
}

fn flush_paragraph(lines: &mut Vec<&str>, out: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let joined = lines.join("\n");
    out.push(joined.trim().to_string());
    lines.clear();
}

/// Number of paragraphs in `text`.
pub fn paragraph_count(text: &str) -> usize {
    paragraphs(text).len()
}

/// Split `text` into paragraph-aligned chunks of at most `token_budget`
/// tokens each.
///
/// Paragraphs are accumulated greedily while the joined buffer stays within
/// budget. A single paragraph larger than the budget becomes its own chunk
/// and is never split. Empty or whitespace-only input yields no chunks.
pub fn chunk(text: &str, token_budget: usize, counter: &dyn TokenCounter) -> Result<Vec<Chunk>> {
    if token_budget == 0 {
        return Err(DigestError::Configuration(
            "chunk token budget must be positive".into(),
        ));
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for para in paragraphs(text) {
        if buffer.is_empty() {
            buffer = para;
            continue;
        }
        let candidate = format!("{buffer}{PARAGRAPH_SEPARATOR}{para}");
        if counter.count_tokens(&candidate)? <= token_budget {
            buffer = candidate;
        } else {
            seal(&mut chunks, std::mem::replace(&mut buffer, para), token_budget, counter)?;
        }
    }
    if !buffer.is_empty() {
        seal(&mut chunks, buffer, token_budget, counter)?;
    }

    debug!(
        "Chunked {} chars into {} chunk(s) (budget {token_budget} tokens)",
        text.len(),
        chunks.len()
    );
    Ok(chunks)
}

fn seal(
    chunks: &mut Vec<Chunk>,
    text: String,
    token_budget: usize,
    counter: &dyn TokenCounter,
) -> Result<()> {
    let tokens = counter.count_tokens(&text)?;
    let index = chunks.len();
    if tokens > token_budget {
        warn!("Chunk {index} is a single paragraph of {tokens} tokens, over the {token_budget} budget");
    }
    chunks.push(Chunk {
        index,
        text,
        tokens,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per whitespace-separated word.
    struct Words;

    impl TokenCounter for Words {
        fn count_tokens(&self, text: &str) -> Result<usize> {
            Ok(text.split_whitespace().count())
        }
    }

    fn para(words: usize, tag: &str) -> String {
        vec![tag; words].join(" ")
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let text = "First line\nstill first\n\n\n  Second  \n \t \nThird";
        assert_eq!(
            paragraphs(text),
            vec!["First line\nstill first", "Second", "Third"]
        );
    }

    #[test]
    fn paragraphs_handle_crlf_and_edges() {
        let text = "\r\n\r\nOne\r\n\r\nTwo\r\n\r\n";
        assert_eq!(paragraphs(text), vec!["One", "Two"]);
        assert!(paragraphs("").is_empty());
        assert!(paragraphs(" \n\t\n").is_empty());
    }

    #[test]
    fn single_newlines_do_not_split() {
        assert_eq!(paragraph_count("a\nb\nc\nd"), 1);
        assert_eq!(paragraph_count("a\n\nb\n\nc\n\nd"), 4);
    }

    #[test]
    fn chunks_reconstruct_paragraphs_in_order() {
        let paras: Vec<String> = (0..12).map(|i| para(5 + i, &format!("p{i}"))).collect();
        let text = paras.join("\n\n");

        let chunks = chunk(&text, 20, &Words).unwrap();

        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|c| paragraphs(&c.text))
            .collect();
        assert_eq!(rebuilt, paras);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn chunks_respect_budget() {
        let text = (0..30).map(|i| para(4, &format!("w{i}"))).collect::<Vec<_>>().join("\n\n");
        let chunks = chunk(&text, 10, &Words).unwrap();
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.tokens <= 10, "chunk {} has {} tokens", c.index, c.tokens);
            assert_eq!(c.tokens, Words.count_tokens(&c.text).unwrap());
        }
    }

    #[test]
    fn greedy_packing() {
        // 4 + 4 fits in 8, the third paragraph starts a new chunk.
        let text = format!("{}\n\n{}\n\n{}", para(4, "a"), para(4, "b"), para(4, "c"));
        let chunks = chunk(&text, 8, &Words).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].tokens, 8);
        assert_eq!(chunks[1].tokens, 4);
    }

    #[test]
    fn oversize_paragraph_kept_whole() {
        let big = para(50, "big");
        let text = format!("{}\n\n{big}\n\n{}", para(3, "a"), para(3, "b"));
        let chunks = chunk(&text, 10, &Words).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].text, big);
        assert_eq!(chunks[1].tokens, 50);
    }

    #[test]
    fn small_input_is_one_chunk() {
        let chunks = chunk("Just one paragraph.", 100, &Words).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Just one paragraph.");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", 10, &Words).unwrap().is_empty());
        assert!(chunk("\n\n  \n", 10, &Words).unwrap().is_empty());
    }

    #[test]
    fn zero_budget_is_configuration_error() {
        assert!(chunk("text", 0, &Words).unwrap_err().is_configuration());
    }
}
