//! Prompt text for every agent, plus a small builder for sectioned system
//! prompts.
//!
//! [`PromptBuilder`] assembles a preamble and `## Heading` sections joined by
//! blank lines, skipping empty sections. The `*_prompt` functions below
//! return `(system, user)` pairs ready for a
//! [`CompletionRequest`](crate::api::CompletionRequest).

use crate::pipeline::feedback::Feedback;

/// Builder for multi-section system prompts.
///
/// ```
/// use paperdigest::agents::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("You are a verification agent.")
///     .section("Audience", "A curious non-expert.")
///     .section("Extra", "")
///     .build();
///
/// assert!(prompt.contains("## Audience"));
/// assert!(!prompt.contains("## Extra"));
/// ```
pub struct PromptBuilder {
    sections: Vec<String>,
}

impl PromptBuilder {
    /// Start with a preamble, included as-is without a heading.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

/// Wrap `body` in `--- LABEL ---` / `--- END LABEL ---` fences.
fn fenced(label: &str, body: &str) -> String {
    format!("--- {label} ---\n{body}\n--- END {label} ---")
}

const VERDICT_FORMAT: &str = "Respond with a single JSON object and nothing else:\n\
{\"verdict\": \"approved\" | \"rejected\", \"feedback\": \"...\"}\n\
Use \"approved\" with empty feedback when the summary passes. Use \"rejected\" \
with specific, actionable feedback when it does not.";

const LAY_AUDIENCE: &str = "An average person with a slight interest in the topic. \
They are curious but have no specialist training.";

/// Map step: summarize one section of a paper.
pub fn map_chunk_prompt(chunk: &str) -> (String, String) {
    let system = "You are an expert academic summarizer. Summarize the following section \
of a research paper, keeping every key point, method, and finding."
        .to_string();
    let user = format!("Here is the section:\n{}", fenced("SECTION", chunk));
    (system, user)
}

/// Reduce step: synthesize section summaries into one narrative.
pub fn reduce_prompt(combined_summaries: &str) -> (String, String) {
    let system = "You are an expert academic editor. You have been given summaries of \
different sections of the same research paper. Synthesize them into one comprehensive, \
coherent summary of the whole paper that flows logically and captures the overarching \
narrative and the key results."
        .to_string();
    let user = format!(
        "Here are the summaries of the paper's sections:\n{}",
        fenced("SECTION SUMMARIES", combined_summaries)
    );
    (system, user)
}

/// Four-paragraph lay summary, first draft or regeneration with feedback.
pub fn generate_prompt(paper_text: &str, feedback: Option<&Feedback>) -> (String, String) {
    let system = PromptBuilder::new(
        "You are an expert academic summarizer. Write a four-paragraph summary of a \
research paper that focuses on its key points and most interesting results.",
    )
    .section("Audience", LAY_AUDIENCE)
    .section(
        "Style",
        "Write clearly and engagingly. Avoid jargon where possible and explain any \
technical term you must use in simple words.",
    )
    .section(
        "Format",
        "Exactly four paragraphs of plain prose. Separate paragraphs with a single blank \
line. No headings, bullet points, or title.",
    )
    .build();

    let instruction = match feedback.filter(|f| !f.is_empty()) {
        Some(f) => format!(
            "Please regenerate the summary based on the following feedback:\n{}",
            fenced("FEEDBACK", &f.render())
        ),
        None => "You are generating the first draft.".to_string(),
    };
    let user = format!(
        "{instruction}\n\nHere is the paper text:\n{}",
        fenced("PAPER TEXT", paper_text)
    );
    (system, user)
}

/// Content fidelity check against the original paper.
pub fn reflection_prompt(original_text: &str, summary: &str) -> (String, String) {
    let system = PromptBuilder::new(
        "You are a verification agent. Decide whether a summary accurately reflects the \
key points, findings, and conclusions of the original research paper.",
    )
    .section(
        "Criteria",
        "Approve a summary that is accurate and covers the essential aspects. Reject one \
that is inaccurate, misses key points, or misrepresents the findings, and say exactly \
what must change. Do not be overly critical of minor omissions; focus on major \
discrepancies or missing core concepts.",
    )
    .section("Response format", VERDICT_FORMAT)
    .build();
    let user = format!(
        "{}\n\n{}\n\nDoes the summary accurately reflect the paper's content?",
        fenced("ORIGINAL PAPER", original_text),
        fenced("SUMMARY", summary)
    );
    (system, user)
}

/// Lay-reader accessibility check.
pub fn readability_prompt(summary: &str) -> (String, String) {
    let system = PromptBuilder::new(
        "You are a verification agent focused on readability. Decide whether a summary is \
easy to understand for its intended audience.",
    )
    .section("Audience", LAY_AUDIENCE)
    .section(
        "Criteria",
        "The language should be clear, engaging, and largely free of unexplained jargon. \
Reject a summary that is too technical, uses dense jargon without explanation, or is \
otherwise hard for a non-expert to read, and say how to make it more accessible.",
    )
    .section("Response format", VERDICT_FORMAT)
    .build();
    let user = format!(
        "{}\n\nCan the intended audience understand this summary?",
        fenced("SUMMARY", summary)
    );
    (system, user)
}

/// Identify and define the key technical term in a snippet.
pub fn define_prompt(snippet: &str) -> (String, String) {
    let system = "You are an expert science communicator who makes complex topics easy to \
understand. Read a short piece of text, find the single most important technical term or \
piece of jargon a non-expert would not understand, and give a clear, simple definition of \
it. Give the definition directly without naming the term, as if explaining it in passing."
        .to_string();
    let user = format!(
        "Identify the main technical term or phrase in the following text and give an \
easy-to-understand definition for it.\n\n{}",
        fenced("TEXT", snippet)
    );
    (system, user)
}
