use crate::agents::Verdict;
use crate::pipeline::REQUIRED_PARAGRAPHS;

/// Guidance carried from one attempt to the next.
///
/// Each entry is present only when its check failed. Verifier entries and
/// the structural entry never coexist: the paragraph count is only checked
/// once both verifiers approve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    pub reflection: Option<String>,
    pub readability: Option<String>,
    pub structural: Option<String>,
}

impl Feedback {
    /// Merge verifier rejections. Approvals contribute nothing.
    pub fn from_verdicts(reflection: &Verdict, readability: &Verdict) -> Self {
        Self {
            reflection: reflection.feedback().map(str::to_string),
            readability: readability.feedback().map(str::to_string),
            structural: None,
        }
    }

    /// Feedback for a summary both verifiers liked but with the wrong
    /// number of paragraphs.
    pub fn structural(found: usize) -> Self {
        Self {
            structural: Some(format!(
                "The content is good, but the summary must have exactly {} paragraphs. \
The last version had {found}.",
                number_word(REQUIRED_PARAGRAPHS)
            )),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reflection.is_none() && self.readability.is_none() && self.structural.is_none()
    }

    /// Render for the generator prompt, one entry per line.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(r) = &self.reflection {
            parts.push(format!("Content Reflection Feedback: {r}"));
        }
        if let Some(r) = &self.readability {
            parts.push(format!("Readability Feedback: {r}"));
        }
        if let Some(s) = &self.structural {
            parts.push(s.clone());
        }
        parts.join("\n")
    }
}

fn number_word(n: usize) -> String {
    match n {
        1 => "one".into(),
        2 => "two".into(),
        3 => "three".into(),
        4 => "four".into(),
        5 => "five".into(),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(text: &str) -> Verdict {
        Verdict::Rejected {
            feedback: text.into(),
        }
    }

    #[test]
    fn reflection_only_rejection() {
        let fb = Feedback::from_verdicts(&rejected("missing results section"), &Verdict::Approved);
        assert_eq!(fb.reflection.as_deref(), Some("missing results section"));
        assert!(fb.readability.is_none());
        assert_eq!(fb.render(), "Content Reflection Feedback: missing results section");
    }

    #[test]
    fn both_rejections_merged() {
        let fb = Feedback::from_verdicts(&rejected("wrong numbers"), &rejected("too much jargon"));
        assert_eq!(
            fb.render(),
            "Content Reflection Feedback: wrong numbers\nReadability Feedback: too much jargon"
        );
    }

    #[test]
    fn approvals_are_empty() {
        let fb = Feedback::from_verdicts(&Verdict::Approved, &Verdict::Approved);
        assert!(fb.is_empty());
        assert_eq!(fb.render(), "");
    }

    #[test]
    fn structural_mentions_counts() {
        let fb = Feedback::structural(6);
        assert!(!fb.is_empty());
        assert!(fb.reflection.is_none() && fb.readability.is_none());
        let text = fb.render();
        assert!(text.contains("exactly four paragraphs"));
        assert!(text.contains("had 6"));
    }
}
