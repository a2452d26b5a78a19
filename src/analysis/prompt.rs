//! System instructions for the two analysis calls.
//!
//! Both calls share one transcript but carry distinct system instructions:
//! the critique asks for a short list of constructive bullet points, the
//! rewrite asks for a polished restatement with no explanatory wrapper.

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Critique — 4–5 concise, constructive bullet points in markdown form.
const CRITIQUE_INSTRUCTION: &str = "\
You are a speech coach reviewing a spoken-delivery transcript.
Task: Give concise, constructive feedback on the speech.

Rules:
1. Respond with 4-5 bullet points, each starting with \"* \".
2. Each bullet is one short, specific, actionable observation.
3. Cover delivery (pacing, filler words, clarity) and content (structure, word choice).
4. Mention at least one strength.
5. Reply with ONLY the bullet list — no preamble, no summary.";

/// Rewrite — a polished restatement of similar length, nothing else.
const REWRITE_INSTRUCTION: &str = "\
You are a speech coach polishing a spoken-delivery transcript.
Task: Rewrite the speech as the speaker should have delivered it.

Rules:
1. Keep the speaker's meaning, intent and approximate length.
2. Remove filler words and false starts; tighten the phrasing.
3. Improve flow and word choice without changing the register.
4. Reply with ONLY the rewritten speech — no explanation, no quotes.";

// ---------------------------------------------------------------------------
// FeedbackKind
// ---------------------------------------------------------------------------

/// Which of the two concurrent analysis calls a request/stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Bullet-point critique of the delivery.
    Critique,
    /// Polished restatement of the transcript.
    Rewrite,
}

impl FeedbackKind {
    /// The system instruction sent with this call.
    pub fn instruction(self) -> &'static str {
        match self {
            FeedbackKind::Critique => CRITIQUE_INSTRUCTION,
            FeedbackKind::Rewrite => REWRITE_INSTRUCTION,
        }
    }

    /// A short label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            FeedbackKind::Critique => "critique",
            FeedbackKind::Rewrite => "rewrite",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critique_asks_for_bullets() {
        let instruction = FeedbackKind::Critique.instruction();
        assert!(instruction.contains("bullet"));
        assert!(instruction.contains("4-5"));
    }

    #[test]
    fn rewrite_forbids_explanations() {
        let instruction = FeedbackKind::Rewrite.instruction();
        assert!(instruction.contains("ONLY the rewritten speech"));
    }

    #[test]
    fn instructions_are_distinct() {
        assert_ne!(
            FeedbackKind::Critique.instruction(),
            FeedbackKind::Rewrite.instruction()
        );
    }

    #[test]
    fn labels() {
        assert_eq!(FeedbackKind::Critique.label(), "critique");
        assert_eq!(FeedbackKind::Rewrite.label(), "rewrite");
    }
}
