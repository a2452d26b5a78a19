//! Static voice table: (category, gender) → provider voice identifier.
//!
//! The category set is closed, so an unknown combination is unrepresentable
//! rather than a runtime lookup failure.

use std::fmt;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The coaching category a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Presentation,
    DebateCoach,
    InterviewPrep,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [
        Category::Presentation,
        Category::DebateCoach,
        Category::InterviewPrep,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Presentation => "Presentation",
            Category::DebateCoach => "Debate Coach",
            Category::InterviewPrep => "Interview Prep",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// The voice gender requested for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

// ---------------------------------------------------------------------------
// VoiceSelector
// ---------------------------------------------------------------------------

/// A (category, gender) pair resolved to a provider voice identifier.
///
/// # Example
///
/// ```rust
/// use speech_coach::synthesis::{Category, Gender, VoiceSelector};
///
/// let voice = VoiceSelector::new(Category::Presentation, Gender::Female);
/// assert!(!voice.voice_id().is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceSelector {
    pub category: Category,
    pub gender: Gender,
}

impl VoiceSelector {
    pub fn new(category: Category, gender: Gender) -> Self {
        Self { category, gender }
    }

    /// The ElevenLabs premade voice assigned to this slot.
    pub fn voice_id(&self) -> &'static str {
        match (self.category, self.gender) {
            (Category::Presentation, Gender::Male) => "pNInz6obpgDQGcFmaJgB", // Adam
            (Category::Presentation, Gender::Female) => "21m00Tcm4TlvDq8ikWAM", // Rachel
            (Category::DebateCoach, Gender::Male) => "TxGEqnHWrfWFTfGW9XjX", // Josh
            (Category::DebateCoach, Gender::Female) => "AZnzlk1XvdvUeBnXmlld", // Domi
            (Category::InterviewPrep, Gender::Male) => "ErXwobaYiN019PkySvjV", // Antoni
            (Category::InterviewPrep, Gender::Female) => "EXAVITQu4vr4xnSDxMaL", // Bella
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
    fn every_combination_resolves_to_a_distinct_voice() {
        let mut seen = std::collections::HashSet::new();
        for category in Category::ALL {
            for gender in [Gender::Male, Gender::Female] {
                let id = VoiceSelector::new(category, gender).voice_id();
                assert!(!id.is_empty());
                assert!(seen.insert(id), "duplicate voice id: {id}");
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn category_display_names() {
        assert_eq!(Category::Presentation.to_string(), "Presentation");
        assert_eq!(Category::DebateCoach.to_string(), "Debate Coach");
        assert_eq!(Category::InterviewPrep.to_string(), "Interview Prep");
    }
}
