//! Saved questions for the "remember context" toggle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator placed between remembered questions in the outgoing prompt
pub const CONTEXT_SEPARATOR: &str = " and also ";

/// A previously answered question kept for context
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuestion {
    pub id: Uuid,
    pub text: String,
    pub asked_at: DateTime<Utc>,
}

impl SavedQuestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            asked_at: Utc::now(),
        }
    }
}

/// Ordered questions remembered while the toggle is on
///
/// Questions are only saved once their answer has completed with the toggle
/// enabled. Submitting while the toggle is off clears everything saved so
/// far; turning it back on does not bring earlier questions back.
#[derive(Clone, Debug, Default)]
pub struct ConversationContext {
    enabled: bool,
    questions: Vec<SavedQuestion>,
}

impl ConversationContext {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            questions: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the toggle and return the new value
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Build the outgoing prompt for a new question
    ///
    /// With the toggle on, saved questions and the new one are joined with
    /// [`CONTEXT_SEPARATOR`]. With it off, saved questions are dropped and the
    /// question is sent alone.
    pub fn compose_prompt(&mut self, question: &str) -> String {
        if !self.enabled {
            self.questions.clear();
            return question.to_string();
        }

        self.questions
            .iter()
            .map(|saved| saved.text.as_str())
            .chain(std::iter::once(question))
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Record a question whose answer completed
    pub fn remember(&mut self, question: &str) {
        if self.enabled {
            self.questions.push(SavedQuestion::new(question));
        }
    }

    pub fn clear(&mut self) {
        self.questions.clear();
    }

    pub fn questions(&self) -> &[SavedQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sends_question_alone() {
        let mut ctx = ConversationContext::new(false);
        assert_eq!(ctx.compose_prompt("What is Rust?"), "What is Rust?");
        ctx.remember("What is Rust?");
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_enabled_joins_saved_questions() {
        let mut ctx = ConversationContext::new(true);

        assert_eq!(ctx.compose_prompt("What is Java?"), "What is Java?");
        ctx.remember("What is Java?");

        assert_eq!(
            ctx.compose_prompt("What is Spring?"),
            "What is Java? and also What is Spring?"
        );
        ctx.remember("What is Spring?");

        assert_eq!(
            ctx.compose_prompt("Compare them"),
            "What is Java? and also What is Spring? and also Compare them"
        );
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_submitting_with_toggle_off_clears() {
        let mut ctx = ConversationContext::new(true);
        ctx.remember("first");
        ctx.remember("second");

        ctx.set_enabled(false);
        assert_eq!(ctx.compose_prompt("third"), "third");
        assert!(ctx.is_empty());

        // Re-enabling does not resurrect anything
        assert!(ctx.toggle());
        assert_eq!(ctx.compose_prompt("fourth"), "fourth");
    }

    #[test]
    fn test_toggling_without_submitting_keeps_saved() {
        let mut ctx = ConversationContext::new(true);
        ctx.remember("kept");

        assert!(!ctx.toggle());
        assert!(ctx.toggle());

        assert_eq!(ctx.compose_prompt("next"), "kept and also next");
    }

    #[test]
    fn test_saved_questions_get_distinct_ids() {
        let mut ctx = ConversationContext::new(true);
        ctx.remember("a");
        ctx.remember("b");

        let questions = ctx.questions();
        assert_ne!(questions[0].id, questions[1].id);
        assert!(questions[0].asked_at <= questions[1].asked_at);
    }
}
