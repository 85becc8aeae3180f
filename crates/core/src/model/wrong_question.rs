use chrono::{DateTime, Utc};

use crate::model::QuestionId;

/// A question the learner got wrong and should come back to.
///
/// A question appears on the list at most once; re-listing keeps the
/// first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongQuestion {
    question_id: QuestionId,
    added_at: DateTime<Utc>,
    notes: Option<String>,
}

impl WrongQuestion {
    /// Note attached to entries recorded automatically after a session.
    pub const FROM_SESSION_NOTE: &'static str = "Added from practice session";

    #[must_use]
    pub fn new(question_id: QuestionId, added_at: DateTime<Utc>) -> Self {
        Self {
            question_id,
            added_at,
            notes: None,
        }
    }

    /// Entry for a question answered incorrectly in a practice session.
    #[must_use]
    pub fn from_session(question_id: QuestionId, added_at: DateTime<Utc>) -> Self {
        Self::new(question_id, added_at).with_notes(Self::FROM_SESSION_NOTE)
    }

    /// Blank notes are stored as `None`.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        self
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}
