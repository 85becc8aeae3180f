use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Difficulty, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,
    #[error("updated_at is before created_at")]
    InvalidTimeRange,
}

/// A quiz question as far as difficulty tracking is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    answer: String,
    explanation: Option<String>,
    difficulty: Option<Difficulty>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Question {
    /// Create a new, never-scored question unless a difficulty is supplied.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        answer: impl Into<String>,
        difficulty: Option<Difficulty>,
        now: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        Ok(Self {
            id,
            prompt,
            answer: answer.into(),
            explanation: None,
            difficulty,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank or timestamps are inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        prompt: String,
        answer: String,
        explanation: Option<String>,
        difficulty: Option<Difficulty>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        if updated_at < created_at {
            return Err(QuestionError::InvalidTimeRange);
        }
        let mut question = Self::new(id, prompt, answer, difficulty, created_at)?;
        question.explanation = explanation;
        question.updated_at = updated_at;
        Ok(question)
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Record a new difficulty and bump `updated_at`.
    pub fn set_difficulty(&mut self, difficulty: Difficulty, now: DateTime<Utc>) {
        self.difficulty = Some(difficulty);
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn blank_prompt_is_rejected() {
        let err = Question::new(QuestionId::new("q1"), "  ", "a", None, fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn set_difficulty_bumps_updated_at() {
        let now = fixed_now();
        let mut q = Question::new(QuestionId::new("q1"), "2+2?", "4", None, now).unwrap();
        assert_eq!(q.difficulty(), None);

        let later = now + Duration::minutes(5);
        q.set_difficulty(Difficulty::BASELINE, later);
        assert_eq!(q.difficulty(), Some(Difficulty::BASELINE));
        assert_eq!(q.updated_at(), later);
        assert_eq!(q.created_at(), now);
    }

    #[test]
    fn from_persisted_rejects_inverted_timestamps() {
        let now = fixed_now();
        let err = Question::from_persisted(
            QuestionId::new("q1"),
            "Q".into(),
            "A".into(),
            None,
            None,
            now,
            now - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::InvalidTimeRange);
    }
}
