use serde_json::Value;
use thiserror::Error;

use crate::model::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Session-level problems that make the whole result unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionResultError {
    #[error("correct count ({correct}) exceeds total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("malformed session payload: {0}")]
    MalformedPayload(String),
}

/// Why a single per-question entry was ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedEntry {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("questionId is missing or not a string")]
    MissingQuestionId,
    #[error("questionId is empty")]
    EmptyQuestionId,
    #[error("isCorrect is missing or not a boolean")]
    MissingIsCorrect,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Whether one question in a session was answered correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
}

impl QuestionOutcome {
    #[must_use]
    pub fn new(question_id: QuestionId, is_correct: bool) -> Self {
        Self {
            question_id,
            is_correct,
        }
    }

    /// Decode one entry of the `questions` array.
    ///
    /// Only `questionId` and `isCorrect` are read; other keys (`userAnswer`,
    /// `timeSpent`, `marked`) are ignored.
    ///
    /// # Errors
    ///
    /// Returns the `MalformedEntry` reason when a required field is missing or
    /// has the wrong JSON type.
    pub fn from_entry(entry: &Value) -> Result<Self, MalformedEntry> {
        let obj = entry.as_object().ok_or(MalformedEntry::NotAnObject)?;
        let raw_id = obj
            .get("questionId")
            .and_then(Value::as_str)
            .ok_or(MalformedEntry::MissingQuestionId)?;
        let question_id = raw_id
            .parse::<QuestionId>()
            .map_err(|_| MalformedEntry::EmptyQuestionId)?;
        let is_correct = obj
            .get("isCorrect")
            .and_then(Value::as_bool)
            .ok_or(MalformedEntry::MissingIsCorrect)?;
        Ok(Self::new(question_id, is_correct))
    }
}

/// An entry that could not be decoded, with its position in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: MalformedEntry,
}

//
// ─── SESSION RESULT ────────────────────────────────────────────────────────────
//

/// Completed-session input for difficulty adjustment.
///
/// `outcomes` may be empty or shorter than `total_questions`; skipped
/// questions are simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    total_questions: u32,
    correct_count: u32,
    outcomes: Vec<QuestionOutcome>,
}

/// A decoded session result plus the entries that had to be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSessionResult {
    pub result: SessionResult,
    pub rejected: Vec<RejectedEntry>,
}

impl SessionResult {
    /// # Errors
    ///
    /// Returns `SessionResultError::CorrectExceedsTotal` if `correct_count > total_questions`.
    pub fn new(
        total_questions: u32,
        correct_count: u32,
        outcomes: Vec<QuestionOutcome>,
    ) -> Result<Self, SessionResultError> {
        if correct_count > total_questions {
            return Err(SessionResultError::CorrectExceedsTotal {
                correct: correct_count,
                total: total_questions,
            });
        }
        Ok(Self {
            total_questions,
            correct_count,
            outcomes,
        })
    }

    /// Decode the raw `questions` payload of a session.
    ///
    /// The payload must be a JSON array. Entries that are not objects or lack
    /// a string `questionId` / boolean `isCorrect` are collected in
    /// `rejected` and do not fail the whole decode.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError::MalformedPayload` if `details` is not an
    /// array, or `CorrectExceedsTotal` if the counts are inconsistent.
    pub fn from_details(
        total_questions: u32,
        correct_count: u32,
        details: &Value,
    ) -> Result<ParsedSessionResult, SessionResultError> {
        let entries = details.as_array().ok_or_else(|| {
            SessionResultError::MalformedPayload(format!(
                "expected an array of question records, found {}",
                json_kind(details)
            ))
        })?;

        let mut outcomes = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            match QuestionOutcome::from_entry(entry) {
                Ok(outcome) => outcomes.push(outcome),
                Err(reason) => rejected.push(RejectedEntry { index, reason }),
            }
        }

        let result = Self::new(total_questions, correct_count, outcomes)?;
        Ok(ParsedSessionResult { result, rejected })
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
