use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{ParsedSessionResult, SessionId, SessionResult, SessionResultError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PracticeSessionError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("correct count ({correct}) exceeds total questions ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("session mode cannot be empty")]
    EmptyMode,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A completed practice session as submitted by the frontend.
///
/// Field names follow the submission payload (`camelCase`). `questions` is
/// kept as raw JSON; it is decoded only when difficulties are adjusted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSessionDraft {
    #[serde(default)]
    pub id: Option<SessionId>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_rfc3339")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "duration")]
    pub duration_secs: u32,
    pub total_questions: u32,
    pub correct_count: u32,
    #[serde(default, rename = "questions")]
    pub details: Value,
}

fn default_mode() -> String {
    "practice".to_owned()
}

// The frontend sends `""` for sessions that were never closed explicitly.
fn optional_rfc3339<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

impl PracticeSessionDraft {
    /// Validate the draft and stamp it with `now` as its creation time.
    ///
    /// A missing `id` is replaced with a freshly generated one.
    ///
    /// # Errors
    ///
    /// Returns `PracticeSessionError` if counts or timestamps are inconsistent.
    pub fn validate(self, now: DateTime<Utc>) -> Result<PracticeSession, PracticeSessionError> {
        let mode = self.mode.trim().to_owned();
        if mode.is_empty() {
            return Err(PracticeSessionError::EmptyMode);
        }
        if self.correct_count > self.total_questions {
            return Err(PracticeSessionError::CountMismatch {
                correct: self.correct_count,
                total: self.total_questions,
            });
        }
        if let Some(ended_at) = self.end_time {
            if ended_at < self.start_time {
                return Err(PracticeSessionError::InvalidTimeRange);
            }
        }

        Ok(PracticeSession {
            id: self.id.unwrap_or_else(SessionId::generate),
            group_id: self.group_id.filter(|g| !g.trim().is_empty()),
            mode,
            started_at: self.start_time,
            ended_at: self.end_time,
            duration_secs: self.duration_secs,
            total_questions: self.total_questions,
            correct_count: self.correct_count,
            details: self.details,
            created_at: now,
        })
    }
}

//
// ─── PRACTICE SESSION ──────────────────────────────────────────────────────────
//

/// A persisted practice session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    id: SessionId,
    group_id: Option<String>,
    mode: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration_secs: u32,
    total_questions: u32,
    correct_count: u32,
    details: Value,
    created_at: DateTime<Utc>,
}

impl PracticeSession {
    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PracticeSessionError` if counts or timestamps are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        group_id: Option<String>,
        mode: String,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        duration_secs: u32,
        total_questions: u32,
        correct_count: u32,
        details: Value,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PracticeSessionError> {
        PracticeSessionDraft {
            id: Some(id),
            group_id,
            mode,
            start_time: started_at,
            end_time: ended_at,
            duration_secs,
            total_questions,
            correct_count,
            details,
        }
        .validate(created_at)
    }

    /// Decode the per-question payload into a `SessionResult`.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError::MalformedPayload` if `details` is not an array.
    pub fn result(&self) -> Result<ParsedSessionResult, SessionResultError> {
        SessionResult::from_details(self.total_questions, self.correct_count, &self.details)
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    #[must_use]
    pub fn mode(&self) -> &str {
        &self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
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
    pub fn details(&self) -> &Value {
        &self.details
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use serde_json::json;

    fn draft_json() -> Value {
        json!({
            "id": "s-1",
            "groupId": "g-1",
            "mode": "practice",
            "startTime": "2023-11-14T22:00:00Z",
            "endTime": "2023-11-14T22:10:00Z",
            "duration": 600,
            "totalQuestions": 2,
            "correctCount": 1,
            "questions": [
                { "questionId": "a", "isCorrect": true },
                { "questionId": "b", "isCorrect": false }
            ]
        })
    }

    #[test]
    fn draft_deserializes_submission_payload() {
        let draft: PracticeSessionDraft = serde_json::from_value(draft_json()).unwrap();
        let session = draft.validate(fixed_now()).unwrap();

        assert_eq!(session.id(), &SessionId::new("s-1"));
        assert_eq!(session.group_id(), Some("g-1"));
        assert_eq!(session.duration_secs(), 600);
        assert_eq!(session.result().unwrap().result.outcomes().len(), 2);
    }

    #[test]
    fn empty_end_time_means_open_session() {
        let mut raw = draft_json();
        raw["endTime"] = json!("");
        let draft: PracticeSessionDraft = serde_json::from_value(raw).unwrap();
        assert_eq!(draft.end_time, None);
    }

    #[test]
    fn missing_id_is_generated() {
        let mut raw = draft_json();
        raw.as_object_mut().unwrap().remove("id");
        let draft: PracticeSessionDraft = serde_json::from_value(raw).unwrap();
        let session = draft.validate(fixed_now()).unwrap();
        assert!(!session.id().as_str().is_empty());
    }

    #[test]
    fn blank_session_id_is_rejected() {
        let mut raw = draft_json();
        raw["id"] = json!("  ");
        assert!(serde_json::from_value::<PracticeSessionDraft>(raw).is_err());
    }

    #[test]
    fn inconsistent_counts_are_rejected() {
        let mut raw = draft_json();
        raw["correctCount"] = json!(3);
        let draft: PracticeSessionDraft = serde_json::from_value(raw).unwrap();
        assert_eq!(
            draft.validate(fixed_now()).unwrap_err(),
            PracticeSessionError::CountMismatch { correct: 3, total: 2 }
        );
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut raw = draft_json();
        raw["endTime"] = json!("2023-11-14T21:00:00Z");
        let draft: PracticeSessionDraft = serde_json::from_value(raw).unwrap();
        assert_eq!(
            draft.validate(fixed_now()).unwrap_err(),
            PracticeSessionError::InvalidTimeRange
        );
    }

    #[test]
    fn missing_questions_payload_fails_to_decode() {
        let mut raw = draft_json();
        raw.as_object_mut().unwrap().remove("questions");
        let draft: PracticeSessionDraft = serde_json::from_value(raw).unwrap();
        let session = draft.validate(fixed_now()).unwrap();
        assert!(matches!(
            session.result(),
            Err(SessionResultError::MalformedPayload(_))
        ));
    }
}
