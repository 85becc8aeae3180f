use quiz_core::model::{
    Difficulty, PracticeSession, Question, QuestionId, SessionId, WrongQuestion,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn difficulty_from_i64(v: Option<i64>) -> Result<Option<Difficulty>, StorageError> {
    v.map(Difficulty::new).transpose().map_err(ser)
}

pub(crate) fn difficulty_to_i64(d: Option<Difficulty>) -> Option<i64> {
    d.map(i64::from)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let difficulty = difficulty_from_i64(row.try_get::<Option<i64>, _>("difficulty").map_err(ser)?)?;

    Question::from_persisted(
        QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get("prompt").map_err(ser)?,
        row.try_get("answer").map_err(ser)?,
        row.try_get("explanation").map_err(ser)?,
        difficulty,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<PracticeSession, StorageError> {
    let details_raw: String = row.try_get("details").map_err(ser)?;
    // stored verbatim; decoding into outcomes happens at adjustment time
    let details: serde_json::Value = serde_json::from_str(&details_raw).map_err(ser)?;

    PracticeSession::from_persisted(
        SessionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get("group_id").map_err(ser)?,
        row.try_get("mode").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("ended_at").map_err(ser)?,
        u32_from_i64("duration_secs", row.try_get::<i64, _>("duration_secs").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        u32_from_i64(
            "correct_count",
            row.try_get::<i64, _>("correct_count").map_err(ser)?,
        )?,
        details,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_wrong_question_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<WrongQuestion, StorageError> {
    let entry = WrongQuestion::new(
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        row.try_get("added_at").map_err(ser)?,
    );
    let notes: Option<String> = row.try_get("notes").map_err(ser)?;
    Ok(match notes {
        Some(notes) => entry.with_notes(notes),
        None => entry,
    })
}
