use quiz_core::model::{PracticeSession, SessionId};

use super::SqliteRepository;
use super::mapping::{conn, map_session_row, ser};
use crate::repository::{PracticeSessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, group_id, mode, started_at, ended_at, duration_secs,
    total_questions, correct_count, details, created_at
";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait::async_trait]
impl PracticeSessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError> {
        let details = serde_json::to_string(session.details()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO practice_sessions (
                id, group_id, mode, started_at, ended_at, duration_secs,
                total_questions, correct_count, details, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(session.id().as_str())
        .bind(session.group_id())
        .bind(session.mode())
        .bind(session.started_at())
        .bind(session.ended_at())
        .bind(i64::from(session.duration_secs()))
        .bind(i64::from(session.total_questions()))
        .bind(i64::from(session.correct_count()))
        .bind(details)
        .bind(session.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<PracticeSession, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM practice_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let row = row.ok_or(StorageError::NotFound)?;
        map_session_row(&row)
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<PracticeSession>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM practice_sessions \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(map_session_row(&row)?);
        }
        Ok(sessions)
    }
}
