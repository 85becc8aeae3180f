use quiz_core::model::WrongQuestion;

use super::SqliteRepository;
use super::mapping::{conn, map_wrong_question_row};
use crate::repository::{StorageError, WrongQuestionRepository};

#[async_trait::async_trait]
impl WrongQuestionRepository for SqliteRepository {
    async fn add_wrong_question(&self, entry: &WrongQuestion) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO wrong_questions (question_id, added_at, notes)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(question_id) DO NOTHING
            ",
        )
        .bind(entry.question_id().as_str())
        .bind(entry.added_at())
        .bind(entry.notes())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() == 1)
    }

    async fn list_wrong_questions(&self, limit: u32) -> Result<Vec<WrongQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, added_at, notes
            FROM wrong_questions
            ORDER BY added_at DESC, rowid DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_wrong_question_row).collect()
    }
}
