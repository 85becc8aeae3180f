use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, Question, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, difficulty_from_i64, difficulty_to_i64, map_question_row, ser};
use crate::repository::{QuestionRepository, StorageError};

impl SqliteRepository {
    async fn question_exists(&self, id: &QuestionId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM questions WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (
                id, prompt, answer, explanation, difficulty, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the first insert
                prompt = excluded.prompt,
                answer = excluded.answer,
                explanation = excluded.explanation,
                difficulty = excluded.difficulty,
                updated_at = excluded.updated_at
            ",
        )
        .bind(question.id().as_str())
        .bind(question.prompt())
        .bind(question.answer())
        .bind(question.explanation())
        .bind(difficulty_to_i64(question.difficulty()))
        .bind(question.created_at())
        .bind(question.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, prompt, answer, explanation, difficulty, created_at, updated_at
            FROM questions
            WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let row = row.ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, prompt, answer, explanation, difficulty, created_at, updated_at
            FROM questions
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(questions)
    }

    async fn get_difficulty(&self, id: &QuestionId) -> Result<Option<Difficulty>, StorageError> {
        let row = sqlx::query("SELECT difficulty FROM questions WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let row = row.ok_or(StorageError::NotFound)?;
        difficulty_from_i64(row.try_get::<Option<i64>, _>("difficulty").map_err(ser)?)
    }

    async fn set_difficulty(
        &self,
        id: &QuestionId,
        difficulty: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE questions
            SET difficulty = ?1, updated_at = MAX(updated_at, ?2)
            WHERE id = ?3
            ",
        )
        .bind(i64::from(difficulty))
        .bind(at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn compare_and_set_difficulty(
        &self,
        id: &QuestionId,
        expected: Option<Difficulty>,
        new: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        // `IS` compares NULL to NULL as equal, which covers never-scored questions.
        let res = sqlx::query(
            r"
            UPDATE questions
            SET difficulty = ?1, updated_at = MAX(updated_at, ?2)
            WHERE id = ?3 AND difficulty IS ?4
            ",
        )
        .bind(i64::from(new))
        .bind(at)
        .bind(id.as_str())
        .bind(difficulty_to_i64(expected))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 1 {
            return Ok(true);
        }
        if self.question_exists(id).await? {
            Ok(false)
        } else {
            Err(StorageError::NotFound)
        }
    }
}
