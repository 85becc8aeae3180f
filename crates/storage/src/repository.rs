use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Difficulty, PracticeSession, Question, QuestionId, SessionId, WrongQuestion,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for questions and their difficulty.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError>;

    /// List questions ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;

    /// Current difficulty of a question; `None` if it was never scored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn get_difficulty(&self, id: &QuestionId) -> Result<Option<Difficulty>, StorageError>;

    /// Overwrite the difficulty of a question unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn set_difficulty(
        &self,
        id: &QuestionId,
        difficulty: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Write `new` only if the stored difficulty still equals `expected`.
    ///
    /// Returns `Ok(false)` when another writer changed the value first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn compare_and_set_difficulty(
        &self,
        id: &QuestionId,
        expected: Option<Difficulty>,
        new: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;
}

/// Repository contract for completed practice sessions.
#[async_trait]
pub trait PracticeSessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a session with the same ID exists.
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: &SessionId) -> Result<PracticeSession, StorageError>;

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(&self, limit: u32) -> Result<Vec<PracticeSession>, StorageError>;
}

/// Repository contract for the wrong-question list.
#[async_trait]
pub trait WrongQuestionRepository: Send + Sync {
    /// Put a question on the list unless it is already there.
    ///
    /// Returns `Ok(false)` and keeps the existing entry when the question was
    /// already listed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn add_wrong_question(&self, entry: &WrongQuestion) -> Result<bool, StorageError>;

    /// Most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_wrong_questions(&self, limit: u32) -> Result<Vec<WrongQuestion>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<Vec<PracticeSession>>>,
    wrong_questions: Arc<Mutex<Vec<WrongQuestion>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id().clone(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut all: Vec<Question> = guard.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }

    async fn get_difficulty(&self, id: &QuestionId) -> Result<Option<Difficulty>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        guard
            .get(id)
            .map(Question::difficulty)
            .ok_or(StorageError::NotFound)
    }

    async fn set_difficulty(
        &self,
        id: &QuestionId,
        difficulty: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        let question = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        question.set_difficulty(difficulty, at);
        Ok(())
    }

    async fn compare_and_set_difficulty(
        &self,
        id: &QuestionId,
        expected: Option<Difficulty>,
        new: Difficulty,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        let question = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        if question.difficulty() != expected {
            return Ok(false);
        }
        question.set_difficulty(new, at);
        Ok(true)
    }
}

#[async_trait]
impl PracticeSessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        if guard.iter().any(|s| s.id() == session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<PracticeSession, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<PracticeSession>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        let mut all = guard.clone();
        // ties: latest insert first
        all.reverse();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }
}

#[async_trait]
impl WrongQuestionRepository for InMemoryRepository {
    async fn add_wrong_question(&self, entry: &WrongQuestion) -> Result<bool, StorageError> {
        let mut guard = self.wrong_questions.lock().map_err(poisoned)?;
        if guard.iter().any(|w| w.question_id() == entry.question_id()) {
            return Ok(false);
        }
        guard.push(entry.clone());
        Ok(true)
    }

    async fn list_wrong_questions(&self, limit: u32) -> Result<Vec<WrongQuestion>, StorageError> {
        let guard = self.wrong_questions.lock().map_err(poisoned)?;
        let mut all = guard.clone();
        all.reverse();
        all.sort_by(|a, b| b.added_at().cmp(&a.added_at()));
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn PracticeSessionRepository>,
    pub wrong_questions: Arc<dyn WrongQuestionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn PracticeSessionRepository> = Arc::new(repo.clone());
        let wrong_questions: Arc<dyn WrongQuestionRepository> = Arc::new(repo);
        Self {
            questions,
            sessions,
            wrong_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::PracticeSessionDraft;
    use quiz_core::time::fixed_now;
    use serde_json::json;

    fn build_question(id: &str, difficulty: Option<u8>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Prompt {id}"),
            "A",
            difficulty.map(|d| Difficulty::new(i64::from(d)).unwrap()),
            fixed_now(),
        )
        .unwrap()
    }

    fn build_session(id: &str, created_at: DateTime<Utc>) -> PracticeSession {
        PracticeSessionDraft {
            id: Some(SessionId::new(id)),
            group_id: None,
            mode: "practice".into(),
            start_time: fixed_now(),
            end_time: None,
            duration_secs: 30,
            total_questions: 1,
            correct_count: 1,
            details: json!([{ "questionId": "q1", "isCorrect": true }]),
        }
        .validate(created_at)
        .unwrap()
    }

    #[tokio::test]
    async fn difficulty_round_trips() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question("q1", None)).await.unwrap();

        let id = QuestionId::new("q1");
        assert_eq!(repo.get_difficulty(&id).await.unwrap(), None);

        let later = fixed_now() + Duration::minutes(1);
        repo.set_difficulty(&id, Difficulty::MAX, later).await.unwrap();
        assert_eq!(repo.get_difficulty(&id).await.unwrap(), Some(Difficulty::MAX));
        assert_eq!(repo.get_question(&id).await.unwrap().updated_at(), later);
    }

    #[tokio::test]
    async fn missing_question_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = QuestionId::new("ghost");
        assert!(matches!(
            repo.get_difficulty(&id).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.set_difficulty(&id, Difficulty::MIN, fixed_now()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn compare_and_set_detects_concurrent_write() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question("q1", Some(2))).await.unwrap();
        let id = QuestionId::new("q1");
        let two = Difficulty::new(2).unwrap();
        let four = Difficulty::new(4).unwrap();

        assert!(repo
            .compare_and_set_difficulty(&id, Some(two), four, fixed_now())
            .await
            .unwrap());
        // stale expectation loses
        assert!(!repo
            .compare_and_set_difficulty(&id, Some(two), Difficulty::MIN, fixed_now())
            .await
            .unwrap());
        assert_eq!(repo.get_difficulty(&id).await.unwrap(), Some(four));
    }

    #[tokio::test]
    async fn sessions_list_newest_first_and_reject_duplicates() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.insert_session(&build_session("old", now)).await.unwrap();
        repo.insert_session(&build_session("new", now + Duration::hours(1)))
            .await
            .unwrap();

        let listed = repo.list_sessions(10).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        assert!(matches!(
            repo.insert_session(&build_session("old", now)).await,
            Err(StorageError::Conflict)
        ));
        assert_eq!(repo.list_sessions(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_questions_are_listed_once_newest_first() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let first = WrongQuestion::from_session(QuestionId::new("q1"), now);
        let second = WrongQuestion::new(QuestionId::new("q2"), now + Duration::minutes(5));

        assert!(repo.add_wrong_question(&first).await.unwrap());
        assert!(repo.add_wrong_question(&second).await.unwrap());
        let relisted = WrongQuestion::new(QuestionId::new("q1"), now + Duration::hours(1));
        assert!(!repo.add_wrong_question(&relisted).await.unwrap());

        let listed = repo.list_wrong_questions(10).await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }
}
