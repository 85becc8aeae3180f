use std::sync::Arc;

use storage::repository::{QuestionRepository, Storage};

use crate::Clock;
use crate::difficulty_service::DifficultyService;
use crate::error::AppServicesError;
use crate::practice_session_service::PracticeSessionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    questions: Arc<dyn QuestionRepository>,
    practice_sessions: Arc<PracticeSessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let difficulty = DifficultyService::new(clock, Arc::clone(&storage.questions));
        let practice_sessions = Arc::new(PracticeSessionService::new(
            clock,
            storage.sessions,
            storage.wrong_questions,
            difficulty,
        ));

        Self {
            questions: storage.questions,
            practice_sessions,
        }
    }

    #[must_use]
    pub fn questions(&self) -> Arc<dyn QuestionRepository> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn practice_sessions(&self) -> Arc<PracticeSessionService> {
        Arc::clone(&self.practice_sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Difficulty, PracticeSessionDraft, Question, QuestionId};
    use quiz_core::time::fixed_now;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_services_share_one_store() {
        let services = AppServices::in_memory(Clock::fixed(fixed_now()));
        let question = Question::new(
            QuestionId::new("q1"),
            "Q",
            "A",
            Some(Difficulty::new(4).unwrap()),
            fixed_now(),
        )
        .unwrap();
        services.questions().upsert_question(&question).await.unwrap();

        let draft: PracticeSessionDraft = serde_json::from_value(json!({
            "id": "s1",
            "startTime": "2023-11-14T22:00:00Z",
            "totalQuestions": 1,
            "correctCount": 0,
            "questions": [{ "questionId": "q1", "isCorrect": false }],
        }))
        .unwrap();
        services.practice_sessions().submit(draft).await.unwrap();

        // 0% -> -3
        assert_eq!(
            services
                .questions()
                .get_difficulty(&QuestionId::new("q1"))
                .await
                .unwrap(),
            Some(Difficulty::MIN)
        );
        let wrong = services.practice_sessions().wrong_questions(10).await.unwrap();
        assert_eq!(wrong[0].question_id(), &QuestionId::new("q1"));
    }
}
