use std::sync::Arc;

use tracing::{info, warn};

use quiz_core::{
    model::{PracticeSession, PracticeSessionDraft, QuestionId, SessionResult, WrongQuestion},
    time::Clock,
};
use storage::repository::{PracticeSessionRepository, WrongQuestionRepository};

use crate::difficulty_service::{AdjustmentReport, DifficultyService};
use crate::error::SessionServiceError;

/// What the post-save steps did for one session.
#[derive(Debug, Default)]
pub struct SessionFollowUp {
    /// `None` if the per-question payload could not be decoded.
    pub adjustment: Option<AdjustmentReport>,
    /// Questions newly put on the wrong-question list.
    pub wrong_questions_added: Vec<QuestionId>,
}

/// A saved session and what its post-save steps did.
#[derive(Debug)]
pub struct SubmittedSession {
    pub session: PracticeSession,
    pub adjustment: Option<AdjustmentReport>,
    pub wrong_questions_added: Vec<QuestionId>,
}

/// Saves completed practice sessions and runs the follow-up steps.
#[derive(Clone)]
pub struct PracticeSessionService {
    clock: Clock,
    sessions: Arc<dyn PracticeSessionRepository>,
    wrong_questions: Arc<dyn WrongQuestionRepository>,
    difficulty: DifficultyService,
}

impl PracticeSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn PracticeSessionRepository>,
        wrong_questions: Arc<dyn WrongQuestionRepository>,
        difficulty: DifficultyService,
    ) -> Self {
        Self {
            clock,
            sessions,
            wrong_questions,
            difficulty,
        }
    }

    /// Validate and persist a completed session, then run the follow-up steps.
    ///
    /// The session is saved first. Difficulty adjustment and wrong-question
    /// recording run afterwards and can only degrade to "some questions were
    /// not updated"; they never turn a successful save into an error.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError` if the draft is invalid or the session
    /// cannot be stored.
    pub async fn submit(
        &self,
        draft: PracticeSessionDraft,
    ) -> Result<SubmittedSession, SessionServiceError> {
        let session = draft.validate(self.clock.now())?;
        self.sessions.insert_session(&session).await?;

        info!(
            session_id = %session.id(),
            mode = session.mode(),
            total_questions = session.total_questions(),
            correct_count = session.correct_count(),
            "practice session saved"
        );

        let SessionFollowUp {
            adjustment,
            wrong_questions_added,
        } = self.on_session_completed(&session).await;
        Ok(SubmittedSession {
            session,
            adjustment,
            wrong_questions_added,
        })
    }

    /// Run the follow-up steps for a session that is already persisted.
    ///
    /// A session with zero questions is a no-op. A payload that cannot be
    /// decoded aborts both steps with a warning.
    pub async fn on_session_completed(&self, session: &PracticeSession) -> SessionFollowUp {
        if session.total_questions() == 0 {
            return SessionFollowUp {
                adjustment: Some(AdjustmentReport::default()),
                wrong_questions_added: Vec::new(),
            };
        }

        let parsed = match session.result() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    session_id = %session.id(),
                    error = %err,
                    "failed to parse session details; follow-up steps aborted"
                );
                return SessionFollowUp::default();
            }
        };

        let adjustment = self.difficulty.adjust_parsed(&parsed).await;
        let wrong_questions_added = self.record_wrong_answers(&parsed.result).await;
        SessionFollowUp {
            adjustment: Some(adjustment),
            wrong_questions_added,
        }
    }

    /// Put every incorrectly answered question on the wrong-question list.
    ///
    /// Questions already listed are left alone. Store errors are logged and
    /// skip only that question.
    async fn record_wrong_answers(&self, result: &SessionResult) -> Vec<QuestionId> {
        let now = self.clock.now();
        let mut added = Vec::new();
        for outcome in result.outcomes().iter().filter(|o| !o.is_correct) {
            let entry = WrongQuestion::from_session(outcome.question_id.clone(), now);
            match self.wrong_questions.add_wrong_question(&entry).await {
                Ok(true) => {
                    info!(question_id = %outcome.question_id, "question added to wrong-question list");
                    added.push(outcome.question_id.clone());
                }
                Ok(false) => {}
                Err(error) => warn!(
                    question_id = %outcome.question_id,
                    error = %error,
                    "failed to record wrong answer; skipping"
                ),
            }
        }
        added
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` on backend failures.
    pub async fn history(&self, limit: u32) -> Result<Vec<PracticeSession>, SessionServiceError> {
        Ok(self.sessions.list_sessions(limit).await?)
    }

    /// Most recently listed wrong questions first.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` on backend failures.
    pub async fn wrong_questions(
        &self,
        limit: u32,
    ) -> Result<Vec<WrongQuestion>, SessionServiceError> {
        Ok(self.wrong_questions.list_wrong_questions(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Difficulty, PracticeSessionError, Question, QuestionId, SessionId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use serde_json::{Value, json};
    use storage::repository::{InMemoryRepository, QuestionRepository, StorageError};

    fn build(repo: &InMemoryRepository) -> PracticeSessionService {
        let difficulty = DifficultyService::new(fixed_clock(), Arc::new(repo.clone()));
        PracticeSessionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            difficulty,
        )
    }

    /// Wrong-question store that refuses one question and delegates the rest.
    struct FlakyWrongQuestions {
        inner: InMemoryRepository,
        refuse: QuestionId,
    }

    #[async_trait::async_trait]
    impl WrongQuestionRepository for FlakyWrongQuestions {
        async fn add_wrong_question(&self, entry: &WrongQuestion) -> Result<bool, StorageError> {
            if entry.question_id() == &self.refuse {
                return Err(StorageError::Connection("refused".into()));
            }
            self.inner.add_wrong_question(entry).await
        }

        async fn list_wrong_questions(
            &self,
            limit: u32,
        ) -> Result<Vec<WrongQuestion>, StorageError> {
            self.inner.list_wrong_questions(limit).await
        }
    }

    fn draft(id: &str, total: u32, correct: u32, details: Value) -> PracticeSessionDraft {
        PracticeSessionDraft {
            id: Some(SessionId::new(id)),
            group_id: None,
            mode: "practice".into(),
            start_time: fixed_now() - Duration::minutes(5),
            end_time: Some(fixed_now()),
            duration_secs: 300,
            total_questions: total,
            correct_count: correct,
            details,
        }
    }

    async fn seed(repo: &InMemoryRepository, id: &str, difficulty: Option<i64>) {
        let q = Question::new(
            QuestionId::new(id),
            "Q",
            "A",
            difficulty.map(|d| Difficulty::new(d).unwrap()),
            fixed_now(),
        )
        .unwrap();
        repo.upsert_question(&q).await.unwrap();
    }

    #[tokio::test]
    async fn submit_saves_then_adjusts() {
        let repo = InMemoryRepository::new();
        seed(&repo, "q1", Some(2)).await;
        let svc = build(&repo);

        let submitted = svc
            .submit(draft(
                "s1",
                1,
                1,
                json!([{ "questionId": "q1", "isCorrect": true }]),
            ))
            .await
            .unwrap();

        // 100% -> +1
        let report = submitted.adjustment.unwrap();
        assert_eq!(report.applied_count(), 1);
        assert_eq!(
            repo.get_difficulty(&QuestionId::new("q1")).await.unwrap(),
            Some(Difficulty::new(3).unwrap())
        );
        assert_eq!(svc.history(10).await.unwrap().len(), 1);
        assert_eq!(submitted.session.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn malformed_details_do_not_fail_the_save() {
        let repo = InMemoryRepository::new();
        let svc = build(&repo);

        let submitted = svc
            .submit(draft("s1", 3, 1, json!("not a list")))
            .await
            .unwrap();

        assert!(submitted.adjustment.is_none());
        assert!(submitted.wrong_questions_added.is_empty());
        let history = svc.history(10).await.unwrap();
        assert_eq!(history[0].id(), &SessionId::new("s1"));
    }

    #[tokio::test]
    async fn incorrect_answers_are_listed_once() {
        let repo = InMemoryRepository::new();
        seed(&repo, "q1", Some(3)).await;
        seed(&repo, "q2", Some(3)).await;
        let svc = build(&repo);

        let details = json!([
            { "questionId": "q1", "isCorrect": false },
            { "questionId": "q2", "isCorrect": true },
            { "questionId": "q1", "isCorrect": false },
        ]);
        let first = svc.submit(draft("s1", 3, 1, details.clone())).await.unwrap();
        assert_eq!(first.wrong_questions_added, vec![QuestionId::new("q1")]);

        let second = svc.submit(draft("s2", 3, 1, details)).await.unwrap();
        assert!(second.wrong_questions_added.is_empty());

        let listed = svc.wrong_questions(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].question_id(), &QuestionId::new("q1"));
        assert_eq!(listed[0].notes(), Some(WrongQuestion::FROM_SESSION_NOTE));
    }

    #[tokio::test]
    async fn wrong_question_store_errors_do_not_fail_the_save() {
        let repo = InMemoryRepository::new();
        seed(&repo, "q1", Some(3)).await;
        seed(&repo, "q2", Some(3)).await;
        let difficulty = DifficultyService::new(fixed_clock(), Arc::new(repo.clone()));
        let svc = PracticeSessionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(FlakyWrongQuestions {
                inner: repo.clone(),
                refuse: QuestionId::new("q1"),
            }),
            difficulty,
        );

        let submitted = svc
            .submit(draft(
                "s1",
                2,
                0,
                json!([
                    { "questionId": "q1", "isCorrect": false },
                    { "questionId": "q2", "isCorrect": false }
                ]),
            ))
            .await
            .unwrap();

        assert_eq!(submitted.wrong_questions_added, vec![QuestionId::new("q2")]);
        assert_eq!(submitted.adjustment.unwrap().applied_count(), 2);
        assert_eq!(svc.history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_questions_do_not_fail_the_save() {
        let repo = InMemoryRepository::new();
        let svc = build(&repo);

        let submitted = svc
            .submit(draft(
                "s1",
                1,
                0,
                json!([{ "questionId": "ghost", "isCorrect": false }]),
            ))
            .await
            .unwrap();

        let report = submitted.adjustment.unwrap();
        assert_eq!(report.applied_count(), 0);
        assert_eq!(report.skipped_ids(), vec![&QuestionId::new("ghost")]);
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_saving() {
        let repo = InMemoryRepository::new();
        let svc = build(&repo);

        let err = svc.submit(draft("s1", 1, 2, json!([]))).await.unwrap_err();
        assert!(matches!(
            err,
            SessionServiceError::Session(PracticeSessionError::CountMismatch { .. })
        ));
        assert!(svc.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_session_is_a_storage_error_and_skips_adjustment() {
        let repo = InMemoryRepository::new();
        seed(&repo, "q1", Some(3)).await;
        let svc = build(&repo);
        let details = json!([{ "questionId": "q1", "isCorrect": false }]);

        svc.submit(draft("s1", 1, 0, details.clone())).await.unwrap();
        let after_first = repo.get_difficulty(&QuestionId::new("q1")).await.unwrap();

        let err = svc.submit(draft("s1", 1, 0, details)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionServiceError::Storage(StorageError::Conflict)
        ));
        assert_eq!(
            repo.get_difficulty(&QuestionId::new("q1")).await.unwrap(),
            after_first
        );
    }
}
