use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use quiz_core::{
    adjustment::{AccuracyTier, AdjustmentPlan, PlannedAdjustment},
    model::{Difficulty, MalformedEntry, ParsedSessionResult, QuestionId, SessionResult},
    time::Clock,
};
use storage::repository::{QuestionRepository, StorageError};

/// Attempts per question before a concurrent writer is reported as a conflict.
const MAX_WRITE_ATTEMPTS: u32 = 3;

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// A difficulty that was persisted for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyChange {
    pub question_id: QuestionId,
    pub previous: Option<Difficulty>,
    pub current: Difficulty,
    pub individual_adjustment: i8,
}

/// Something the pass could not apply. None of these are fatal.
#[derive(Debug)]
pub enum SkippedEntry {
    /// A `questions` entry without a usable `questionId` / `isCorrect`.
    Malformed { index: usize, reason: MalformedEntry },
    /// The current difficulty could not be read.
    Read {
        question_id: QuestionId,
        error: StorageError,
    },
    /// The new difficulty could not be written.
    Write {
        question_id: QuestionId,
        error: StorageError,
    },
}

impl SkippedEntry {
    fn log(&self) {
        match self {
            SkippedEntry::Malformed { index, reason } => warn!(
                index = *index,
                reason = %reason,
                "skipping malformed question entry"
            ),
            SkippedEntry::Read { question_id, error } => warn!(
                question_id = %question_id,
                error = %error,
                "failed to read question difficulty; skipping"
            ),
            SkippedEntry::Write { question_id, error } => warn!(
                question_id = %question_id,
                error = %error,
                "failed to persist question difficulty; skipping"
            ),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> Option<&QuestionId> {
        match self {
            SkippedEntry::Malformed { .. } => None,
            SkippedEntry::Read { question_id, .. } | SkippedEntry::Write { question_id, .. } => {
                Some(question_id)
            }
        }
    }
}

/// What one adjustment pass touched.
#[derive(Debug, Default)]
pub struct AdjustmentReport {
    /// `None` when the session had no questions and nothing was done.
    pub accuracy_rate: Option<f64>,
    pub tier: Option<AccuracyTier>,
    pub applied: Vec<DifficultyChange>,
    pub skipped: Vec<SkippedEntry>,
}

impl AdjustmentReport {
    fn for_plan(plan: &AdjustmentPlan) -> Self {
        Self {
            accuracy_rate: Some(plan.accuracy_rate()),
            tier: Some(plan.tier()),
            applied: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// IDs of questions that were identified but not updated.
    #[must_use]
    pub fn skipped_ids(&self) -> Vec<&QuestionId> {
        self.skipped
            .iter()
            .filter_map(SkippedEntry::question_id)
            .collect()
    }

    #[must_use]
    pub fn change_for(&self, id: &QuestionId) -> Option<&DifficultyChange> {
        self.applied.iter().find(|c| &c.question_id == id)
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies session results to question difficulties.
///
/// Every failure is absorbed into the returned report and logged; callers
/// never see an error from this service.
#[derive(Clone)]
pub struct DifficultyService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
}

impl DifficultyService {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { clock, questions }
    }

    /// Run one adjustment pass over a decoded session result.
    ///
    /// A session with zero questions returns an empty report without touching
    /// the store or emitting any log event.
    pub async fn adjust_difficulties(&self, result: &SessionResult) -> AdjustmentReport {
        let Some(plan) = AdjustmentPlan::for_session(result) else {
            return AdjustmentReport::default();
        };

        info!(
            accuracy_rate = plan.accuracy_rate(),
            tier = plan.tier().as_str(),
            base_adjustment = plan.base_adjustment(),
            questions = result.outcomes().len(),
            "adjusting question difficulties"
        );

        let mut report = AdjustmentReport::for_plan(&plan);
        for outcome in result.outcomes() {
            let planned = plan.plan(outcome);
            match self.apply(&planned).await {
                Ok(change) => {
                    info!(
                        question_id = %change.question_id,
                        previous = %change.previous.map_or_else(|| "absent".to_owned(), |d| d.to_string()),
                        current = change.current.value(),
                        accuracy_rate = plan.accuracy_rate(),
                        individual_adjustment = change.individual_adjustment,
                        "question difficulty updated"
                    );
                    report.applied.push(change);
                }
                Err(skipped) => {
                    skipped.log();
                    report.skipped.push(skipped);
                }
            }
        }
        report
    }

    /// Decode a raw `questions` payload and run the pass.
    ///
    /// Returns `None` if the payload is unusable as a whole (not an array, or
    /// counts that do not add up); the pass is then aborted with a warning.
    /// Individual malformed entries are skipped and listed in the report.
    pub async fn adjust_from_details(
        &self,
        total_questions: u32,
        correct_count: u32,
        details: &Value,
    ) -> Option<AdjustmentReport> {
        if total_questions == 0 {
            return Some(AdjustmentReport::default());
        }

        match SessionResult::from_details(total_questions, correct_count, details) {
            Ok(parsed) => Some(self.adjust_parsed(&parsed).await),
            Err(err) => {
                warn!(error = %err, "failed to parse session details; difficulty adjustment aborted");
                None
            }
        }
    }

    /// Run the pass over an already decoded payload.
    ///
    /// Entries rejected while decoding are logged and reported ahead of any
    /// store failures.
    pub async fn adjust_parsed(&self, parsed: &ParsedSessionResult) -> AdjustmentReport {
        if parsed.result.total_questions() == 0 {
            return AdjustmentReport::default();
        }

        let mut skipped: Vec<SkippedEntry> = parsed
            .rejected
            .iter()
            .map(|r| SkippedEntry::Malformed {
                index: r.index,
                reason: r.reason.clone(),
            })
            .collect();
        for entry in &skipped {
            entry.log();
        }

        let mut report = self.adjust_difficulties(&parsed.result).await;
        skipped.append(&mut report.skipped);
        report.skipped = skipped;
        report
    }

    async fn apply(&self, planned: &PlannedAdjustment) -> Result<DifficultyChange, SkippedEntry> {
        let id = &planned.question_id;
        let mut attempt = 1;
        loop {
            let previous =
                self.questions
                    .get_difficulty(id)
                    .await
                    .map_err(|error| SkippedEntry::Read {
                        question_id: id.clone(),
                        error,
                    })?;
            let current = planned.apply(previous);

            let written = self
                .questions
                .compare_and_set_difficulty(id, previous, current, self.clock.now())
                .await
                .map_err(|error| SkippedEntry::Write {
                    question_id: id.clone(),
                    error,
                })?;

            if written {
                return Ok(DifficultyChange {
                    question_id: id.clone(),
                    previous,
                    current,
                    individual_adjustment: planned.individual,
                });
            }
            if attempt >= MAX_WRITE_ATTEMPTS {
                return Err(SkippedEntry::Write {
                    question_id: id.clone(),
                    error: StorageError::Conflict,
                });
            }
            debug!(question_id = %id, attempt, "difficulty changed concurrently; retrying");
            attempt += 1;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
