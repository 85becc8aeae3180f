use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, QuestionId, QuestionOutcome, SessionResult};

//
// ─── ACCURACY ──────────────────────────────────────────────────────────────────
//

/// Percentage of correct answers in a session, `correct / total * 100`.
///
/// Returns `None` for a session with no questions.
///
/// # Examples
///
/// ```
/// # use quiz_core::adjustment::accuracy_rate;
/// assert_eq!(accuracy_rate(4, 5), Some(80.0));
/// assert_eq!(accuracy_rate(0, 0), None);
/// ```
#[must_use]
pub fn accuracy_rate(correct_count: u32, total_questions: u32) -> Option<f64> {
    if total_questions == 0 {
        return None;
    }
    Some(f64::from(correct_count) / f64::from(total_questions) * 100.0)
}

//
// ─── TIERS ─────────────────────────────────────────────────────────────────────
//

/// Session-level performance band derived from the accuracy rate.
///
/// Bands are checked top-down and the first match wins:
/// - `Mastered`: rate `> 80` (strict)
/// - `Steady`: rate `>= 60`
/// - `Slipping`: rate `>= 40`
/// - `Struggling`: rate `>= 20`
/// - `Overwhelmed`: anything lower
///
/// Exactly `80.0` is `Steady`; exactly `60.0`, `40.0` and `20.0` land in the
/// band they open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    Mastered,
    Steady,
    Slipping,
    Struggling,
    Overwhelmed,
}

impl AccuracyTier {
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate > 80.0 {
            Self::Mastered
        } else if rate >= 60.0 {
            Self::Steady
        } else if rate >= 40.0 {
            Self::Slipping
        } else if rate >= 20.0 {
            Self::Struggling
        } else {
            Self::Overwhelmed
        }
    }

    /// Difficulty delta applied to every question unless overridden.
    #[must_use]
    pub fn base_adjustment(self) -> i8 {
        match self {
            AccuracyTier::Mastered => 1,
            AccuracyTier::Steady => 0,
            AccuracyTier::Slipping => -1,
            AccuracyTier::Struggling => -2,
            AccuracyTier::Overwhelmed => -3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccuracyTier::Mastered => "mastered",
            AccuracyTier::Steady => "steady",
            AccuracyTier::Slipping => "slipping",
            AccuracyTier::Struggling => "struggling",
            AccuracyTier::Overwhelmed => "overwhelmed",
        }
    }
}

/// Per-question delta: the base adjustment, except that
/// - a correct answer in a session at or below 60% never moves the question (0),
/// - a wrong answer in a session at or above 80% eases the question by one (-1).
///
/// The two cases need opposite correctness, so at most one applies.
#[must_use]
pub fn individual_adjustment(base: i8, rate: f64, is_correct: bool) -> i8 {
    if is_correct && rate <= 60.0 {
        0
    } else if !is_correct && rate >= 80.0 {
        -1
    } else {
        base
    }
}

//
// ─── PLAN ──────────────────────────────────────────────────────────────────────
//

/// One question's share of an adjustment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAdjustment {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub individual: i8,
}

impl PlannedAdjustment {
    /// Difficulty the question should move to from `current`.
    #[must_use]
    pub fn apply(&self, current: Option<Difficulty>) -> Difficulty {
        Difficulty::adjusted(current, self.individual)
    }
}

/// Session-wide parameters of an adjustment pass, computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentPlan {
    accuracy_rate: f64,
    tier: AccuracyTier,
}

impl AdjustmentPlan {
    /// Returns `None` when the session had no questions.
    #[must_use]
    pub fn for_session(result: &SessionResult) -> Option<Self> {
        Self::for_counts(result.correct_count(), result.total_questions())
    }

    #[must_use]
    pub fn for_counts(correct_count: u32, total_questions: u32) -> Option<Self> {
        let accuracy_rate = accuracy_rate(correct_count, total_questions)?;
        Some(Self {
            accuracy_rate,
            tier: AccuracyTier::from_rate(accuracy_rate),
        })
    }

    #[must_use]
    pub fn accuracy_rate(&self) -> f64 {
        self.accuracy_rate
    }

    #[must_use]
    pub fn tier(&self) -> AccuracyTier {
        self.tier
    }

    #[must_use]
    pub fn base_adjustment(&self) -> i8 {
        self.tier.base_adjustment()
    }

    #[must_use]
    pub fn plan(&self, outcome: &QuestionOutcome) -> PlannedAdjustment {
        PlannedAdjustment {
            question_id: outcome.question_id.clone(),
            is_correct: outcome.is_correct,
            individual: individual_adjustment(
                self.base_adjustment(),
                self.accuracy_rate,
                outcome.is_correct,
            ),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, is_correct: bool) -> QuestionOutcome {
        QuestionOutcome::new(QuestionId::new(id), is_correct)
    }

    #[test]
    fn tier_boundaries_are_exact() {
        let cases = [
            (100.0, AccuracyTier::Mastered, 1),
            (80.000_1, AccuracyTier::Mastered, 1),
            (80.0, AccuracyTier::Steady, 0),
            (60.0, AccuracyTier::Steady, 0),
            (59.999, AccuracyTier::Slipping, -1),
            (40.0, AccuracyTier::Slipping, -1),
            (39.999, AccuracyTier::Struggling, -2),
            (20.0, AccuracyTier::Struggling, -2),
            (19.999, AccuracyTier::Overwhelmed, -3),
            (0.0, AccuracyTier::Overwhelmed, -3),
        ];
        for (rate, tier, base) in cases {
            assert_eq!(AccuracyTier::from_rate(rate), tier, "rate {rate}");
            assert_eq!(tier.base_adjustment(), base, "rate {rate}");
        }
    }

    #[test]
    fn accuracy_rate_handles_zero_total() {
        assert_eq!(accuracy_rate(0, 0), None);
        assert_eq!(accuracy_rate(1, 10), Some(10.0));
        assert_eq!(accuracy_rate(3, 5), Some(60.0));
    }

    #[test]
    fn correct_answer_in_poor_session_is_held() {
        // 1/10 = 10% -> base -3, but the correct one stays put
        let plan = AdjustmentPlan::for_counts(1, 10).unwrap();
        assert_eq!(plan.base_adjustment(), -3);
        assert_eq!(plan.plan(&outcome("hit", true)).individual, 0);
        assert_eq!(plan.plan(&outcome("miss", false)).individual, -3);
    }

    #[test]
    fn correct_answer_at_sixty_percent_is_held() {
        let plan = AdjustmentPlan::for_counts(3, 5).unwrap();
        assert_eq!(plan.tier(), AccuracyTier::Steady);
        assert_eq!(plan.plan(&outcome("hit", true)).individual, 0);
        assert_eq!(plan.plan(&outcome("miss", false)).individual, 0);
    }

    #[test]
    fn wrong_answer_in_strong_session_is_eased() {
        // 9/10 = 90% -> base +1, the miss goes the other way
        let plan = AdjustmentPlan::for_counts(9, 10).unwrap();
        assert_eq!(plan.base_adjustment(), 1);
        assert_eq!(plan.plan(&outcome("miss", false)).individual, -1);
        assert_eq!(plan.plan(&outcome("hit", true)).individual, 1);
    }

    #[test]
    fn wrong_answer_at_exactly_eighty_percent_is_eased() {
        let plan = AdjustmentPlan::for_counts(4, 5).unwrap();
        assert_eq!(plan.accuracy_rate(), 80.0);
        assert_eq!(plan.base_adjustment(), 0);
        assert_eq!(plan.plan(&outcome("hit", true)).individual, 0);
        assert_eq!(plan.plan(&outcome("miss", false)).individual, -1);
    }

    #[test]
    fn middle_bands_use_base_for_wrong_answers() {
        let plan = AdjustmentPlan::for_counts(1, 4).unwrap();
        assert_eq!(plan.tier(), AccuracyTier::Struggling);
        assert_eq!(plan.plan(&outcome("miss", false)).individual, -2);
    }

    #[test]
    fn apply_uses_baseline_for_unscored_questions() {
        let plan = AdjustmentPlan::for_counts(7, 10).unwrap();
        let planned = plan.plan(&outcome("new", true));
        assert_eq!(planned.apply(None).value(), 3);
    }

    #[test]
    fn end_to_end_eighty_percent_scenario() {
        let plan = AdjustmentPlan::for_counts(4, 5).unwrap();
        let two = Difficulty::new(2).unwrap();
        assert_eq!(plan.plan(&outcome("hit", true)).apply(Some(two)).value(), 2);
        assert_eq!(plan.plan(&outcome("miss", false)).apply(Some(two)).value(), 1);
    }
}
