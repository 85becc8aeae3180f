use thiserror::Error;

use crate::model::{
    DifficultyError, PracticeSessionError, QuestionError, SessionResultError,
};

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] PracticeSessionError),
    #[error(transparent)]
    SessionResult(#[from] SessionResultError),
}
