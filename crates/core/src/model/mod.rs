mod difficulty;
mod ids;
mod question;
mod result;
mod session;
mod wrong_question;

pub use ids::{ParseIdError, QuestionId, SessionId};

pub use difficulty::{Difficulty, DifficultyError};
pub use question::{Question, QuestionError};
pub use result::{
    MalformedEntry, ParsedSessionResult, QuestionOutcome, RejectedEntry, SessionResult,
    SessionResultError,
};
pub use session::{PracticeSession, PracticeSessionDraft, PracticeSessionError};
pub use wrong_question::WrongQuestion;
