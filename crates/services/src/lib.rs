#![forbid(unsafe_code)]

pub mod app_services;
pub mod difficulty_service;
pub mod error;
pub mod practice_session_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use difficulty_service::{AdjustmentReport, DifficultyChange, DifficultyService, SkippedEntry};
pub use error::{AppServicesError, SessionServiceError};
pub use practice_session_service::{PracticeSessionService, SessionFollowUp, SubmittedSession};
