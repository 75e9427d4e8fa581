//! Top-level error types for Letterbox.

use thiserror::Error;

use crate::schedule::ScheduleError;
use crate::token::RefreshError;

/// Top-level error type encompassing all Letterbox core errors.
#[derive(Debug, Error)]
pub enum LetterboxError {
    /// Error from the schedule codec.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Error from a credential refresh.
    #[error("refresh error: {0}")]
    Refresh(#[from] RefreshError),
}
