use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A compare-and-swap transition found the row in a different state.
    #[error("Submission {0} changed concurrently")]
    Conflict(i32),

    /// The lease presented by a worker is no longer the current one.
    #[error("Lease on submission {submission_id} (attempt {attempt}) is no longer current")]
    LeaseLost { submission_id: i32, attempt: i32 },

    #[error("Submission {0} not found")]
    SubmissionNotFound(i32),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Error taxonomy of the judging core.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    /// Lost a race on a submission; the caller may retry with fresh state.
    #[error("{0}")]
    Conflict(String),

    #[error("Lease on submission {submission_id} (attempt {attempt}) is no longer current")]
    LeaseLost { submission_id: i32, attempt: i32 },

    /// Transient storage failure; safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl JudgeError {
    /// True for errors that leave no state behind and may be retried as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Conflict(_))
    }
}

impl From<StoreError> for JudgeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(id) => {
                JudgeError::Conflict(format!("Submission {id} changed concurrently"))
            }
            StoreError::LeaseLost {
                submission_id,
                attempt,
            } => JudgeError::LeaseLost {
                submission_id,
                attempt,
            },
            StoreError::SubmissionNotFound(id) => {
                JudgeError::NotFound(format!("Submission {id} not found"))
            }
            StoreError::Database(e) => JudgeError::Unavailable(e.to_string()),
            StoreError::Corrupt(msg) => JudgeError::Unavailable(msg),
        }
    }
}
