use chrono::Utc;
use common::{Capability, LanguageRegistry};
use tracing::info;

use crate::error::JudgeError;
use crate::model::{NewSubmission, Submission};
use crate::store::{ProblemStore, Store, SubmissionStore};

/// Default cap on source size, in bytes.
pub const DEFAULT_MAX_SOURCE_SIZE: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub problem: String,
    pub source: String,
    pub lang: String,
}

/// Validate a submission and enqueue it in `WaitingJudge`.
///
/// Every check runs before the insert, so a rejected request leaves no row behind.
#[tracing::instrument(skip_all, fields(problem = %req.problem, lang = %req.lang))]
pub async fn submit<S>(
    store: &S,
    langs: &LanguageRegistry,
    max_source_size: usize,
    capability: &Capability,
    req: SubmitRequest,
) -> Result<Submission, JudgeError>
where
    S: Store + ?Sized,
{
    if req.source.is_empty() {
        return Err(JudgeError::InvalidArgument("Source is empty".into()));
    }
    if req.source.len() > max_source_size {
        return Err(JudgeError::InvalidArgument(format!(
            "Source is too large ({} bytes, limit {max_source_size})",
            req.source.len()
        )));
    }
    if !langs.contains(&req.lang) {
        return Err(JudgeError::InvalidArgument(format!(
            "Unknown language '{}'",
            req.lang
        )));
    }
    if store.get_problem(&req.problem).await?.is_none() {
        return Err(JudgeError::NotFound(format!(
            "Problem '{}' not found",
            req.problem
        )));
    }

    let submission = store
        .create_submission(
            NewSubmission {
                problem: req.problem,
                user_name: capability.user_name().map(str::to_string),
                source: req.source,
                lang: req.lang,
            },
            Utc::now(),
        )
        .await?;

    info!(
        submission_id = submission.id,
        user = ?submission.user_name,
        "Submission queued"
    );
    Ok(submission)
}
