use common::Capability;
use tracing::info;

use crate::error::{JudgeError, StoreError};
use crate::model::RejudgeOutcome;
use crate::store::SubmissionStore;

/// Re-arm a submission for another judging pass.
///
/// Only administrators may rejudge. Authorization is checked before the submission is looked
/// up, so callers without the capability learn nothing about which ids exist.
#[tracing::instrument(skip(store, capability), fields(admin = capability.is_admin()))]
pub async fn rejudge<S>(
    store: &S,
    submission_id: i32,
    capability: &Capability,
) -> Result<RejudgeOutcome, JudgeError>
where
    S: SubmissionStore + ?Sized,
{
    if !capability.is_admin() {
        return Err(JudgeError::PermissionDenied(
            "Only administrators can rejudge submissions".into(),
        ));
    }

    let outcome = store.rejudge(submission_id).await.map_err(|e| match e {
        StoreError::SubmissionNotFound(id) => {
            JudgeError::NotFound(format!("Submission {id} not found"))
        }
        other => other.into(),
    })?;

    let attempt = outcome.attempt();
    match outcome {
        RejudgeOutcome::Rearmed { .. } => {
            info!(submission_id, attempt, by = ?capability.user_name(), "Rejudge queued")
        }
        RejudgeOutcome::AlreadyPending { .. } => {
            info!(submission_id, attempt, "Rejudge ignored, already waiting")
        }
    }
    Ok(outcome)
}
