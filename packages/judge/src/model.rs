use chrono::{DateTime, Utc};
use common::{Aggregate, SubmissionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A submission row as seen by the judging core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i32,
    pub problem: String,
    /// `None` for anonymous submissions.
    pub user_name: Option<String>,
    pub source: String,
    pub lang: String,
    pub created_at: DateTime<Utc>,

    pub status: SubmissionStatus,
    /// Milliseconds; `None` until an attempt is committed.
    pub max_time: Option<i32>,
    /// Kilobytes; `None` until an attempt is committed.
    pub max_memory: Option<i64>,
    pub compile_error: Option<String>,
    /// Incremented by every rejudge. Results are tagged with it.
    pub judge_attempt: i32,
    /// Stale reclaims of the current attempt.
    pub requeue_count: i32,

    pub lease_id: Option<Uuid>,
    pub lease_owner: Option<String>,
    pub lease_deadline: Option<DateTime<Utc>>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// The lease currently recorded on the row, if the submission is being judged.
    pub fn current_lease(&self) -> Option<Lease> {
        if self.status != SubmissionStatus::Judging {
            return None;
        }
        match (&self.lease_id, &self.lease_owner, &self.lease_deadline) {
            (Some(lease_id), Some(owner), Some(deadline)) => Some(Lease {
                submission_id: self.id,
                attempt: self.judge_attempt,
                lease_id: *lease_id,
                worker_id: owner.clone(),
                deadline: *deadline,
            }),
            _ => None,
        }
    }
}

/// Fields supplied when a submission is created.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub problem: String,
    pub user_name: Option<String>,
    pub source: String,
    pub lang: String,
}

/// Exclusive right of one worker to judge one (submission, attempt) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub submission_id: i32,
    pub attempt: i32,
    /// Fresh per claim, so a zombie worker cannot act on a lease handed out again after a
    /// requeue of the same attempt.
    pub lease_id: Uuid,
    pub worker_id: String,
    pub deadline: DateTime<Utc>,
}

/// How a worker gives a lease back.
#[derive(Clone, Debug)]
pub enum ReleaseOutcome {
    /// The pass finished; commit its aggregate.
    Judged(Aggregate),
    /// The worker could not finish; treat like a stale lease.
    Failed { reason: String },
}

/// Result of releasing a lease or committing an aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The aggregate was written and the submission reached this terminal status.
    Committed(SubmissionStatus),
    /// The lease had already been superseded; nothing was written.
    Discarded,
    Requeued,
    /// Requeue budget exhausted; the submission ended as InternalError.
    Terminated,
}

/// Why a lease is being taken back from its holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequeueCause {
    /// The holder gave up on the pass.
    Failed,
    /// The holder stopped heartbeating. Only applies while the deadline is still in the past.
    Expired,
}

/// Result of reclaiming a single lease.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequeueOutcome {
    Requeued,
    Terminated,
    /// The lease was released or superseded in the meantime.
    Stale,
}

/// Summary of one stale lease sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequeueReport {
    pub requeued: usize,
    pub terminated: usize,
}

/// Result of a rejudge request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejudgeOutcome {
    /// The submission is waiting for judge again under this attempt number.
    Rearmed { attempt: i32 },
    /// It was already waiting; nothing changed.
    AlreadyPending { attempt: i32 },
}

impl RejudgeOutcome {
    pub fn attempt(&self) -> i32 {
        match self {
            Self::Rearmed { attempt } | Self::AlreadyPending { attempt } => *attempt,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub is_admin: bool,
    pub library_url: Option<String>,
}

/// Optional equality filters for submission listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub problem: Option<String>,
    pub user: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub lang: Option<String>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.problem
            .as_deref()
            .is_none_or(|p| submission.problem == p)
            && self
                .user
                .as_deref()
                .is_none_or(|u| submission.user_name.as_deref() == Some(u))
            && self.status.is_none_or(|s| submission.status == s)
            && self.lang.as_deref().is_none_or(|l| submission.lang == l)
    }
}

/// One page of a listing plus the total number of matching rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionPage {
    pub submissions: Vec<Submission>,
    pub count: u64,
}
