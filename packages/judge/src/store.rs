//! Transactional store interfaces consumed by the judging core.
//!
//! Every method is atomic on its own: state transitions are compare-and-swap updates that
//! either apply completely or report that the row had moved on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Aggregate, Problem, TestCaseResult};
use uuid::Uuid;

use crate::error::StoreError;
use crate::listing::ListQuery;
use crate::model::{
    Lease, NewSubmission, RejudgeOutcome, RequeueCause, RequeueOutcome, Submission,
    SubmissionPage, User,
};

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a submission in `WaitingJudge` with attempt 1.
    async fn create_submission(
        &self,
        new: NewSubmission,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError>;

    async fn get_submission(&self, id: i32) -> Result<Option<Submission>, StoreError>;

    async fn list_submissions(&self, query: &ListQuery) -> Result<SubmissionPage, StoreError>;

    /// `(id, judge_attempt)` of the oldest waiting submissions, oldest first.
    async fn claim_candidates(&self, limit: u64) -> Result<Vec<(i32, i32)>, StoreError>;

    /// `WaitingJudge -> Judging` for exactly this attempt. [`StoreError::Conflict`] when the
    /// row is no longer waiting under that attempt.
    async fn try_claim(
        &self,
        id: i32,
        attempt: i32,
        lease_id: Uuid,
        worker_id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Lease, StoreError>;

    /// Push the lease deadline forward. [`StoreError::LeaseLost`] when the lease is not
    /// current.
    async fn extend_lease(&self, lease: &Lease, deadline: DateTime<Utc>)
    -> Result<(), StoreError>;

    /// Upsert one result keyed by (submission, attempt, case name), only under a current
    /// lease.
    async fn put_result(&self, lease: &Lease, result: &TestCaseResult) -> Result<(), StoreError>;

    /// Results recorded for one attempt, ordered by case name.
    async fn results(&self, id: i32, attempt: i32) -> Result<Vec<TestCaseResult>, StoreError>;

    /// Write the aggregate and terminal status if the lease is still current. Returns false
    /// when the lease was superseded and nothing was written.
    async fn commit(
        &self,
        lease: &Lease,
        aggregate: &Aggregate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Return a leased submission to `WaitingJudge` without advancing the attempt, or
    /// terminate it as InternalError once `max_requeues` reclaims have been spent.
    ///
    /// With [`RequeueCause::Expired`] the lease deadline must still be before `now` when the
    /// update applies; a lease extended since it was read reports `Stale`.
    async fn requeue(
        &self,
        lease: &Lease,
        cause: RequeueCause,
        max_requeues: i32,
        now: DateTime<Utc>,
    ) -> Result<RequeueOutcome, StoreError>;

    /// Leases whose deadline is before `now`.
    async fn expired_leases(&self, now: DateTime<Utc>) -> Result<Vec<Lease>, StoreError>;

    /// Advance the attempt of a finished or in-flight submission and put it back in the queue.
    async fn rejudge(&self, id: i32) -> Result<RejudgeOutcome, StoreError>;
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn get_problem(&self, name: &str) -> Result<Option<Problem>, StoreError>;

    /// All problems ordered by name.
    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError>;

    /// Insert or replace a problem.
    async fn save_problem(&self, problem: &Problem) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, name: &str) -> Result<Option<User>, StoreError>;

    /// Insert or replace a user.
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
}

/// Everything the front end and workers need from persistence.
pub trait Store: SubmissionStore + ProblemStore + UserStore {}

impl<T: SubmissionStore + ProblemStore + UserStore> Store for T {}
