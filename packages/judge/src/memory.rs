//! In-process store used by tests and single-node development setups.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Aggregate, Problem, SubmissionStatus, TestCaseResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::listing::ListQuery;
use crate::model::{
    Lease, NewSubmission, RejudgeOutcome, RequeueCause, RequeueOutcome, Submission,
    SubmissionPage, User,
};
use crate::store::{ProblemStore, SubmissionStore, UserStore};

#[derive(Default)]
struct Inner {
    next_id: i32,
    submissions: BTreeMap<i32, Submission>,
    /// Keyed by (submission id, attempt, case name).
    results: BTreeMap<(i32, i32, String), TestCaseResult>,
    problems: BTreeMap<String, Problem>,
    users: BTreeMap<String, User>,
}

impl Inner {
    /// The submission row if `lease` is still the current lease on it.
    fn leased_mut(&mut self, lease: &Lease) -> Option<&mut Submission> {
        self.submissions
            .get_mut(&lease.submission_id)
            .filter(|s| is_current(s, lease))
    }
}

fn is_current(submission: &Submission, lease: &Lease) -> bool {
    submission.status == SubmissionStatus::Judging
        && submission.judge_attempt == lease.attempt
        && submission.lease_id == Some(lease.lease_id)
}

fn clear_lease(submission: &mut Submission) {
    submission.lease_id = None;
    submission.lease_owner = None;
    submission.lease_deadline = None;
}

/// Store backed by ordered maps behind a single async mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(
        &self,
        new: NewSubmission,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let submission = Submission {
            id: inner.next_id,
            problem: new.problem,
            user_name: new.user_name,
            source: new.source,
            lang: new.lang,
            created_at: now,
            status: SubmissionStatus::WaitingJudge,
            max_time: None,
            max_memory: None,
            compile_error: None,
            judge_attempt: 1,
            requeue_count: 0,
            lease_id: None,
            lease_owner: None,
            lease_deadline: None,
            judged_at: None,
        };
        inner.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: i32) -> Result<Option<Submission>, StoreError> {
        Ok(self.inner.lock().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(&self, query: &ListQuery) -> Result<SubmissionPage, StoreError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<&Submission> = inner
            .submissions
            .values()
            .filter(|s| query.filter.matches(s))
            .collect();
        let count = rows.len() as u64;
        rows.sort_by(|a, b| query.order.compare(a, b));
        let submissions = rows
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(SubmissionPage { submissions, count })
    }

    async fn claim_candidates(&self, limit: u64) -> Result<Vec<(i32, i32)>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .submissions
            .values()
            .filter(|s| s.status == SubmissionStatus::WaitingJudge)
            .take(limit as usize)
            .map(|s| (s.id, s.judge_attempt))
            .collect())
    }

    async fn try_claim(
        &self,
        id: i32,
        attempt: i32,
        lease_id: Uuid,
        worker_id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Lease, StoreError> {
        let mut inner = self.inner.lock().await;
        let submission = inner
            .submissions
            .get_mut(&id)
            .filter(|s| s.status == SubmissionStatus::WaitingJudge && s.judge_attempt == attempt)
            .ok_or(StoreError::Conflict(id))?;

        submission.status = SubmissionStatus::Judging;
        submission.lease_id = Some(lease_id);
        submission.lease_owner = Some(worker_id.to_string());
        submission.lease_deadline = Some(deadline);

        Ok(Lease {
            submission_id: id,
            attempt,
            lease_id,
            worker_id: worker_id.to_string(),
            deadline,
        })
    }

    async fn extend_lease(
        &self,
        lease: &Lease,
        deadline: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let submission = inner.leased_mut(lease).ok_or(StoreError::LeaseLost {
            submission_id: lease.submission_id,
            attempt: lease.attempt,
        })?;
        submission.lease_deadline = Some(deadline);
        Ok(())
    }

    async fn put_result(&self, lease: &Lease, result: &TestCaseResult) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.leased_mut(lease).is_none() {
            return Err(StoreError::LeaseLost {
                submission_id: lease.submission_id,
                attempt: lease.attempt,
            });
        }
        inner.results.insert(
            (lease.submission_id, lease.attempt, result.name.clone()),
            result.clone(),
        );
        Ok(())
    }

    async fn results(&self, id: i32, attempt: i32) -> Result<Vec<TestCaseResult>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .results
            .range((id, attempt, String::new())..)
            .take_while(|((sid, att, _), _)| *sid == id && *att == attempt)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn commit(
        &self,
        lease: &Lease,
        aggregate: &Aggregate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(submission) = inner.leased_mut(lease) else {
            return Ok(false);
        };
        submission.status = aggregate.status();
        submission.max_time = Some(aggregate.max_time);
        submission.max_memory = Some(aggregate.max_memory);
        submission.compile_error = aggregate.compile_error.clone();
        submission.judged_at = Some(now);
        clear_lease(submission);
        Ok(true)
    }

    async fn requeue(
        &self,
        lease: &Lease,
        cause: RequeueCause,
        max_requeues: i32,
        now: DateTime<Utc>,
    ) -> Result<RequeueOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(submission) = inner.leased_mut(lease) else {
            return Ok(RequeueOutcome::Stale);
        };
        if cause == RequeueCause::Expired && !submission.lease_deadline.is_some_and(|d| d < now) {
            return Ok(RequeueOutcome::Stale);
        }
        clear_lease(submission);
        if submission.requeue_count >= max_requeues {
            submission.status = SubmissionStatus::InternalError;
            submission.max_time = Some(0);
            submission.max_memory = Some(0);
            submission.judged_at = Some(now);
            Ok(RequeueOutcome::Terminated)
        } else {
            submission.status = SubmissionStatus::WaitingJudge;
            submission.requeue_count += 1;
            Ok(RequeueOutcome::Requeued)
        }
    }

    async fn expired_leases(&self, now: DateTime<Utc>) -> Result<Vec<Lease>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .submissions
            .values()
            .filter_map(Submission::current_lease)
            .filter(|lease| lease.deadline < now)
            .collect())
    }

    async fn rejudge(&self, id: i32) -> Result<RejudgeOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let submission = inner
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::SubmissionNotFound(id))?;

        if submission.status == SubmissionStatus::WaitingJudge {
            return Ok(RejudgeOutcome::AlreadyPending {
                attempt: submission.judge_attempt,
            });
        }

        submission.judge_attempt += 1;
        submission.status = SubmissionStatus::WaitingJudge;
        submission.max_time = None;
        submission.max_memory = None;
        submission.compile_error = None;
        submission.judged_at = None;
        submission.requeue_count = 0;
        clear_lease(submission);
        Ok(RejudgeOutcome::Rearmed {
            attempt: submission.judge_attempt,
        })
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn get_problem(&self, name: &str) -> Result<Option<Problem>, StoreError> {
        Ok(self.inner.lock().await.problems.get(name).cloned())
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError> {
        Ok(self.inner.lock().await.problems.values().cloned().collect())
    }

    async fn save_problem(&self, problem: &Problem) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .problems
            .insert(problem.name.clone(), problem.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(name).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .users
            .insert(user.name.clone(), user.clone());
        Ok(())
    }
}
