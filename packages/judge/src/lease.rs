//! Exclusive, time-bounded ownership of submissions by workers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::LeaseConfig;
use common::retry::PollBackoff;
use common::{Aggregate, TestCaseResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{JudgeError, StoreError};
use crate::model::{
    CommitOutcome, Lease, ReleaseOutcome, RequeueCause, RequeueOutcome, RequeueReport,
};
use crate::store::SubmissionStore;

/// Waiting submissions inspected per claim attempt.
const CLAIM_BATCH: u64 = 8;

/// Polling settings for [`LeaseManager::next_lease`].
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_ms: 200,
            max_ms: 5_000,
        }
    }
}

/// Hands out, extends, and takes back leases on top of a [`SubmissionStore`].
pub struct LeaseManager<S: ?Sized> {
    store: Arc<S>,
    ttl: chrono::Duration,
    max_requeues: i32,
}

impl<S: ?Sized> Clone for LeaseManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
            max_requeues: self.max_requeues,
        }
    }
}

impl<S> LeaseManager<S>
where
    S: SubmissionStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: &LeaseConfig) -> Self {
        Self {
            store,
            ttl: chrono::Duration::seconds(config.ttl_secs as i64),
            max_requeues: config.max_requeues,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn deadline(&self) -> DateTime<Utc> {
        Utc::now() + self.ttl
    }

    /// Claim the oldest waiting submission.
    ///
    /// Returns `Ok(None)` when nothing is waiting and [`JudgeError::Conflict`] when every
    /// candidate was taken by another worker first.
    pub async fn claim(&self, worker_id: &str) -> Result<Option<Lease>, JudgeError> {
        let candidates = self.store.claim_candidates(CLAIM_BATCH).await?;
        if candidates.is_empty() {
            return Ok(None);
        }

        for (submission_id, attempt) in candidates {
            match self
                .store
                .try_claim(
                    submission_id,
                    attempt,
                    Uuid::new_v4(),
                    worker_id,
                    self.deadline(),
                )
                .await
            {
                Ok(lease) => {
                    info!(
                        submission_id,
                        attempt,
                        worker_id,
                        lease_id = %lease.lease_id,
                        "Claimed submission"
                    );
                    return Ok(Some(lease));
                }
                Err(StoreError::Conflict(_)) => {
                    debug!(submission_id, attempt, worker_id, "Lost claim race");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(JudgeError::Conflict(
            "All waiting submissions were claimed concurrently".into(),
        ))
    }

    /// Wait for a lease, backing off while the queue is empty. Returns `None` once `cancel`
    /// fires.
    pub async fn next_lease(
        &self,
        worker_id: &str,
        poll: PollConfig,
        cancel: &CancellationToken,
    ) -> Option<Lease> {
        let mut backoff = PollBackoff::new(poll.base_ms, poll.max_ms);

        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let delay = match self.claim(worker_id).await {
                Ok(Some(lease)) => return Some(lease),
                Ok(None) => backoff.next_delay(),
                // Someone else is busy on the same rows; try again right away.
                Err(JudgeError::Conflict(_)) => Duration::ZERO,
                Err(e) => {
                    warn!(worker_id, error = %e, "Claim failed");
                    backoff.next_delay()
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Push the lease deadline one TTL into the future.
    pub async fn heartbeat(&self, lease: &Lease) -> Result<DateTime<Utc>, JudgeError> {
        let deadline = self.deadline();
        self.store.extend_lease(lease, deadline).await?;
        debug!(
            submission_id = lease.submission_id,
            attempt = lease.attempt,
            "Lease extended"
        );
        Ok(deadline)
    }

    /// Persist one test case result under the lease.
    pub async fn record(&self, lease: &Lease, result: &TestCaseResult) -> Result<(), JudgeError> {
        self.store.put_result(lease, result).await?;
        Ok(())
    }

    /// Results already recorded for the lease's attempt.
    pub async fn recorded(&self, lease: &Lease) -> Result<Vec<TestCaseResult>, JudgeError> {
        Ok(self
            .store
            .results(lease.submission_id, lease.attempt)
            .await?)
    }

    /// Give the lease back, committing the aggregate or requeueing the submission.
    pub async fn release(
        &self,
        lease: &Lease,
        outcome: ReleaseOutcome,
    ) -> Result<CommitOutcome, JudgeError> {
        match outcome {
            ReleaseOutcome::Judged(aggregate) => self.commit(lease, &aggregate).await,
            ReleaseOutcome::Failed { reason } => {
                warn!(
                    submission_id = lease.submission_id,
                    attempt = lease.attempt,
                    reason = %reason,
                    "Worker gave up on submission"
                );
                Ok(match self.requeue(lease, RequeueCause::Failed, Utc::now()).await? {
                    RequeueOutcome::Requeued => CommitOutcome::Requeued,
                    RequeueOutcome::Terminated => CommitOutcome::Terminated,
                    RequeueOutcome::Stale => CommitOutcome::Discarded,
                })
            }
        }
    }

    async fn commit(&self, lease: &Lease, aggregate: &Aggregate) -> Result<CommitOutcome, JudgeError> {
        if self.store.commit(lease, aggregate, Utc::now()).await? {
            info!(
                submission_id = lease.submission_id,
                attempt = lease.attempt,
                verdict = %aggregate.verdict,
                max_time = aggregate.max_time,
                max_memory = aggregate.max_memory,
                "Committed verdict"
            );
            Ok(CommitOutcome::Committed(aggregate.status()))
        } else {
            warn!(
                submission_id = lease.submission_id,
                attempt = lease.attempt,
                "Discarded verdict from stale lease"
            );
            Ok(CommitOutcome::Discarded)
        }
    }

    async fn requeue(
        &self,
        lease: &Lease,
        cause: RequeueCause,
        now: DateTime<Utc>,
    ) -> Result<RequeueOutcome, JudgeError> {
        let outcome = self
            .store
            .requeue(lease, cause, self.max_requeues, now)
            .await?;
        match outcome {
            RequeueOutcome::Requeued => warn!(
                submission_id = lease.submission_id,
                attempt = lease.attempt,
                worker_id = %lease.worker_id,
                cause = ?cause,
                "Requeued submission"
            ),
            RequeueOutcome::Terminated => error!(
                submission_id = lease.submission_id,
                attempt = lease.attempt,
                max_requeues = self.max_requeues,
                "Requeue budget exhausted, marking InternalError"
            ),
            RequeueOutcome::Stale => debug!(
                submission_id = lease.submission_id,
                attempt = lease.attempt,
                cause = ?cause,
                "Lease already superseded or extended"
            ),
        }
        Ok(outcome)
    }

    /// Reclaim every lease whose deadline passed before `now`.
    pub async fn requeue_stale(&self, now: DateTime<Utc>) -> Result<RequeueReport, JudgeError> {
        let expired = self.store.expired_leases(now).await?;
        let mut report = RequeueReport::default();

        for lease in expired {
            match self.requeue(&lease, RequeueCause::Expired, now).await {
                Ok(RequeueOutcome::Requeued) => report.requeued += 1,
                Ok(RequeueOutcome::Terminated) => report.terminated += 1,
                Ok(RequeueOutcome::Stale) => {}
                Err(e) => error!(
                    submission_id = lease.submission_id,
                    error = %e,
                    "Failed to requeue stale lease"
                ),
            }
        }

        Ok(report)
    }
}
