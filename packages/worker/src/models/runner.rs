use std::sync::Arc;
use std::time::Duration;

use common::retry::calculate_backoff;
use common::{Aggregate, LanguageRegistry};
use judge::{
    CommitOutcome, JudgeError, Lease, LeaseManager, PollConfig, ProblemStore, ReleaseOutcome, Store,
    SubmissionStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::executor::{ExecError, JudgeExecutor};

/// Transient failures tolerated when handing a lease back.
const RELEASE_RETRIES: u8 = 3;

/// Claim loop of one worker: lease, judge, release, repeat.
pub struct Runner<S: ?Sized> {
    worker_id: String,
    leases: LeaseManager<S>,
    langs: Arc<LanguageRegistry>,
    executor: Arc<JudgeExecutor>,
    heartbeat_interval: Duration,
    poll: PollConfig,
}

impl<S> Runner<S>
where
    S: Store + ?Sized + 'static,
{
    pub fn new(
        worker_id: impl Into<String>,
        leases: LeaseManager<S>,
        langs: Arc<LanguageRegistry>,
        executor: Arc<JudgeExecutor>,
        heartbeat_interval: Duration,
        poll: PollConfig,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            leases,
            langs,
            executor,
            heartbeat_interval,
            poll,
        }
    }

    /// Judge submissions until `cancel` fires. A pass in progress is finished first.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(worker_id = %self.worker_id, "Worker loop started");
        while let Some(lease) = self
            .leases
            .next_lease(&self.worker_id, self.poll, &cancel)
            .await
        {
            match self.judge(&lease).await {
                Ok(outcome) => info!(
                    submission_id = lease.submission_id,
                    attempt = lease.attempt,
                    outcome = ?outcome,
                    "Pass finished"
                ),
                Err(e) => error!(
                    submission_id = lease.submission_id,
                    attempt = lease.attempt,
                    error = %e,
                    "Failed to release lease"
                ),
            }
        }
        info!(worker_id = %self.worker_id, "Worker loop stopped");
    }

    /// Judge one leased submission while keeping the lease alive.
    pub async fn judge(&self, lease: &Lease) -> Result<CommitOutcome, JudgeError> {
        let lost = CancellationToken::new();
        let stop = CancellationToken::new();
        let heartbeat = tokio::spawn(keep_alive(
            self.leases.clone(),
            lease.clone(),
            self.heartbeat_interval,
            lost.clone(),
            stop.clone(),
        ));

        let outcome = tokio::select! {
            outcome = self.pass(lease) => outcome,
            _ = lost.cancelled() => Err(ExecError::LeaseLost {
                submission_id: lease.submission_id,
                attempt: lease.attempt,
            }),
        };

        stop.cancel();
        if let Err(e) = heartbeat.await {
            warn!(error = %e, "Heartbeat task panicked");
        }

        match outcome {
            Ok(aggregate) => self.release(lease, ReleaseOutcome::Judged(aggregate)).await,
            Err(ExecError::LeaseLost { .. }) => {
                warn!(
                    submission_id = lease.submission_id,
                    attempt = lease.attempt,
                    "Lease lost, abandoning pass"
                );
                Ok(CommitOutcome::Discarded)
            }
            Err(ExecError::Store(e)) => {
                self.release(
                    lease,
                    ReleaseOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
                .await
            }
        }
    }

    /// Hand the lease back, retrying transient store failures while the lease is still ours.
    async fn release(
        &self,
        lease: &Lease,
        outcome: ReleaseOutcome,
    ) -> Result<CommitOutcome, JudgeError> {
        let mut retries: u8 = 0;
        loop {
            match self.leases.release(lease, outcome.clone()).await {
                Err(e) if e.is_transient() && retries < RELEASE_RETRIES => {
                    retries += 1;
                    let delay = calculate_backoff(retries, self.poll.base_ms, self.poll.max_ms);
                    warn!(
                        submission_id = lease.submission_id,
                        attempt = lease.attempt,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Release failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn pass(&self, lease: &Lease) -> Result<Aggregate, ExecError> {
        let store = self.leases.store();

        let Some(submission) = store.get_submission(lease.submission_id).await? else {
            return Err(ExecError::Store(JudgeError::NotFound(format!(
                "Submission {} vanished",
                lease.submission_id
            ))));
        };

        let Some(problem) = store.get_problem(&submission.problem).await? else {
            error!(problem = %submission.problem, "Unknown problem");
            return Ok(Aggregate::internal_error());
        };

        let Some(lang) = self.langs.get(&submission.lang) else {
            error!(lang = %submission.lang, "Language not configured on this worker");
            return Ok(Aggregate::internal_error());
        };

        self.executor
            .run(&self.leases, lease, &submission, &problem, lang)
            .await
    }
}

async fn keep_alive<S>(
    leases: LeaseManager<S>,
    lease: Lease,
    every: Duration,
    lost: CancellationToken,
    stop: CancellationToken,
) where
    S: Store + ?Sized,
{
    let mut interval = tokio::time::interval(every);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = interval.tick() => {}
        }

        match leases.heartbeat(&lease).await {
            Ok(_) => {}
            Err(JudgeError::LeaseLost { .. }) => {
                lost.cancel();
                return;
            }
            Err(e) => warn!(
                submission_id = lease.submission_id,
                error = %e,
                "Heartbeat failed, retrying"
            ),
        }
    }
}
