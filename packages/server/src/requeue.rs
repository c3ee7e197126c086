use std::time::Duration;

use chrono::{DateTime, Utc};
use judge::{JudgeError, LeaseManager, RequeueReport, Store};
use tracing::{error, info, warn};

/// Run the stale lease sweeper as a background task.
///
/// Leases whose holder stopped heartbeating are returned to `WaitingJudge`, or terminated as
/// InternalError once their requeue budget is spent.
pub async fn run_stale_lease_sweeper(leases: LeaseManager<dyn Store>, every: Duration) {
    info!(
        sweep_interval_secs = every.as_secs(),
        "Starting stale lease sweeper"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        if let Err(e) = sweep(&leases, Utc::now()).await {
            error!(error = %e, "Stale lease sweep failed");
        }
    }
}

/// Reclaim every lease that expired before `now`.
pub async fn sweep(
    leases: &LeaseManager<dyn Store>,
    now: DateTime<Utc>,
) -> Result<RequeueReport, JudgeError> {
    let report = leases.requeue_stale(now).await?;

    if report.requeued > 0 || report.terminated > 0 {
        warn!(
            requeued = report.requeued,
            terminated = report.terminated,
            "Reclaimed stale leases"
        );
    }

    Ok(report)
}
