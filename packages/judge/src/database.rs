use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::DatabaseConfig;
use common::{Aggregate, Problem, SubmissionStatus, TestCaseResult};
use sea_orm::sea_query::{NullOrdering, OnConflict, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entity::{problem, submission, test_case_result, user};
use crate::error::StoreError;
use crate::listing::{ListQuery, SubmissionOrder};
use crate::model::{
    Lease, NewSubmission, RejudgeOutcome, RequeueCause, RequeueOutcome, Submission,
    SubmissionPage, User,
};
use crate::store::{ProblemStore, SubmissionStore, UserStore};

/// Rejudge retries its compare-and-swap this many times before reporting a conflict.
const REJUDGE_CAS_RETRIES: usize = 3;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("judge::entity::*").sync(&db).await?;

    info!(max_connections = config.max_connections, "Database ready");
    Ok(db)
}

impl From<submission::Model> for Submission {
    fn from(m: submission::Model) -> Self {
        Self {
            id: m.id,
            problem: m.problem_name,
            user_name: m.user_name,
            source: m.source,
            lang: m.lang,
            created_at: m.created_at,
            status: m.status,
            max_time: m.max_time,
            max_memory: m.max_memory,
            compile_error: m.compile_error,
            judge_attempt: m.judge_attempt,
            requeue_count: m.requeue_count,
            lease_id: m.lease_id,
            lease_owner: m.lease_owner,
            lease_deadline: m.lease_deadline,
            judged_at: m.judged_at,
        }
    }
}

impl TryFrom<problem::Model> for Problem {
    type Error = StoreError;

    fn try_from(m: problem::Model) -> Result<Self, Self::Error> {
        let testcases: Vec<String> = serde_json::from_value(m.testcases).map_err(|e| {
            StoreError::Corrupt(format!("problem '{}' has malformed testcases: {e}", m.name))
        })?;
        Ok(Self {
            name: m.name,
            title: m.title,
            source_url: m.source_url,
            time_limit_ms: m.time_limit,
            memory_limit_kb: m.memory_limit,
            testcases,
            testcases_version: m.testcases_version,
            version: m.version,
        })
    }
}

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self {
            name: m.name,
            is_admin: m.is_admin,
            library_url: m.library_url,
        }
    }
}

/// Rows matching `lease` only while it is the current lease.
fn current_lease(lease: &Lease) -> Condition {
    Condition::all()
        .add(submission::Column::Id.eq(lease.submission_id))
        .add(submission::Column::JudgeAttempt.eq(lease.attempt))
        .add(submission::Column::LeaseId.eq(lease.lease_id))
        .add(submission::Column::Status.eq(SubmissionStatus::Judging))
}

/// Store backed by a sea-orm connection (Postgres in production, SQLite in tests).
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect, sync the schema and wrap the connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        Ok(Self::new(init_db(config).await?))
    }
}

#[async_trait]
impl SubmissionStore for DbStore {
    async fn create_submission(
        &self,
        new: NewSubmission,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let model = submission::ActiveModel {
            problem_name: Set(new.problem),
            user_name: Set(new.user_name),
            source: Set(new.source),
            lang: Set(new.lang),
            status: Set(SubmissionStatus::WaitingJudge),
            max_time: Set(None),
            max_memory: Set(None),
            compile_error: Set(None),
            judge_attempt: Set(1),
            requeue_count: Set(0),
            lease_id: Set(None),
            lease_owner: Set(None),
            lease_deadline: Set(None),
            created_at: Set(now),
            judged_at: Set(None),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn get_submission(&self, id: i32) -> Result<Option<Submission>, StoreError> {
        Ok(submission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn list_submissions(&self, query: &ListQuery) -> Result<SubmissionPage, StoreError> {
        let mut select = submission::Entity::find();
        if let Some(problem) = &query.filter.problem {
            select = select.filter(submission::Column::ProblemName.eq(problem.as_str()));
        }
        if let Some(user) = &query.filter.user {
            select = select.filter(submission::Column::UserName.eq(user.as_str()));
        }
        if let Some(status) = query.filter.status {
            select = select.filter(submission::Column::Status.eq(status));
        }
        if let Some(lang) = &query.filter.lang {
            select = select.filter(submission::Column::Lang.eq(lang.as_str()));
        }

        let count = select.clone().count(&self.db).await?;

        let select = match query.order {
            SubmissionOrder::IdDesc => select.order_by_desc(submission::Column::Id),
            SubmissionOrder::IdAsc => select.order_by_asc(submission::Column::Id),
            SubmissionOrder::TimeAsc => select
                .order_by_with_nulls(submission::Column::MaxTime, Order::Asc, NullOrdering::Last)
                .order_by_desc(submission::Column::Id),
            SubmissionOrder::TimeDesc => select
                .order_by_with_nulls(submission::Column::MaxTime, Order::Desc, NullOrdering::Last)
                .order_by_desc(submission::Column::Id),
        };

        let submissions = select
            .offset(query.skip)
            .limit(query.limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(SubmissionPage { submissions, count })
    }

    async fn claim_candidates(&self, limit: u64) -> Result<Vec<(i32, i32)>, StoreError> {
        Ok(submission::Entity::find()
            .select_only()
            .column(submission::Column::Id)
            .column(submission::Column::JudgeAttempt)
            .filter(submission::Column::Status.eq(SubmissionStatus::WaitingJudge))
            .order_by_asc(submission::Column::Id)
            .limit(limit)
            .into_tuple::<(i32, i32)>()
            .all(&self.db)
            .await?)
    }

    async fn try_claim(
        &self,
        id: i32,
        attempt: i32,
        lease_id: Uuid,
        worker_id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Lease, StoreError> {
        let res = submission::Entity::update_many()
            .set(submission::ActiveModel {
                status: Set(SubmissionStatus::Judging),
                lease_id: Set(Some(lease_id)),
                lease_owner: Set(Some(worker_id.to_string())),
                lease_deadline: Set(Some(deadline)),
                ..Default::default()
            })
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::JudgeAttempt.eq(attempt))
            .filter(submission::Column::Status.eq(SubmissionStatus::WaitingJudge))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(StoreError::Conflict(id));
        }

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
        let res = submission::Entity::update_many()
            .set(submission::ActiveModel {
                lease_deadline: Set(Some(deadline)),
                ..Default::default()
            })
            .filter(current_lease(lease))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(StoreError::LeaseLost {
                submission_id: lease.submission_id,
                attempt: lease.attempt,
            });
        }
        Ok(())
    }

    async fn put_result(&self, lease: &Lease, result: &TestCaseResult) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        // Writing the submission row locks it until this transaction ends, so a requeue or
        // rejudge cannot land between the lease check and the upsert.
        let held = submission::Entity::update_many()
            .set(submission::ActiveModel {
                lease_owner: Set(Some(lease.worker_id.clone())),
                ..Default::default()
            })
            .filter(current_lease(lease))
            .exec(&txn)
            .await?;
        if held.rows_affected == 0 {
            txn.rollback().await?;
            return Err(StoreError::LeaseLost {
                submission_id: lease.submission_id,
                attempt: lease.attempt,
            });
        }

        let model = test_case_result::ActiveModel {
            submission_id: Set(lease.submission_id),
            attempt: Set(lease.attempt),
            name: Set(result.name.clone()),
            verdict: Set(result.verdict),
            time_ms: Set(result.time_ms),
            memory_kb: Set(result.memory_kb),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        test_case_result::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    test_case_result::Column::SubmissionId,
                    test_case_result::Column::Attempt,
                    test_case_result::Column::Name,
                ])
                .update_columns([
                    test_case_result::Column::Verdict,
                    test_case_result::Column::TimeMs,
                    test_case_result::Column::MemoryKb,
                    test_case_result::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn results(&self, id: i32, attempt: i32) -> Result<Vec<TestCaseResult>, StoreError> {
        Ok(test_case_result::Entity::find()
            .filter(test_case_result::Column::SubmissionId.eq(id))
            .filter(test_case_result::Column::Attempt.eq(attempt))
            .order_by_asc(test_case_result::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| TestCaseResult::new(m.name, m.verdict, m.time_ms, m.memory_kb))
            .collect())
    }

    async fn commit(
        &self,
        lease: &Lease,
        aggregate: &Aggregate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let res = submission::Entity::update_many()
            .set(submission::ActiveModel {
                status: Set(aggregate.status()),
                max_time: Set(Some(aggregate.max_time)),
                max_memory: Set(Some(aggregate.max_memory)),
                compile_error: Set(aggregate.compile_error.clone()),
                judged_at: Set(Some(now)),
                lease_id: Set(None),
                lease_owner: Set(None),
                lease_deadline: Set(None),
                ..Default::default()
            })
            .filter(current_lease(lease))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn requeue(
        &self,
        lease: &Lease,
        cause: RequeueCause,
        max_requeues: i32,
        now: DateTime<Utc>,
    ) -> Result<RequeueOutcome, StoreError> {
        let mut held = current_lease(lease);
        if cause == RequeueCause::Expired {
            held = held.add(submission::Column::LeaseDeadline.lt(now));
        }

        let Some(row) = submission::Entity::find()
            .filter(held.clone())
            .one(&self.db)
            .await?
        else {
            return Ok(RequeueOutcome::Stale);
        };

        let (update, outcome) = if row.requeue_count >= max_requeues {
            (
                submission::ActiveModel {
                    status: Set(SubmissionStatus::InternalError),
                    max_time: Set(Some(0)),
                    max_memory: Set(Some(0)),
                    judged_at: Set(Some(now)),
                    lease_id: Set(None),
                    lease_owner: Set(None),
                    lease_deadline: Set(None),
                    ..Default::default()
                },
                RequeueOutcome::Terminated,
            )
        } else {
            (
                submission::ActiveModel {
                    status: Set(SubmissionStatus::WaitingJudge),
                    requeue_count: Set(row.requeue_count + 1),
                    lease_id: Set(None),
                    lease_owner: Set(None),
                    lease_deadline: Set(None),
                    ..Default::default()
                },
                RequeueOutcome::Requeued,
            )
        };

        let res = submission::Entity::update_many()
            .set(update)
            .filter(held)
            .filter(submission::Column::RequeueCount.eq(row.requeue_count))
            .exec(&self.db)
            .await?;

        Ok(if res.rows_affected == 0 {
            RequeueOutcome::Stale
        } else {
            outcome
        })
    }

    async fn expired_leases(&self, now: DateTime<Utc>) -> Result<Vec<Lease>, StoreError> {
        Ok(submission::Entity::find()
            .filter(submission::Column::Status.eq(SubmissionStatus::Judging))
            .filter(submission::Column::LeaseDeadline.lt(now))
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|m| Submission::from(m).current_lease())
            .collect())
    }

    async fn rejudge(&self, id: i32) -> Result<RejudgeOutcome, StoreError> {
        for _ in 0..REJUDGE_CAS_RETRIES {
            let row = submission::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .ok_or(StoreError::SubmissionNotFound(id))?;

            if row.status == SubmissionStatus::WaitingJudge {
                return Ok(RejudgeOutcome::AlreadyPending {
                    attempt: row.judge_attempt,
                });
            }

            let attempt = row.judge_attempt + 1;
            let res = submission::Entity::update_many()
                .set(submission::ActiveModel {
                    status: Set(SubmissionStatus::WaitingJudge),
                    judge_attempt: Set(attempt),
                    requeue_count: Set(0),
                    max_time: Set(None),
                    max_memory: Set(None),
                    compile_error: Set(None),
                    judged_at: Set(None),
                    lease_id: Set(None),
                    lease_owner: Set(None),
                    lease_deadline: Set(None),
                    ..Default::default()
                })
                .filter(submission::Column::Id.eq(id))
                .filter(submission::Column::JudgeAttempt.eq(row.judge_attempt))
                .filter(submission::Column::Status.eq(row.status))
                .exec(&self.db)
                .await?;

            if res.rows_affected > 0 {
                return Ok(RejudgeOutcome::Rearmed { attempt });
            }
        }
        Err(StoreError::Conflict(id))
    }
}

#[async_trait]
impl ProblemStore for DbStore {
    async fn get_problem(&self, name: &str) -> Result<Option<Problem>, StoreError> {
        problem::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .map(Problem::try_from)
            .transpose()
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, StoreError> {
        problem::Entity::find()
            .order_by_asc(problem::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Problem::try_from)
            .collect()
    }

    async fn save_problem(&self, p: &Problem) -> Result<(), StoreError> {
        let model = problem::ActiveModel {
            name: Set(p.name.clone()),
            title: Set(p.title.clone()),
            source_url: Set(p.source_url.clone()),
            time_limit: Set(p.time_limit_ms),
            memory_limit: Set(p.memory_limit_kb),
            testcases: Set(serde_json::json!(p.testcases)),
            testcases_version: Set(p.testcases_version.clone()),
            version: Set(p.version.clone()),
            ..Default::default()
        };
        problem::Entity::insert(model)
            .on_conflict(
                OnConflict::column(problem::Column::Name)
                    .update_columns([
                        problem::Column::Title,
                        problem::Column::SourceUrl,
                        problem::Column::TimeLimit,
                        problem::Column::MemoryLimit,
                        problem::Column::Testcases,
                        problem::Column::TestcasesVersion,
                        problem::Column::Version,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for DbStore {
    async fn get_user(&self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(user::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn save_user(&self, u: &User) -> Result<(), StoreError> {
        let model = user::ActiveModel {
            name: Set(u.name.clone()),
            is_admin: Set(u.is_admin),
            library_url: Set(u.library_url.clone()),
            ..Default::default()
        };
        user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::Name)
                    .update_columns([user::Column::IsAdmin, user::Column::LibraryUrl])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}
