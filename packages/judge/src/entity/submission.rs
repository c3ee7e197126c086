use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub problem_name: String,
    /// NULL for anonymous submissions.
    pub user_name: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub source: String,
    pub lang: String,

    pub status: SubmissionStatus,
    pub max_time: Option<i32>,   // in milliseconds
    pub max_memory: Option<i64>, // in kilobytes
    #[sea_orm(column_type = "Text", nullable)]
    pub compile_error: Option<String>,
    pub judge_attempt: i32,
    pub requeue_count: i32,

    pub lease_id: Option<Uuid>,
    pub lease_owner: Option<String>,
    pub lease_deadline: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub results: HasMany<super::test_case_result::Entity>,

    pub created_at: DateTimeUtc,
    pub judged_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
