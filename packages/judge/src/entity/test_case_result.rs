use common::Verdict;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (submission, attempt, test case). Rows of earlier attempts are kept.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_case_result")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub attempt: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    pub verdict: Verdict,
    pub time_ms: i32,
    pub memory_kb: i64,

    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
