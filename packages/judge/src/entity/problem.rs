use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    pub title: String,
    pub source_url: String,
    pub time_limit: i32,   // in milliseconds
    pub memory_limit: i64, // in kilobytes
    /// Test case names in declared order, as a JSON array of strings.
    #[sea_orm(column_type = "Json")]
    pub testcases: serde_json::Value,
    pub testcases_version: String,
    pub version: String,
}

impl ActiveModelBehavior for ActiveModel {}
