use serde::{Deserialize, Serialize};

/// A problem as consumed by the judge. Owned by the problem storage collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Unique slug, e.g. `aplusb`.
    pub name: String,
    pub title: String,
    pub source_url: String,
    /// Time limit per test case in milliseconds.
    pub time_limit_ms: i32,
    /// Memory limit per test case in kilobytes.
    pub memory_limit_kb: i64,
    /// Test case names in their declared order.
    pub testcases: Vec<String>,
    /// Version of the test data; part of the test data location.
    pub testcases_version: String,
    /// Version of the statement and metadata.
    pub version: String,
}

impl Problem {
    /// Time limit in seconds as exposed by `ProblemInfo`.
    pub fn time_limit_secs(&self) -> f64 {
        f64::from(self.time_limit_ms) / 1000.0
    }
}
