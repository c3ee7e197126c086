use common::Problem;
use serde::Serialize;

/// Problem entry in list views.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemSummary {
    #[schema(example = "aplusb")]
    pub name: String,
    #[schema(example = "A + B")]
    pub title: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemListResponse {
    pub problems: Vec<ProblemSummary>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemInfoResponse {
    #[schema(example = "aplusb")]
    pub name: String,
    #[schema(example = "A + B")]
    pub title: String,
    #[schema(example = "https://github.com/yosupo06/library-checker-problems/tree/master/sample/aplusb")]
    pub source_url: String,
    /// Time limit per test case in seconds.
    #[schema(example = 2.0)]
    pub time_limit: f64,
    #[schema(example = "3f2a9c")]
    pub testcases_version: String,
    #[schema(example = "9b1e07")]
    pub version: String,
}

impl From<Problem> for ProblemInfoResponse {
    fn from(p: Problem) -> Self {
        Self {
            time_limit: p.time_limit_secs(),
            name: p.name,
            title: p.title,
            source_url: p.source_url,
            testcases_version: p.testcases_version,
            version: p.version,
        }
    }
}
