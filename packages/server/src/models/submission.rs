use chrono::{DateTime, Utc};
use common::{SubmissionStatus, TestCaseResult, Verdict};
use judge::Submission;
use serde::{Deserialize, Serialize};

/// Request body for creating a submission.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Problem name.
    #[schema(example = "aplusb")]
    pub problem: String,
    /// Source code. Must be non-empty and at most `submission.max_source_size` bytes.
    #[schema(example = "#include <iostream>\nint main() { long a, b; std::cin >> a >> b; std::cout << a + b << '\\n'; }")]
    pub source: String,
    /// Language identifier from `GET /langs`.
    #[schema(example = "cpp")]
    pub lang: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    #[schema(example = 1)]
    pub id: i32,
}

/// Empty acknowledgement.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RejudgeResponse {}

/// Query parameters for submission listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    #[param(example = 0)]
    pub skip: Option<u64>,
    /// Page size, at most 1000. `0` or absent uses the default of 100.
    #[param(example = 100)]
    pub limit: Option<u64>,
    /// One of `""`, `-id`, `+id`, `id`, `+time`, `time`, `-time`. Default `-id`.
    #[param(example = "-id")]
    pub order: Option<String>,
    /// Filter by problem name.
    #[param(example = "aplusb")]
    pub problem: Option<String>,
    /// Filter by user name.
    #[param(example = "alice")]
    pub user: Option<String>,
    /// Filter by status.
    pub status: Option<SubmissionStatus>,
    /// Filter by language.
    #[param(example = "cpp")]
    pub lang: Option<String>,
}

/// Submission summary for list views (source omitted).
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionOverview {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "aplusb")]
    pub problem: String,
    /// Submitting user, null for anonymous submissions.
    #[schema(example = "alice")]
    pub user_name: Option<String>,
    #[schema(example = "cpp")]
    pub lang: String,
    pub status: SubmissionStatus,
    /// Judge pass number; advanced by every rejudge.
    #[schema(example = 1)]
    pub judge_attempt: i32,
    /// Slowest test case in milliseconds, null until judged.
    #[schema(example = 12)]
    pub max_time: Option<i32>,
    /// Largest memory use in kilobytes, null until judged.
    #[schema(example = 3072)]
    pub max_memory: Option<i64>,
    #[schema(example = "2025-10-01T14:30:00Z")]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2025-10-01T14:30:05Z")]
    pub judged_at: Option<DateTime<Utc>>,
}

impl From<&Submission> for SubmissionOverview {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id,
            problem: s.problem.clone(),
            user_name: s.user_name.clone(),
            lang: s.lang.clone(),
            status: s.status,
            judge_attempt: s.judge_attempt,
            max_time: s.max_time,
            max_memory: s.max_memory,
            created_at: s.created_at,
            judged_at: s.judged_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionOverview>,
    /// Number of matching submissions across all pages.
    #[schema(example = 47)]
    pub count: u64,
}

/// Result for a single test case of the current attempt.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CaseResultResponse {
    #[schema(example = "example_00")]
    pub case: String,
    pub verdict: Verdict,
    /// Milliseconds.
    #[schema(example = 5)]
    pub time: i32,
    /// Kilobytes.
    #[schema(example = 256)]
    pub memory: i64,
}

impl From<TestCaseResult> for CaseResultResponse {
    fn from(r: TestCaseResult) -> Self {
        Self {
            case: r.name,
            verdict: r.verdict,
            time: r.time_ms,
            memory: r.memory_kb,
        }
    }
}

/// Full submission details.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionInfoResponse {
    pub overview: SubmissionOverview,
    pub source: String,
    /// Compiler output when the verdict is CompileError.
    pub compile_error: Option<String>,
    /// Results recorded so far for the current attempt, ordered by case name.
    pub case_results: Vec<CaseResultResponse>,
    /// Whether the caller may rejudge this submission.
    pub can_rejudge: bool,
}
