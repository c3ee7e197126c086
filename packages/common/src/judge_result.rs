use crate::{SubmissionStatus, Verdict};
use serde::{Deserialize, Serialize};

/// Outcome of running one test case within one judging attempt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct TestCaseResult {
    /// Test case name, unique within a problem.
    #[schema(example = "example_00")]
    pub name: String,
    pub verdict: Verdict,
    /// Elapsed time in milliseconds.
    #[schema(example = 12)]
    pub time_ms: i32,
    /// Peak memory in kilobytes.
    #[schema(example = 2048)]
    pub memory_kb: i64,
}

impl TestCaseResult {
    pub fn new(name: impl Into<String>, verdict: Verdict, time_ms: i32, memory_kb: i64) -> Self {
        Self {
            name: name.into(),
            verdict,
            time_ms,
            memory_kb,
        }
    }

    /// Result for a case the judge could not run.
    pub fn internal_error(name: impl Into<String>) -> Self {
        Self::new(name, Verdict::InternalError, 0, 0)
    }
}

/// Final verdict and resource maxima of one judging attempt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub verdict: Verdict,
    /// Maximum time across all recorded test cases (milliseconds).
    pub max_time: i32,
    /// Maximum memory across all recorded test cases (kilobytes).
    pub max_memory: i64,
    /// Compiler output, only set for `CompileError`.
    pub compile_error: Option<String>,
}

impl Aggregate {
    /// Aggregate for a pass that stopped at compilation.
    pub fn compile_error(output: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::CompileError,
            max_time: 0,
            max_memory: 0,
            compile_error: Some(output.into()),
        }
    }

    /// Aggregate for a pass the judge itself could not complete.
    pub fn internal_error() -> Self {
        Self {
            verdict: Verdict::InternalError,
            max_time: 0,
            max_memory: 0,
            compile_error: None,
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        self.verdict.into()
    }
}
