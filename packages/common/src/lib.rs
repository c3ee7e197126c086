pub mod aggregate;
pub mod capability;
pub mod config;
pub mod judge_result;
pub mod language;
pub mod problem;
pub mod retry;
pub mod submission_status;

pub use aggregate::aggregate;
pub use capability::Capability;
pub use judge_result::{Aggregate, TestCaseResult};
pub use language::{Language, LanguageRegistry};
pub use problem::Problem;
pub use submission_status::{SubmissionStatus, Verdict};
