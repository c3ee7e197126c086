#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verdict of a single test case, or the aggregate verdict of a judging pass.
///
/// Variants are declared from best to worst; [`Verdict::severity`] follows that order, so the
/// aggregate of a pass is simply the variant with the highest severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum Verdict {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongAnswer"))]
    WrongAnswer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    /// Program crashed or exited with a non-zero code.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    /// The judge itself failed; never attributed to the user's program.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "InternalError"))]
    InternalError,
    /// Compilation failed. No test case is run.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompileError"))]
    CompileError,
}

impl Verdict {
    pub const ALL: &'static [Verdict] = &[
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::InternalError,
        Self::CompileError,
    ];

    /// Precedence used by aggregation. Higher is worse.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Accepted => 0,
            Self::WrongAnswer => 1,
            Self::TimeLimitExceeded => 2,
            Self::MemoryLimitExceeded => 3,
            Self::RuntimeError => 4,
            Self::InternalError => 5,
            Self::CompileError => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "WrongAnswer",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::InternalError => "InternalError",
            Self::CompileError => "CompileError",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a submission during the judging lifecycle.
///
/// `WaitingJudge` and `Judging` are the only non-terminal states; every other variant mirrors
/// a [`Verdict`] and is written by the aggregate commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Waiting to be claimed by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WaitingJudge"))]
    WaitingJudge,
    /// Leased by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Judging"))]
    Judging,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongAnswer"))]
    WrongAnswer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "InternalError"))]
    InternalError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompileError"))]
    CompileError,
}

impl SubmissionStatus {
    /// Returns true if this is a final verdict (judging is complete).
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::WaitingJudge | Self::Judging)
    }

    /// The verdict carried by a final status.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::WaitingJudge | Self::Judging => None,
            Self::Accepted => Some(Verdict::Accepted),
            Self::WrongAnswer => Some(Verdict::WrongAnswer),
            Self::TimeLimitExceeded => Some(Verdict::TimeLimitExceeded),
            Self::MemoryLimitExceeded => Some(Verdict::MemoryLimitExceeded),
            Self::RuntimeError => Some(Verdict::RuntimeError),
            Self::InternalError => Some(Verdict::InternalError),
            Self::CompileError => Some(Verdict::CompileError),
        }
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::WaitingJudge,
        Self::Judging,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::InternalError,
        Self::CompileError,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingJudge => "WaitingJudge",
            Self::Judging => "Judging",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "WrongAnswer",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::InternalError => "InternalError",
            Self::CompileError => "CompileError",
        }
    }
}

impl From<Verdict> for SubmissionStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => Self::Accepted,
            Verdict::WrongAnswer => Self::WrongAnswer,
            Verdict::TimeLimitExceeded => Self::TimeLimitExceeded,
            Verdict::MemoryLimitExceeded => Self::MemoryLimitExceeded,
            Verdict::RuntimeError => Self::RuntimeError,
            Verdict::InternalError => Self::InternalError,
            Verdict::CompileError => Self::CompileError,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::WaitingJudge
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}
