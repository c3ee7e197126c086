//! Ordered, paginated views over submission history.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::JudgeError;
use crate::model::{Submission, SubmissionFilter, SubmissionPage};
use crate::store::SubmissionStore;

/// Page size used when the caller passes `limit = 0`.
pub const DEFAULT_LIST_LIMIT: u64 = 100;
pub const MAX_LIST_LIMIT: u64 = 1000;

/// Closed set of listing orders. Ties are always broken by id descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionOrder {
    #[default]
    IdDesc,
    IdAsc,
    TimeAsc,
    TimeDesc,
}

impl FromStr for SubmissionOrder {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "-id" => Ok(Self::IdDesc),
            "+id" | "id" => Ok(Self::IdAsc),
            "+time" | "time" => Ok(Self::TimeAsc),
            "-time" => Ok(Self::TimeDesc),
            other => Err(JudgeError::InvalidArgument(format!(
                "Unknown order '{other}'"
            ))),
        }
    }
}

impl SubmissionOrder {
    /// Total order over submissions. Rows without a recorded time sort last in both time
    /// directions.
    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        let primary = match self {
            Self::IdDesc => b.id.cmp(&a.id),
            Self::IdAsc => a.id.cmp(&b.id),
            Self::TimeAsc => cmp_nulls_last(a.max_time, b.max_time, false),
            Self::TimeDesc => cmp_nulls_last(a.max_time, b.max_time, true),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

fn cmp_nulls_last(a: Option<i32>, b: Option<i32>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A validated listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: SubmissionFilter,
    pub order: SubmissionOrder,
    pub skip: u64,
    pub limit: u64,
}

impl ListQuery {
    pub fn new(
        filter: SubmissionFilter,
        order: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Self, JudgeError> {
        let order = order.parse()?;
        let limit = match limit {
            0 => DEFAULT_LIST_LIMIT,
            l if l > MAX_LIST_LIMIT => {
                return Err(JudgeError::InvalidArgument(format!(
                    "Limit must be at most {MAX_LIST_LIMIT}"
                )));
            }
            l => l,
        };
        Ok(Self {
            filter,
            order,
            skip,
            limit,
        })
    }
}

#[tracing::instrument(skip(store))]
pub async fn list<S>(store: &S, query: &ListQuery) -> Result<SubmissionPage, JudgeError>
where
    S: SubmissionStore + ?Sized,
{
    Ok(store.list_submissions(query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::SubmissionStatus;

    fn sub(id: i32, max_time: Option<i32>) -> Submission {
        Submission {
            id,
            problem: "aplusb".into(),
            user_name: None,
            source: String::new(),
            lang: "cpp".into(),
            created_at: Utc::now(),
            status: SubmissionStatus::WaitingJudge,
            max_time,
            max_memory: None,
            compile_error: None,
            judge_attempt: 1,
            requeue_count: 0,
            lease_id: None,
            lease_owner: None,
            lease_deadline: None,
            judged_at: None,
        }
    }

    #[test]
    fn test_order_tokens() {
        assert_eq!("".parse::<SubmissionOrder>().unwrap(), SubmissionOrder::IdDesc);
        assert_eq!("-id".parse::<SubmissionOrder>().unwrap(), SubmissionOrder::IdDesc);
        assert_eq!("+id".parse::<SubmissionOrder>().unwrap(), SubmissionOrder::IdAsc);
        assert_eq!("+time".parse::<SubmissionOrder>().unwrap(), SubmissionOrder::TimeAsc);
        assert_eq!("-time".parse::<SubmissionOrder>().unwrap(), SubmissionOrder::TimeDesc);
        assert!(matches!(
            "dummy".parse::<SubmissionOrder>(),
            Err(JudgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_limit_validation() {
        let q = ListQuery::new(SubmissionFilter::default(), "", 0, 0).unwrap();
        assert_eq!(q.limit, DEFAULT_LIST_LIMIT);
        assert!(ListQuery::new(SubmissionFilter::default(), "", 0, MAX_LIST_LIMIT).is_ok());
        assert!(matches!(
            ListQuery::new(SubmissionFilter::default(), "", 0, MAX_LIST_LIMIT + 1),
            Err(JudgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_time_order_ties_by_id_desc_and_nulls_last() {
        let mut rows = vec![sub(1, Some(10)), sub(2, None), sub(3, Some(10)), sub(4, Some(5))];

        rows.sort_by(|a, b| SubmissionOrder::TimeAsc.compare(a, b));
        let ids: Vec<i32> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 3, 1, 2]);

        rows.sort_by(|a, b| SubmissionOrder::TimeDesc.compare(a, b));
        let ids: Vec<i32> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
    }
}
