//! Folding per-test-case results into one verdict.

use crate::Verdict;
use crate::judge_result::{Aggregate, TestCaseResult};

/// Fold the results of one attempt into its aggregate.
///
/// The worst verdict wins (see [`Verdict::severity`]); time and memory are maxima over every
/// result regardless of verdict. The fold is commutative, so the arrival order of results
/// never changes the answer. An empty set aggregates to `Accepted` with zero maxima.
pub fn aggregate<'a, I>(results: I) -> Aggregate
where
    I: IntoIterator<Item = &'a TestCaseResult>,
{
    let mut verdict = Verdict::Accepted;
    let mut max_time = 0;
    let mut max_memory = 0;

    for result in results {
        if result.verdict.severity() > verdict.severity() {
            verdict = result.verdict;
        }
        max_time = max_time.max(result.time_ms);
        max_memory = max_memory.max(result.memory_kb);
    }

    Aggregate {
        verdict,
        max_time,
        max_memory,
        compile_error: None,
    }
}
