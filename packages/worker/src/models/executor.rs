//! One judging pass: compile, run every test case, record, aggregate.

use std::path::PathBuf;
use std::sync::Arc;

use common::{Aggregate, Language, Problem, TestCaseResult, Verdict, aggregate};
use judge::{JudgeError, Lease, LeaseManager, StoreError, Submission, SubmissionStore};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ExecConfig;
use crate::models::sandbox::{ExecutionResult, Sandbox};
use crate::models::testcase::{TestCase, TestCaseSource};

/// Why a pass stopped without an aggregate.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The lease was superseded; the pass must not commit.
    #[error("Lease lost on submission {submission_id} (attempt {attempt})")]
    LeaseLost { submission_id: i32, attempt: i32 },

    /// Results could not be persisted; the lease should be handed back.
    #[error("Failed to record result: {0}")]
    Store(JudgeError),
}

impl From<JudgeError> for ExecError {
    fn from(e: JudgeError) -> Self {
        match e {
            JudgeError::LeaseLost {
                submission_id,
                attempt,
            } => ExecError::LeaseLost {
                submission_id,
                attempt,
            },
            other => ExecError::Store(other),
        }
    }
}

impl From<StoreError> for ExecError {
    fn from(e: StoreError) -> Self {
        JudgeError::from(e).into()
    }
}

pub struct JudgeExecutor {
    sandbox: Arc<dyn Sandbox>,
    testcases: Arc<dyn TestCaseSource>,
    exec: ExecConfig,
    workdir_root: PathBuf,
}

impl JudgeExecutor {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        testcases: Arc<dyn TestCaseSource>,
        exec: ExecConfig,
        workdir_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sandbox,
            testcases,
            exec,
            workdir_root: workdir_root.into(),
        }
    }

    /// Judge `submission` under `lease` and return the aggregate to commit.
    ///
    /// Faults of the judge itself become InternalError results; only a lost lease or a
    /// failing store stop the pass early.
    #[instrument(skip_all, fields(submission_id = lease.submission_id, attempt = lease.attempt))]
    pub async fn run<S>(
        &self,
        leases: &LeaseManager<S>,
        lease: &Lease,
        submission: &Submission,
        problem: &Problem,
        lang: &Language,
    ) -> Result<Aggregate, ExecError>
    where
        S: SubmissionStore + ?Sized,
    {
        if problem.testcases.is_empty() {
            error!(problem = %problem.name, "Problem has no test cases");
            return Ok(Aggregate::internal_error());
        }

        let workdir = match self.prepare(submission, lang).await {
            Ok(dir) => dir,
            Err(e) => {
                error!(error = %e, "Failed to prepare working directory");
                return Ok(Aggregate::internal_error());
            }
        };

        if lang.needs_compile() {
            match self
                .sandbox
                .execute(workdir.path(), &lang.compile, b"", self.exec.compile_timeout())
                .await
            {
                Ok(out) if out.timed_out => {
                    info!("Compilation timed out");
                    return Ok(Aggregate::compile_error("Compilation timed out"));
                }
                Ok(out) if !out.success() => {
                    info!("Compilation failed");
                    return Ok(Aggregate::compile_error(out.diagnostics()));
                }
                Ok(_) => debug!("Compiled"),
                Err(e) => {
                    error!(error = %e, "Compiler could not be started");
                    return Ok(Aggregate::internal_error());
                }
            }
        }

        let mut results = Vec::with_capacity(problem.testcases.len());
        for case in &problem.testcases {
            let result = match self.testcases.load(problem, case).await {
                Ok(data) => self.run_case(workdir.path(), problem, lang, case, &data).await,
                Err(e) => {
                    error!(case = %case, error = %e, "Test data unavailable");
                    TestCaseResult::internal_error(case.as_str())
                }
            };

            leases.record(lease, &result).await?;
            info!(
                case = %result.name,
                verdict = %result.verdict,
                time_ms = result.time_ms,
                "Test case judged"
            );
            results.push(result);
        }

        Ok(aggregate(&results))
    }

    async fn prepare(
        &self,
        submission: &Submission,
        lang: &Language,
    ) -> std::io::Result<tempfile::TempDir> {
        tokio::fs::create_dir_all(&self.workdir_root).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("judge-{}-", submission.id))
            .tempdir_in(&self.workdir_root)?;
        tokio::fs::write(dir.path().join(&lang.source), &submission.source).await?;
        Ok(dir)
    }

    async fn run_case(
        &self,
        workdir: &std::path::Path,
        problem: &Problem,
        lang: &Language,
        case: &str,
        data: &TestCase,
    ) -> TestCaseResult {
        let timeout = self.exec.run_timeout(problem.time_limit_ms);
        match self
            .sandbox
            .execute(workdir, &lang.exec, &data.input, timeout)
            .await
        {
            Ok(out) => classify(case, problem, &out, &data.expected),
            Err(e) => {
                warn!(case, error = %e, "Program could not be started");
                TestCaseResult::internal_error(case)
            }
        }
    }
}

/// Verdict of a finished run, checked in order: time, memory, exit status, output.
fn classify(case: &str, problem: &Problem, out: &ExecutionResult, expected: &[u8]) -> TestCaseResult {
    let time_ms = out.elapsed_ms();
    let verdict = if out.timed_out || time_ms > problem.time_limit_ms {
        Verdict::TimeLimitExceeded
    } else if out.memory_kb > problem.memory_limit_kb {
        Verdict::MemoryLimitExceeded
    } else if !out.success() {
        debug!(case, exit_code = ?out.exit_code, signal = ?out.signal, "Non-zero exit");
        Verdict::RuntimeError
    } else if compare_output(
        &String::from_utf8_lossy(&out.stdout),
        &String::from_utf8_lossy(expected),
    ) {
        Verdict::Accepted
    } else {
        Verdict::WrongAnswer
    };
    TestCaseResult::new(case, verdict, time_ms, out.memory_kb)
}

/// Compare output: trim trailing whitespace per line, ignore trailing empty lines.
fn compare_output(actual: &str, expected: &str) -> bool {
    let normalize = |s: &str| -> Vec<String> {
        let mut lines: Vec<String> = s.lines().map(|l| l.trim_end().to_string()).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    };
    normalize(actual) == normalize(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sandbox::SandboxError;
    use crate::models::testcase::TestDataError;
    use async_trait::async_trait;
    use chrono::Utc;
    use common::config::LeaseConfig;
    use judge::{MemoryStore, NewSubmission, SubmissionStore};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted sandbox: compile succeeds unless the source contains "syntax error"; a run
    /// echoes the canned answer for its stdin.
    struct FakeSandbox {
        answers: HashMap<Vec<u8>, ExecutionResult>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Sandbox for FakeSandbox {
        async fn execute(
            &self,
            workdir: &Path,
            argv: &[String],
            stdin: &[u8],
            _wall_timeout: Duration,
        ) -> Result<ExecutionResult, SandboxError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if argv[0] == "cc" {
                let source = std::fs::read_to_string(workdir.join("main.c")).unwrap();
                return Ok(if source.contains("syntax error") {
                    ExecutionResult {
                        exit_code: Some(1),
                        stderr: b"main.c:1: error".to_vec(),
                        ..Default::default()
                    }
                } else {
                    ExecutionResult {
                        exit_code: Some(0),
                        ..Default::default()
                    }
                });
            }
            self.answers
                .get(stdin)
                .cloned()
                .ok_or_else(|| SandboxError::Execution("unscripted input".into()))
        }
    }

    struct MapSource(HashMap<String, TestCase>);

    #[async_trait]
    impl TestCaseSource for MapSource {
        async fn load(&self, _p: &Problem, case: &str) -> Result<Arc<TestCase>, TestDataError> {
            self.0
                .get(case)
                .cloned()
                .map(Arc::new)
                .ok_or_else(|| TestDataError::InvalidName(case.into()))
        }
    }

    fn ok(stdout: &str, ms: u64) -> ExecutionResult {
        ExecutionResult {
            exit_code: Some(0),
            elapsed: Duration::from_millis(ms),
            stdout: stdout.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    fn lang() -> Language {
        Language {
            id: "c".into(),
            name: "C".into(),
            version: "cc".into(),
            source: "main.c".into(),
            compile: vec!["cc".into(), "main.c".into()],
            exec: vec!["./a.out".into()],
        }
    }

    fn problem(cases: &[&str]) -> Problem {
        Problem {
            name: "aplusb".into(),
            title: "A + B".into(),
            source_url: String::new(),
            time_limit_ms: 1000,
            memory_limit_kb: 1 << 18,
            testcases: cases.iter().map(|c| c.to_string()).collect(),
            testcases_version: "v1".into(),
            version: "v1".into(),
        }
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.as_bytes().to_vec(),
            expected: expected.as_bytes().to_vec(),
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        leases: LeaseManager<MemoryStore>,
        executor: JudgeExecutor,
        sandbox: Arc<FakeSandbox>,
        _root: tempfile::TempDir,
    }

    fn harness(answers: Vec<(&str, ExecutionResult)>, data: Vec<(&str, TestCase)>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let sandbox = Arc::new(FakeSandbox {
            answers: answers
                .into_iter()
                .map(|(i, r)| (i.as_bytes().to_vec(), r))
                .collect(),
            calls: Mutex::new(Vec::new()),
        });
        let source = Arc::new(MapSource(
            data.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ));
        let root = tempfile::tempdir().unwrap();
        Harness {
            leases: LeaseManager::new(store.clone(), &LeaseConfig::default()),
            executor: JudgeExecutor::new(
                sandbox.clone(),
                source,
                ExecConfig::default(),
                root.path(),
            ),
            store,
            sandbox,
            _root: root,
        }
    }

    async fn claim(h: &Harness, source: &str) -> (Lease, Submission) {
        let s = h
            .store
            .create_submission(
                NewSubmission {
                    problem: "aplusb".into(),
                    user_name: None,
                    source: source.into(),
                    lang: "c".into(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        (h.leases.claim("w").await.unwrap().unwrap(), s)
    }

    #[test]
    fn test_compare_output_exact() {
        assert!(compare_output("3\n", "3\n"));
    }

    #[test]
    fn test_compare_output_trailing_whitespace() {
        assert!(compare_output("3  \n\n\n", "3\n"));
    }

    #[test]
    fn test_compare_output_mismatch() {
        assert!(!compare_output("4\n", "3\n"));
    }

    #[tokio::test]
    async fn test_runs_every_case_and_takes_worst() {
        let h = harness(
            vec![("1 2\n", ok("3\n", 10)), ("2 2\n", ok("5\n", 30)), ("3 3\n", ok("6\n", 20))],
            vec![
                ("a", case("1 2\n", "3\n")),
                ("b", case("2 2\n", "4\n")),
                ("c", case("3 3\n", "6\n")),
            ],
        );
        let (lease, submission) = claim(&h, "int main;").await;

        let agg = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&["a", "b", "c"]), &lang())
            .await
            .unwrap();
        assert_eq!(agg.verdict, Verdict::WrongAnswer);
        assert_eq!(agg.max_time, 30);

        // Later cases still ran after the failure.
        let recorded = h.store.results(lease.submission_id, lease.attempt).await.unwrap();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[2].verdict, Verdict::Accepted);
    }

    #[tokio::test]
    async fn test_compile_error_records_nothing() {
        let h = harness(vec![], vec![("a", case("1 2\n", "3\n"))]);
        let (lease, submission) = claim(&h, "syntax error").await;

        let agg = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&["a"]), &lang())
            .await
            .unwrap();
        assert_eq!(agg.verdict, Verdict::CompileError);
        assert!(agg.compile_error.unwrap().contains("error"));
        assert!(h.store.results(lease.submission_id, 1).await.unwrap().is_empty());
        assert_eq!(h.sandbox.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_harness_faults_are_internal_errors() {
        // "b" has no test data and "c" has no scripted answer.
        let h = harness(
            vec![("1 2\n", ok("3\n", 1))],
            vec![("a", case("1 2\n", "3\n")), ("c", case("9\n", "9\n"))],
        );
        let (lease, submission) = claim(&h, "int main;").await;

        let agg = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&["a", "b", "c"]), &lang())
            .await
            .unwrap();
        assert_eq!(agg.verdict, Verdict::InternalError);
        let recorded = h.store.results(lease.submission_id, 1).await.unwrap();
        let verdicts: Vec<Verdict> = recorded.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![Verdict::Accepted, Verdict::InternalError, Verdict::InternalError]
        );
    }

    #[tokio::test]
    async fn test_time_and_runtime_classification() {
        let crashed = ExecutionResult {
            exit_code: None,
            signal: Some(11),
            elapsed: Duration::from_millis(5),
            ..Default::default()
        };
        let h = harness(
            vec![("slow\n", ok("x\n", 1500)), ("crash\n", crashed)],
            vec![("a", case("slow\n", "x\n")), ("b", case("crash\n", "x\n"))],
        );
        let (lease, submission) = claim(&h, "int main;").await;

        let agg = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&["a", "b"]), &lang())
            .await
            .unwrap();
        assert_eq!(agg.verdict, Verdict::RuntimeError);
        let recorded = h.store.results(lease.submission_id, 1).await.unwrap();
        assert_eq!(recorded[0].verdict, Verdict::TimeLimitExceeded);
        assert_eq!(recorded[0].time_ms, 1500);
    }

    #[tokio::test]
    async fn test_empty_problem_is_internal_error() {
        let h = harness(vec![], vec![]);
        let (lease, submission) = claim(&h, "int main;").await;
        let agg = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&[]), &lang())
            .await
            .unwrap();
        assert_eq!(agg.verdict, Verdict::InternalError);
        assert!(h.sandbox.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejudge_mid_pass_aborts() {
        let h = harness(vec![("1 2\n", ok("3\n", 1))], vec![("a", case("1 2\n", "3\n"))]);
        let (lease, submission) = claim(&h, "int main;").await;
        h.store.rejudge(submission.id).await.unwrap();

        let err = h
            .executor
            .run(&h.leases, &lease, &submission, &problem(&["a"]), &lang())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::LeaseLost { .. }));
    }
}
