//! Test data lookup.
//!
//! The filesystem layout is `<root>/<problem>/<testcases_version>/in/<case>.in` with the
//! expected output next to it in `out/<case>.out`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::Problem;
use lru::LruCache;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TestDataError {
    #[error("Invalid test data path component '{0}'")]
    InvalidName(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Input and expected output of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub input: Vec<u8>,
    pub expected: Vec<u8>,
}

#[async_trait]
pub trait TestCaseSource: Send + Sync {
    async fn load(&self, problem: &Problem, case: &str) -> Result<Arc<TestCase>, TestDataError>;
}

type CacheKey = (String, String, String);

/// Reads test data from disk and keeps recently used cases in memory.
pub struct FsTestCaseSource {
    root: PathBuf,
    cache: Mutex<LruCache<CacheKey, Arc<TestCase>>>,
}

impl FsTestCaseSource {
    pub fn new(root: impl Into<PathBuf>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn case_dir(&self, problem: &Problem) -> Result<PathBuf, TestDataError> {
        check_component(&problem.name)?;
        check_component(&problem.testcases_version)?;
        Ok(self
            .root
            .join(&problem.name)
            .join(&problem.testcases_version))
    }
}

fn check_component(name: &str) -> Result<(), TestDataError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(TestDataError::InvalidName(name.to_string()));
    }
    Ok(())
}

async fn read(path: &Path) -> Result<Vec<u8>, TestDataError> {
    tokio::fs::read(path).await.map_err(|source| TestDataError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[async_trait]
impl TestCaseSource for FsTestCaseSource {
    async fn load(&self, problem: &Problem, case: &str) -> Result<Arc<TestCase>, TestDataError> {
        check_component(case)?;
        let key = (
            problem.name.clone(),
            problem.testcases_version.clone(),
            case.to_string(),
        );

        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let dir = self.case_dir(problem)?;
        let input = read(&dir.join("in").join(format!("{case}.in"))).await?;
        let expected = read(&dir.join("out").join(format!("{case}.out"))).await?;
        debug!(problem = %problem.name, case, bytes = input.len(), "Loaded test case");

        let loaded = Arc::new(TestCase { input, expected });
        self.cache.lock().await.put(key, Arc::clone(&loaded));
        Ok(loaded)
    }
}
