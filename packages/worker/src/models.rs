pub mod executor;
pub mod runner;
pub mod sandbox;
pub mod testcase;

pub use executor::{ExecError, JudgeExecutor};
pub use runner::Runner;
pub use sandbox::{ProcessSandbox, Sandbox};
pub use testcase::{FsTestCaseSource, TestCaseSource};
