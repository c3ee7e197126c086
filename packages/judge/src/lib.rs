pub mod account;
pub mod database;
pub mod entity;
pub mod error;
pub mod lease;
pub mod listing;
pub mod memory;
pub mod model;
pub mod rejudge;
pub mod store;
pub mod submit;

pub use database::DbStore;
pub use error::{JudgeError, StoreError};
pub use lease::{LeaseManager, PollConfig};
pub use listing::{ListQuery, SubmissionOrder};
pub use memory::MemoryStore;
pub use model::{
    CommitOutcome, Lease, NewSubmission, RejudgeOutcome, ReleaseOutcome, RequeueCause,
    RequeueOutcome,
    RequeueReport, Submission, SubmissionFilter, SubmissionPage, User,
};
pub use store::{ProblemStore, Store, SubmissionStore, UserStore};
