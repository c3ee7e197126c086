pub mod lang;
pub mod problem;
pub mod submission;
pub mod user;
