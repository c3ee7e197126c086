mod common;

mod lang;
mod problem;
mod submission;
mod user;
