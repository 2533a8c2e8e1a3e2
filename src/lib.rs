#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # spr
//!
//! Batch evaluation of student repositories created by GitHub Classroom:
//! match each repository to the course roster, run a list of commands inside
//! it, collect commit statistics and write everything to a CSV report.

/// Run configuration loaded from `spr.json`
pub mod config;
/// Errors raised while evaluating repositories
pub mod error;
/// Evaluation of student repositories
pub mod evaluation;
/// GitHub Classroom grade records
pub mod grade;
/// Subprocess execution and command results
pub mod process;
/// CSV report and terminal summary
pub mod report;
/// Commit history statistics
pub mod stats;
/// Course roster
pub mod student;

pub use config::{CommandSpec, Config};
pub use error::SprError;
pub use evaluation::{Evaluation, Evaluator};
pub use grade::Grade;
pub use process::CommandResult;
pub use stats::CommitsStats;
pub use student::{Student, StudentMatch};
