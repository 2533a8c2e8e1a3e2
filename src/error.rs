#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Error type of the library.

use std::{num::ParseIntError, path::PathBuf};

/// Errors raised while evaluating student repositories.
///
/// Everything here is fatal for the run: recoverable situations (missing
/// repository directory, unmatched student) are logged by the evaluator and
/// never surface as an error.
#[derive(thiserror::Error, Debug)]
pub enum SprError {
    /// A roster identifier had more than three comma-separated parts.
    #[error(
        "Roster identifier `{0}` has more than 3 comma-separated parts (expected \
         `lastname,firstname[,number]`)."
    )]
    MalformedIdentifier(String),
    /// The path does not point at a git repository.
    #[error("`{path}` is not a git repository")]
    RepositoryNotFound {
        /// Path that was opened.
        path:   PathBuf,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },
    /// The branch to walk does not exist in the repository.
    #[error("Branch `{branch}` could not be found in `{path}`")]
    BranchNotFound {
        /// Repository path.
        path:   PathBuf,
        /// Name of the missing branch.
        branch: String,
    },
    /// A commit carries a timestamp outside the representable date range.
    #[error("Commit {commit} has an out-of-range timestamp ({seconds}s since epoch)")]
    InvalidTimestamp {
        /// Id of the offending commit.
        commit:  git2::Oid,
        /// Raw timestamp.
        seconds: i64,
    },
    /// Any other libgit2 failure while walking the commit log.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    /// A configured command has no program to run.
    #[error("Command `{0}` has an empty `cmd` list.")]
    EmptyCommand(String),
    /// Two configured commands share a name, which would duplicate columns.
    #[error("Command name `{0}` is used more than once.")]
    DuplicateCommand(String),
    /// A capture group extracted from command output is not an integer.
    #[error("Command `{command}`: capture group {index} (`{value}`) is not an integer: {source}")]
    InvalidCapture {
        /// Name of the command whose output was scanned.
        command: String,
        /// 0-based index of the capture group.
        index:   usize,
        /// Text captured by the group (empty if the group did not take part).
        value:   String,
        /// Parse failure.
        #[source]
        source:  ParseIntError,
    },
}
