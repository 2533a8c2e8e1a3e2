#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Evaluation of student repositories.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::{EitherOrBoth, Itertools};
use typed_builder::TypedBuilder;

use crate::{
    config::{CommandSpec, Config},
    grade::Grade,
    process::{CommandResult, run_command},
    stats::{CommitsStats, collect_commits_stats},
    student::{Student, StudentMatch},
};

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
#[builder(doc)]
/// Result of the evaluation of one student repository.
pub struct Evaluation {
    /// Roster identity, or the placeholder identity when the grade could not
    /// be matched to exactly one student.
    student:         Student,
    /// GitHub account of the student.
    github_username: String,
    /// Repository name.
    repository_name: String,
    /// Repository URL.
    repository_url:  String,
    /// Commit statistics of the evaluated branch.
    commits_stats:   CommitsStats,
    /// One result per configured command, in configuration order.
    command_results: Vec<CommandResult>,
}

impl Evaluation {
    /// Column names of the identity part of a report row.
    pub const IDENTITY_FIELDS: [&'static str; 6] = [
        "number",
        "lastname",
        "firstname",
        "github_username",
        "repository_name",
        "repository_url",
    ];

    /// Cells matching [`Evaluation::IDENTITY_FIELDS`].
    fn identity_values(&self) -> [String; 6] {
        [
            self.student.number().to_string(),
            self.student.lastname().to_string(),
            self.student.firstname().to_string(),
            self.github_username.clone(),
            self.repository_name.clone(),
            self.repository_url.clone(),
        ]
    }

    /// Report header for the given commands.
    pub fn header(commands: &[CommandSpec]) -> Vec<String> {
        Self::IDENTITY_FIELDS
            .iter()
            .chain(CommitsStats::FIELDS.iter())
            .map(|s| s.to_string())
            .chain(commands.iter().flat_map(CommandSpec::column_names))
            .collect()
    }

    /// Report row, aligned on [`Evaluation::header`] for the same commands.
    ///
    /// Capture groups of a command whose pattern matched no output line are
    /// left as empty cells.
    pub fn record(&self, commands: &[CommandSpec]) -> Vec<String> {
        let mut row: Vec<String> = self
            .identity_values()
            .into_iter()
            .chain(self.commits_stats.values())
            .collect();

        for pair in commands.iter().zip_longest(&self.command_results) {
            match pair {
                EitherOrBoth::Both(spec, result) => {
                    let values = result.values();
                    let width = spec.column_names().len().max(values.len());
                    row.extend(
                        values
                            .iter()
                            .map(i64::to_string)
                            .pad_using(width, |_| String::new()),
                    );
                }
                EitherOrBoth::Left(spec) => {
                    row.extend(spec.column_names().iter().map(|_| String::new()));
                }
                EitherOrBoth::Right(_) => {}
            }
        }
        row
    }

    /// Resolved student identity.
    pub fn student(&self) -> &Student {
        &self.student
    }

    /// GitHub account.
    pub fn github_username(&self) -> &str {
        &self.github_username
    }

    /// Repository name.
    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    /// Repository URL.
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Commit statistics.
    pub fn commits_stats(&self) -> &CommitsStats {
        &self.commits_stats
    }

    /// All command results concatenated in configuration order.
    pub fn results(&self) -> Vec<i64> {
        self.command_results
            .iter()
            .flat_map(CommandResult::values)
            .collect()
    }
}

/// Evaluates student repositories according to a [`Config`].
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    /// Commands run in each repository.
    commands:       &'a [CommandSpec],
    /// Environment overrides for the commands.
    environment:    &'a BTreeMap<String, String>,
    /// Branch whose history is analysed.
    branch:         &'a str,
    /// Committer names ignored in statistics.
    bot_committers: &'a [String],
    /// Directory containing the repositories.
    repositories:   &'a Path,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator borrowing its settings from `config`.
    pub fn new(config: &'a Config) -> Self {
        Self {
            commands:       config.commands(),
            environment:    config.environment(),
            branch:         config.branch(),
            bot_committers: config.bot_committers(),
            repositories:   config.repositories(),
        }
    }

    /// Configured commands.
    pub fn commands(&self) -> &[CommandSpec] {
        self.commands
    }

    /// Programs of the configured commands that cannot be found on the `PATH`
    /// the commands will run with.
    ///
    /// Programs given with a directory component are resolved relative to
    /// each repository and are not checked.
    pub fn missing_programs(&self) -> Vec<&'a str> {
        let path = self
            .environment
            .get("PATH")
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        self.commands
            .iter()
            .filter_map(|spec| spec.cmd().first())
            .map(String::as_str)
            .filter(|program| {
                Path::new(program)
                    .parent()
                    .is_none_or(|dir| dir.as_os_str().is_empty())
            })
            .filter(|program| which::which_in(program, path.as_ref(), &cwd).is_err())
            .unique()
            .collect()
    }

    /// Path of the repository associated with `grade`.
    pub fn repository_path(&self, grade: &Grade) -> PathBuf {
        self.repositories.join(grade.repository_name())
    }

    /// Evaluates every grade in order, skipping grades whose repository
    /// directory is missing.
    pub async fn evaluate_repositories(
        &self,
        students: &[Student],
        grades: &[Grade],
    ) -> Result<Vec<Evaluation>> {
        let mut evaluations = Vec::with_capacity(grades.len());
        for grade in grades {
            if let Some(evaluation) = self.evaluate_repository(students, grade).await? {
                evaluations.push(evaluation);
            }
        }
        Ok(evaluations)
    }

    /// Evaluates the repository of one grade.
    ///
    /// Returns `Ok(None)` when the repository directory does not exist.
    pub async fn evaluate_repository(
        &self,
        students: &[Student],
        grade: &Grade,
    ) -> Result<Option<Evaluation>> {
        let candidate = grade.extract_student()?;
        let found = StudentMatch::find(students, candidate.number());
        match &found {
            StudentMatch::Resolved(student) => {
                tracing::debug!("Matching found for {candidate}: {student}")
            }
            StudentMatch::Ambiguous(all) => tracing::warn!(
                "More than one matching student for {candidate}: {}",
                all.iter().join(", ")
            ),
            StudentMatch::Absent => tracing::warn!("No matching student for {candidate}"),
        }

        let path = self.repository_path(grade);
        if !path.is_dir() {
            tracing::error!("No directory named {}", path.display());
            return Ok(None);
        }

        let commits_stats = collect_commits_stats(&path, self.branch, self.bot_committers)
            .with_context(|| format!("Could not collect commit statistics for {}", path.display()))?;
        tracing::info!(
            "Evaluating repository {} ({} commits) for {candidate}",
            path.display(),
            commits_stats.nb_commits()
        );

        let mut command_results = Vec::with_capacity(self.commands.len());
        for spec in self.commands {
            command_results.push(run_command(spec, &path, self.environment).await?);
        }

        let evaluation = Evaluation::builder()
            .student(found.identity())
            .github_username(grade.github_username())
            .repository_name(grade.repository_name())
            .repository_url(grade.repository_url())
            .commits_stats(commits_stats)
            .command_results(command_results)
            .build();
        tracing::info!(
            "Result for {candidate} = [{}]",
            evaluation.results().iter().join(", ")
        );

        Ok(Some(evaluation))
    }
}
