#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Run configuration, read from `spr.json`.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::SprError;

/// Default name of the configuration file.
pub const CONFIG_FILENAME: &str = "spr.json";

/// Branch walked when collecting commit statistics.
pub const DEFAULT_BRANCH: &str = "main";

/// Committer name used by GitHub for web-flow and classroom commits.
pub const GITHUB_COMMITTER_NAME: &str = "GitHub";

/// A command run inside every repository.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Column name in the report.
    name:  String,
    /// Program followed by its arguments.
    cmd:   Vec<String>,
    /// Pattern matched against each output line; its capture groups are
    /// reported as integers.
    #[serde(default, deserialize_with = "deserialize_pattern")]
    regex: Option<Regex>,
}

/// Compiles the optional `regex` key while deserializing.
fn deserialize_pattern<'de, D>(deserializer: D) -> Result<Option<Regex>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|pattern| Regex::new(&pattern))
        .transpose()
        .map_err(serde::de::Error::custom)
}

impl CommandSpec {
    /// Creates a command specification.
    pub fn new(name: impl Into<String>, cmd: Vec<String>, regex: Option<Regex>) -> Self {
        Self {
            name: name.into(),
            cmd,
            regex,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program and arguments.
    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    /// Output pattern, if any.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Number of capture groups declared by the pattern.
    pub fn group_count(&self) -> usize {
        self.regex
            .as_ref()
            .map_or(0, |re| re.captures_len().saturating_sub(1))
    }

    /// Report columns: the command name, then `{name}_{i}` per capture group.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain((0..self.group_count()).map(|i| format!("{}_{i}", self.name)))
            .collect()
    }
}

/// Configuration of an evaluation run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Roster CSV.
    students:       PathBuf,
    /// GitHub Classroom grades CSV.
    grades:         PathBuf,
    /// Output CSV.
    evaluations:    PathBuf,
    /// Variables added to (or overriding) the environment of every command.
    #[serde(default)]
    environment:    BTreeMap<String, String>,
    /// Commands run in every repository, in report order.
    commands:       Vec<CommandSpec>,
    /// Branch whose history is analysed.
    #[serde(default = "default_branch")]
    branch:         String,
    /// Committer names whose commits are ignored.
    #[serde(default = "default_bot_committers")]
    bot_committers: Vec<String>,
    /// Directory containing the student repositories.
    #[serde(default = "default_repositories")]
    repositories:   PathBuf,
}

/// Serde default for [`Config::branch`].
fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Serde default for [`Config::bot_committers`].
fn default_bot_committers() -> Vec<String> {
    vec![GITHUB_COMMITTER_NAME.to_string()]
}

/// Serde default for [`Config::repositories`].
fn default_repositories() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read configuration file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("While loading {}", path.display()))
    }

    /// Rejects commands that cannot be run or reported.
    pub fn validate(&self) -> Result<(), SprError> {
        let mut names = HashSet::new();
        for command in &self.commands {
            if command.cmd.is_empty() {
                return Err(SprError::EmptyCommand(command.name.clone()));
            }
            if !names.insert(command.name.as_str()) {
                return Err(SprError::DuplicateCommand(command.name.clone()));
            }
        }
        Ok(())
    }

    /// Roster CSV path.
    pub fn students(&self) -> &Path {
        &self.students
    }

    /// Grades CSV path.
    pub fn grades(&self) -> &Path {
        &self.grades
    }

    /// Output CSV path.
    pub fn evaluations(&self) -> &Path {
        &self.evaluations
    }

    /// Environment overrides.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Configured commands.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Analysed branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Ignored committer names.
    pub fn bot_committers(&self) -> &[String] {
        &self.bot_committers
    }

    /// Directory containing the repositories.
    pub fn repositories(&self) -> &Path {
        &self.repositories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_json(
            r#"{
                "students": "students.csv",
                "grades": "grades.csv",
                "evaluations": "evaluations.csv",
                "commands": [{"name": "build", "cmd": ["cargo", "build"]}]
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.branch(), "main");
        assert_eq!(config.bot_committers(), ["GitHub".to_string()]);
        assert_eq!(config.repositories(), Path::new("."));
        assert!(config.environment().is_empty());
        assert_eq!(config.commands()[0].column_names(), vec!["build"]);
    }

    #[test]
    fn pattern_groups_name_columns() {
        let config = Config::from_json(
            r#"{
                "students": "s.csv", "grades": "g.csv", "evaluations": "e.csv",
                "environment": {"CI": "1"},
                "commands": [{"name": "tests", "cmd": ["make", "test"],
                              "regex": "(\\d+) passed, (\\d+) failed"}]
            }"#,
        )
        .expect("valid config");

        let tests = &config.commands()[0];
        assert_eq!(tests.group_count(), 2);
        assert_eq!(tests.column_names(), vec!["tests", "tests_0", "tests_1"]);
        assert_eq!(config.environment().get("CI").map(String::as_str), Some("1"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = Config::from_json(
            r#"{"students": "s", "grades": "g", "evaluations": "e",
                "commands": [{"name": "x", "cmd": ["true"], "regex": "(unclosed"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_and_duplicate_commands_are_rejected() {
        let empty = Config::from_json(
            r#"{"students": "s", "grades": "g", "evaluations": "e",
                "commands": [{"name": "x", "cmd": []}]}"#,
        );
        assert!(empty.is_err());

        let duplicate = Config::from_json(
            r#"{"students": "s", "grades": "g", "evaluations": "e",
                "commands": [{"name": "x", "cmd": ["true"]}, {"name": "x", "cmd": ["false"]}]}"#,
        );
        assert!(duplicate.is_err());
    }
}
