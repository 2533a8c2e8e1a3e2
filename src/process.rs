#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running external commands in a student repository.
//!
//! Commands run with the repository as working directory and the configured
//! environment on top of the inherited one. Their output is collected and
//! the last line matching the command pattern yields integer captures.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    io::Read,
    path::Path,
    process::{ExitStatus, Stdio},
};

use anyhow::{Context, Result};
use regex::Regex;
use tokio::process::{Child, Command};

use crate::{config::CommandSpec, error::SprError};

/// Drop guard that terminates a spawned child process if callers forget to
/// await it.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> anyhow::Result<&mut Child> {
        self.0
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Describes what happens to the output of the spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    /// Send stdout and stderr to the null device.
    Discard,
    /// Collect stdout and stderr interleaved, as a terminal would show them.
    Merged,
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: ExitStatus,
    /// Combined stdout/stderr bytes; empty when output was discarded.
    pub output: Vec<u8>,
}

/// Spawns a command in `cwd`, waits for it and collects its output.
///
/// `env` is applied on top of the inherited environment. Stdin is closed.
/// There is no deadline: a process that never exits blocks the caller.
pub async fn run_collect<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    sink: OutputSink,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<Collected>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null());

    let reader = match sink {
        OutputSink::Discard => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
            None
        }
        OutputSink::Merged => {
            let (reader, writer) = std::io::pipe().context("failed to create output pipe")?;
            let writer_err = writer
                .try_clone()
                .context("failed to duplicate output pipe")?;
            cmd.stdout(writer).stderr(writer_err);
            Some(reader)
        }
    };

    let mut guard = ChildDropGuard::new(cmd.spawn().context("failed to spawn process")?);
    // The command still holds the write ends of the pipe; the reader only
    // sees EOF once they are closed.
    drop(cmd);

    let read_task = reader.map(|mut reader| {
        tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .context("failed to read process output")?;
            Ok::<Vec<u8>, anyhow::Error>(buf)
        })
    });

    let status = guard
        .child_mut()?
        .wait()
        .await
        .context("failed to wait on process")?;
    let output = match read_task {
        Some(task) => task.await.context("output task join error")??,
        None => Vec::new(),
    };
    guard.disarm();

    Ok(Collected { status, output })
}

/// Outcome of one configured command in one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the process exited with status 0.
    success: bool,
    /// Integers captured from the last matching output line, if any line
    /// matched.
    groups:  Vec<i64>,
}

impl CommandResult {
    /// Creates a result from its parts.
    pub fn new(success: bool, groups: Vec<i64>) -> Self {
        Self { success, groups }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.success
    }

    /// `1` or `0` for success, followed by the captured integers.
    pub fn values(&self) -> Vec<i64> {
        std::iter::once(i64::from(self.success))
            .chain(self.groups.iter().copied())
            .collect()
    }
}

/// Finds the last line of `output` matching `regex` and parses its capture
/// groups as integers.
///
/// Returns an empty vector when no line matches.
pub fn extract_groups(command: &str, regex: &Regex, output: &str) -> Result<Vec<i64>, SprError> {
    let Some(captures) = output.lines().rev().find_map(|line| regex.captures(line)) else {
        return Ok(Vec::new());
    };

    captures
        .iter()
        .skip(1)
        .enumerate()
        .map(|(index, group)| {
            let value = group.map_or("", |m| m.as_str());
            value
                .trim()
                .parse::<i64>()
                .map_err(|source| SprError::InvalidCapture {
                    command: command.to_string(),
                    index,
                    value: value.to_string(),
                    source,
                })
        })
        .collect()
}

/// Runs a configured command inside `cwd` and classifies its result.
///
/// Output is only collected when the command declares a pattern.
pub async fn run_command(
    spec: &CommandSpec,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<CommandResult> {
    let (program, args) = spec
        .cmd()
        .split_first()
        .ok_or_else(|| SprError::EmptyCommand(spec.name().to_string()))?;
    let sink = match spec.regex() {
        Some(_) => OutputSink::Merged,
        None => OutputSink::Discard,
    };

    let collected = run_collect(program, args, sink, cwd, env)
        .await
        .with_context(|| format!("Could not run `{}` in {}", spec.cmd().join(" "), cwd.display()))?;
    tracing::debug!(
        "Running '{}' from '{}' ({})",
        spec.cmd().join(" "),
        cwd.display(),
        collected.status
    );

    let groups = match spec.regex() {
        Some(regex) => {
            extract_groups(spec.name(), regex, &String::from_utf8_lossy(&collected.output))?
        }
        None => Vec::new(),
    };

    Ok(CommandResult::new(collected.status.success(), groups))
}
