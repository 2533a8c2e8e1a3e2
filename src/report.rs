#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! CSV report and terminal summary of the evaluations.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::{config::CommandSpec, evaluation::Evaluation};

/// Writes the header and one row per evaluation as CSV.
pub fn write_evaluations_to(
    writer: impl Write,
    evaluations: &[Evaluation],
    commands: &[CommandSpec],
) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().flexible(false).from_writer(writer);
    csv.write_record(Evaluation::header(commands))
        .context("Could not write report header")?;
    for evaluation in evaluations {
        csv.write_record(evaluation.record(commands))
            .with_context(|| {
                format!("Could not write report row for {}", evaluation.repository_name())
            })?;
    }
    csv.flush().context("Could not flush report")?;
    Ok(())
}

/// Writes the CSV report to `path`, replacing any existing file.
pub fn write_evaluations(
    path: &Path,
    evaluations: &[Evaluation],
    commands: &[CommandSpec],
) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Could not create evaluations file {}", path.display()))?;
    write_evaluations_to(file, evaluations, commands)
        .with_context(|| format!("While writing {}", path.display()))?;
    tracing::info!("{} evaluations written to {}", evaluations.len(), path.display());
    Ok(())
}

#[derive(Tabled)]
/// One line of the terminal summary.
struct SummaryRow {
    /// Student as resolved from the roster.
    #[tabled(rename = "Student")]
    student:    String,
    /// Repository name.
    #[tabled(rename = "Repository")]
    repository: String,
    /// Number of commits counted.
    #[tabled(rename = "Commits")]
    commits:    usize,
    /// Flattened command results.
    #[tabled(rename = "Results")]
    results:    String,
}

/// Renders a table summarising the evaluations.
pub fn summary_table(evaluations: &[Evaluation]) -> String {
    let rows = evaluations.iter().map(|e| SummaryRow {
        student:    e.student().to_string(),
        repository: e.repository_name().to_string(),
        commits:    e.commits_stats().nb_commits(),
        results:    e.results().iter().join(" "),
    });

    Table::new(rows)
        .with(Style::modern())
        .with(Modify::new(Columns::one(2)).with(Alignment::right()))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{process::CommandResult, stats::CommitsStatsCollector, student::Student};

    fn evaluation() -> Evaluation {
        Evaluation::builder()
            .student(Student::new("42", "Doe", "Jane"))
            .github_username("jdoe")
            .repository_name("tp1-jdoe")
            .repository_url("https://github.com/org/tp1-jdoe")
            .commits_stats(CommitsStatsCollector::new().finish())
            .command_results(vec![
                CommandResult::new(true, vec![]),
                CommandResult::new(false, vec![4, 5]),
            ])
            .build()
    }

    #[test]
    fn summary_lists_each_evaluation() {
        let table = summary_table(&[evaluation()]);

        for header in ["Student", "Repository", "Commits", "Results"] {
            assert!(table.contains(header), "missing `{header}` in\n{table}");
        }
        assert!(table.contains("Jane Doe (42)"));
        assert!(table.contains("tp1-jdoe"));
        assert!(table.contains("1 0 4 5"));
    }

    #[test]
    fn csv_report_has_header_and_rows() {
        let mut out = Vec::new();
        write_evaluations_to(&mut out, &[evaluation()], &[]).expect("write");
        let report = String::from_utf8(out).expect("utf-8 report");

        let mut lines = report.lines();
        assert!(lines.next().expect("header").starts_with("number,lastname,firstname,"));
        assert!(lines.next().expect("row").starts_with("42,Doe,Jane,jdoe,tp1-jdoe,"));
        assert!(lines.next().is_none());
    }
}
