#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! GitHub Classroom grades export.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};

use crate::{
    error::SprError,
    student::{NO_FIRSTNAME, NO_LASTNAME, NO_NUMBER, Student},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A row of the GitHub Classroom grades export: links a roster identity to a
/// student repository.
pub struct Grade {
    /// `lastname,firstname[,number]` as typed in the classroom roster.
    roster_identifier: String,
    /// GitHub account of the student.
    github_username:   String,
    /// Name of the repository, also its directory name on disk.
    repository_name:   String,
    /// URL of the repository.
    repository_url:    String,
}

impl Grade {
    /// Creates a new grade record.
    pub fn new(
        roster_identifier: impl Into<String>,
        github_username: impl Into<String>,
        repository_name: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        Self {
            roster_identifier: roster_identifier.into(),
            github_username:   github_username.into(),
            repository_name:   repository_name.into(),
            repository_url:    repository_url.into(),
        }
    }

    /// GitHub account of the student.
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

    /// Extracts the (possibly partial) student described by the roster
    /// identifier.
    ///
    /// Missing parts are replaced by the `NO_*` placeholders. More than three
    /// parts cannot be interpreted and fail.
    pub fn extract_student(&self) -> Result<Student, SprError> {
        let parts: Vec<&str> = self.roster_identifier.split(',').collect();
        let student = match parts.as_slice() {
            [lastname, firstname, number] => Student::new(*number, *lastname, *firstname),
            [lastname, firstname] => {
                tracing::warn!(
                    "No student number in roster identifier [{}]",
                    self.roster_identifier
                );
                Student::new(NO_NUMBER, *lastname, *firstname)
            }
            [_] => {
                tracing::warn!(
                    "Not enough information in roster identifier [{}]",
                    self.roster_identifier
                );
                Student::new(NO_NUMBER, NO_LASTNAME, NO_FIRSTNAME)
            }
            _ => return Err(SprError::MalformedIdentifier(self.roster_identifier.clone())),
        };
        tracing::debug!("Student extracted {student}");
        Ok(student)
    }
}

/// Reads grades from a GitHub Classroom CSV export.
///
/// Columns used: github_username (3), roster_identifier (4),
/// student_repository_name (5) and student_repository_url (6). The header
/// line is skipped.
pub fn read_grades(reader: impl Read) -> Result<Vec<Grade>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    csv.records()
        .enumerate()
        .map(|(i, record)| {
            let record = record.with_context(|| format!("Could not read grades row {}", i + 1))?;
            let field = |n: usize| {
                record
                    .get(n)
                    .with_context(|| format!("Grades row {} has no column {n}", i + 1))
            };
            Ok(Grade::new(field(4)?, field(3)?, field(5)?, field(6)?))
        })
        .collect()
}

/// Loads the grades CSV at `path`.
pub fn load_grades(path: &Path) -> Result<Vec<Grade>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open grades file {}", path.display()))?;
    read_grades(file).with_context(|| format!("While parsing {}", path.display()))
}
