#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Course roster and student matching.

use std::{fmt::Display, io::Read, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;

/// Placeholder number for a student that could not be identified.
pub const NO_NUMBER: &str = "NO_NUMBER";
/// Placeholder last name for a student that could not be identified.
pub const NO_LASTNAME: &str = "NO_LASTNAME";
/// Placeholder first name for a student that could not be identified.
pub const NO_FIRSTNAME: &str = "NO_FIRSTNAME";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A student enrolled in the course, as listed in the roster.
pub struct Student {
    /// Student number, the key used for matching.
    number:    String,
    /// Last name.
    lastname:  String,
    /// First name.
    firstname: String,
}

impl Student {
    /// Creates a new student record.
    pub fn new(
        number: impl Into<String>,
        lastname: impl Into<String>,
        firstname: impl Into<String>,
    ) -> Self {
        Self {
            number:    number.into(),
            lastname:  lastname.into(),
            firstname: firstname.into(),
        }
    }

    /// The placeholder identity used when no roster entry can be trusted.
    pub fn unknown() -> Self {
        Self::new(NO_NUMBER, NO_LASTNAME, NO_FIRSTNAME)
    }

    /// Student number.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Last name.
    pub fn lastname(&self) -> &str {
        &self.lastname
    }

    /// First name.
    pub fn firstname(&self) -> &str {
        &self.firstname
    }
}

impl Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.firstname, self.lastname, self.number)
    }
}

/// Outcome of looking a student number up in the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentMatch<'a> {
    /// Exactly one roster entry carries the number.
    Resolved(&'a Student),
    /// Several roster entries carry the number.
    Ambiguous(Vec<&'a Student>),
    /// No roster entry carries the number.
    Absent,
}

impl<'a> StudentMatch<'a> {
    /// Finds the roster entries whose number equals `number`.
    pub fn find(students: &'a [Student], number: &str) -> Self {
        match students
            .iter()
            .filter(|s| s.number == number)
            .exactly_one()
        {
            Ok(student) => Self::Resolved(student),
            Err(mut rest) => match rest.next() {
                None => Self::Absent,
                Some(first) => {
                    let mut all = vec![first];
                    all.extend(rest);
                    Self::Ambiguous(all)
                }
            },
        }
    }

    /// Identity to report: the roster entry when resolved, the placeholder
    /// identity otherwise.
    pub fn identity(&self) -> Student {
        match self {
            Self::Resolved(student) => (*student).clone(),
            Self::Ambiguous(_) | Self::Absent => Student::unknown(),
        }
    }
}

/// Reads students from a roster CSV export.
///
/// The header line is skipped; only the first three columns (number, last
/// name, first name) are used.
pub fn read_students(reader: impl Read) -> Result<Vec<Student>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    csv.records()
        .enumerate()
        .map(|(i, record)| {
            let record = record.with_context(|| format!("Could not read roster row {}", i + 1))?;
            let field = |n: usize| {
                record
                    .get(n)
                    .with_context(|| format!("Roster row {} has no column {n}", i + 1))
            };
            Ok(Student::new(field(0)?, field(1)?, field(2)?))
        })
        .collect()
}

/// Loads the roster CSV at `path`.
pub fn load_students(path: &Path) -> Result<Vec<Student>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open students file {}", path.display()))?;
    read_students(file).with_context(|| format!("While parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Student> {
        vec![
            Student::new("1", "Doe", "Jane"),
            Student::new("2", "Roe", "Richard"),
            Student::new("2", "Roe", "Rita"),
        ]
    }

    #[test]
    fn single_number_resolves() {
        let students = roster();
        let found = StudentMatch::find(&students, "1");
        assert_eq!(found, StudentMatch::Resolved(&students[0]));
        assert_eq!(found.identity(), students[0]);
    }

    #[test]
    fn duplicated_number_is_ambiguous() {
        let students = roster();
        let found = StudentMatch::find(&students, "2");
        assert_eq!(found, StudentMatch::Ambiguous(vec![&students[1], &students[2]]));
        assert_eq!(found.identity(), Student::unknown());
    }

    #[test]
    fn unknown_number_is_absent() {
        let students = roster();
        let found = StudentMatch::find(&students, NO_NUMBER);
        assert_eq!(found, StudentMatch::Absent);
        assert_eq!(found.identity().number(), NO_NUMBER);
    }

    #[test]
    fn roster_skips_header_and_extra_columns() {
        let data = "DOSSIER,NOM,PRÉNOM,NAISSANCE\n42,Doe,Jane,2001-01-01\n43,\"Smith, Jr\",John,2002-02-02\n";
        let students = read_students(data.as_bytes()).expect("parse roster");
        assert_eq!(
            students,
            vec![Student::new("42", "Doe", "Jane"), Student::new("43", "Smith, Jr", "John")]
        );
    }

    #[test]
    fn short_roster_row_is_an_error() {
        let data = "DOSSIER,NOM,PRÉNOM\n42,Doe\n";
        assert!(read_students(data.as_bytes()).is_err());
    }
}
