#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Commit history statistics.
//!
//! The log of one branch is walked newest-first. Commits made by automation
//! accounts (GitHub Classroom, web-flow merges) are skipped, the remaining
//! ones are folded into a [`CommitsStats`] by a [`CommitsStatsCollector`].

use std::path::Path;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{BranchType, ErrorCode, Repository, Sort};

use crate::error::SprError;

/// Format used for commit datetimes in reports.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Aggregated statistics over the commits of one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitsStats {
    /// Number of commits taken into account.
    nb_commits:               usize,
    /// Committed datetime of the oldest commit.
    first_commit_datetime:    Option<DateTime<FixedOffset>>,
    /// Committed datetime of the newest commit.
    last_commit_datetime:     Option<DateTime<FixedOffset>>,
    /// Smallest gap between two consecutive commits, in seconds. `None` with
    /// fewer than two commits.
    min_time_between_commits: Option<i64>,
    /// Mean gap between two consecutive commits, in seconds.
    avg_time_between_commits: i64,
    /// Mean commit message length, in characters.
    avg_msg_length:           usize,
}

impl CommitsStats {
    /// Report column names, in the order of [`CommitsStats::values`].
    pub const FIELDS: [&'static str; 6] = [
        "nb_commits",
        "first_commit_datetime",
        "last_commit_datetime",
        "min_time_between_commits",
        "avg_time_between_commits",
        "avg_msg_length",
    ];

    /// Report cells, in the order of [`CommitsStats::FIELDS`]. Unset values
    /// are empty cells.
    pub fn values(&self) -> [String; 6] {
        let datetime = |dt: &Option<DateTime<FixedOffset>>| {
            dt.map(|dt| dt.format(DATETIME_FORMAT).to_string())
                .unwrap_or_default()
        };
        [
            self.nb_commits.to_string(),
            datetime(&self.first_commit_datetime),
            datetime(&self.last_commit_datetime),
            self.min_time_between_commits
                .map(|s| s.to_string())
                .unwrap_or_default(),
            self.avg_time_between_commits.to_string(),
            self.avg_msg_length.to_string(),
        ]
    }

    /// Number of commits.
    pub fn nb_commits(&self) -> usize {
        self.nb_commits
    }

    /// Datetime of the oldest commit.
    pub fn first_commit_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.first_commit_datetime
    }

    /// Datetime of the newest commit.
    pub fn last_commit_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.last_commit_datetime
    }

    /// Minimum time between commits, in seconds.
    pub fn min_time_between_commits(&self) -> Option<i64> {
        self.min_time_between_commits
    }

    /// Average time between commits, in seconds.
    pub fn avg_time_between_commits(&self) -> i64 {
        self.avg_time_between_commits
    }

    /// Average message length.
    pub fn avg_msg_length(&self) -> usize {
        self.avg_msg_length
    }
}

/// The parts of a commit that statistics are computed from.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Committer name.
    committer: String,
    /// Author timestamp.
    authored:  DateTime<FixedOffset>,
    /// Committer timestamp.
    committed: DateTime<FixedOffset>,
    /// Message length in characters, trailing newline included.
    msg_len:   usize,
}

impl CommitRecord {
    /// Creates a record from its parts.
    pub fn new(
        committer: impl Into<String>,
        authored: DateTime<FixedOffset>,
        committed: DateTime<FixedOffset>,
        message: &str,
    ) -> Self {
        Self {
            committer: committer.into(),
            authored,
            committed,
            msg_len: message.chars().count(),
        }
    }

    /// Extracts a record from a git commit.
    fn from_commit(commit: &git2::Commit<'_>) -> Result<Self, SprError> {
        let committer = commit.committer();
        let datetime = |time: git2::Time| {
            to_datetime(time).ok_or(SprError::InvalidTimestamp {
                commit:  commit.id(),
                seconds: time.seconds(),
            })
        };
        Ok(Self::new(
            String::from_utf8_lossy(committer.name_bytes()),
            datetime(commit.author().when())?,
            datetime(committer.when())?,
            &String::from_utf8_lossy(commit.message_raw_bytes()),
        ))
    }

    /// Committer name.
    pub fn committer(&self) -> &str {
        &self.committer
    }
}

/// Converts a git timestamp, keeping its UTC offset. `None` when the
/// timestamp is out of range.
fn to_datetime(time: git2::Time) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .unwrap_or_else(|| Utc.fix());
    DateTime::<Utc>::from_timestamp(time.seconds(), 0).map(|dt| dt.with_timezone(&offset))
}

/// Streaming accumulator over commits given newest-first.
#[derive(Debug, Default)]
pub struct CommitsStatsCollector {
    /// Commits pushed so far.
    nb_commits:       usize,
    /// Committed datetime of the first commit pushed.
    newest:           Option<DateTime<FixedOffset>>,
    /// Committed datetime of the last commit pushed.
    oldest:           Option<DateTime<FixedOffset>>,
    /// Running minimum of the gaps.
    min_time_between: Option<i64>,
    /// Sum of the gaps.
    sum_time_between: i64,
    /// Sum of the message lengths.
    sum_msg_length:   usize,
}

impl CommitsStatsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next (older) commit.
    ///
    /// The gap to the previously pushed commit is that commit's committed time
    /// minus this commit's authored time.
    pub fn push(&mut self, commit: &CommitRecord) {
        if let Some(previous) = self.oldest {
            let time_between = (previous - commit.authored).num_seconds();
            tracing::debug!(
                "Time between {} and {} = {}s",
                commit.authored,
                previous,
                time_between
            );
            self.sum_time_between += time_between;
            self.min_time_between = Some(
                self.min_time_between
                    .map_or(time_between, |min| min.min(time_between)),
            );
        } else {
            self.newest = Some(commit.committed);
        }

        self.nb_commits += 1;
        self.sum_msg_length += commit.msg_len;
        self.oldest = Some(commit.committed);
    }

    /// Computes the statistics. Means divide by at least 1.
    pub fn finish(self) -> CommitsStats {
        let gaps = self.nb_commits.saturating_sub(1).max(1) as i64;
        CommitsStats {
            nb_commits:               self.nb_commits,
            first_commit_datetime:    self.oldest,
            last_commit_datetime:     self.newest,
            min_time_between_commits: self.min_time_between,
            avg_time_between_commits: self.sum_time_between / gaps,
            avg_msg_length:           self.sum_msg_length / self.nb_commits.max(1),
        }
    }
}

/// Walks `branch` in the repository at `path` and computes commit statistics,
/// ignoring commits whose committer is listed in `bot_committers`.
pub fn collect_commits_stats(
    path: &Path,
    branch: &str,
    bot_committers: &[String],
) -> Result<CommitsStats, SprError> {
    let repo = Repository::open(path).map_err(|source| SprError::RepositoryNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let head = match repo.find_branch(branch, BranchType::Local) {
        Ok(found) => found.get().peel_to_commit()?.id(),
        Err(e) if e.code() == ErrorCode::NotFound => {
            if repo.is_empty()? {
                tracing::debug!("{} has no commits yet", path.display());
                return Ok(CommitsStatsCollector::new().finish());
            }
            return Err(SprError::BranchNotFound {
                path:   path.to_path_buf(),
                branch: branch.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push(head)?;

    let mut collector = CommitsStatsCollector::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        let record = CommitRecord::from_commit(&commit)?;
        if bot_committers.iter().any(|bot| bot == record.committer()) {
            tracing::debug!("Skipping commit {} by {}", commit.id(), record.committer());
            continue;
        }
        tracing::debug!(
            "Commit: {} by {}, {} ({} chars)",
            commit.id(),
            record.committer(),
            record.committed,
            record.msg_len
        );
        collector.push(&record);
    }

    let stats = collector.finish();
    tracing::debug!("{stats:?}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .and_then(|tz| tz.timestamp_opt(secs, 0).single())
            .expect("valid timestamp")
    }

    fn commit(authored: i64, committed: i64, message: &str) -> CommitRecord {
        CommitRecord::new("student", at(authored), at(committed), message)
    }

    #[test]
    fn no_commits() {
        let stats = CommitsStatsCollector::new().finish();
        assert_eq!(stats.nb_commits(), 0);
        assert_eq!(stats.avg_msg_length(), 0);
        assert_eq!(stats.avg_time_between_commits(), 0);
        assert_eq!(stats.min_time_between_commits(), None);
        assert_eq!(stats.first_commit_datetime(), None);
        assert_eq!(stats.values()[3], "");
    }

    #[test]
    fn single_commit() {
        let mut collector = CommitsStatsCollector::new();
        collector.push(&commit(100, 110, "init\n"));
        let stats = collector.finish();

        assert_eq!(stats.nb_commits(), 1);
        assert_eq!(stats.avg_msg_length(), 5);
        assert_eq!(stats.avg_time_between_commits(), 0);
        assert_eq!(stats.min_time_between_commits(), None);
        assert_eq!(stats.first_commit_datetime(), Some(at(110)));
        assert_eq!(stats.last_commit_datetime(), Some(at(110)));
    }

    #[test]
    fn gaps_use_previous_committed_minus_current_authored() {
        let mut collector = CommitsStatsCollector::new();
        // newest first
        collector.push(&commit(1000, 1010, "third\n"));
        collector.push(&commit(400, 600, "second\n"));
        collector.push(&commit(100, 105, "first\n"));
        let stats = collector.finish();

        // 1010 - 400 = 610, 600 - 100 = 500
        assert_eq!(stats.nb_commits(), 3);
        assert_eq!(stats.min_time_between_commits(), Some(500));
        assert_eq!(stats.avg_time_between_commits(), 555);
        assert_eq!(stats.avg_msg_length(), 6);
        assert_eq!(stats.last_commit_datetime(), Some(at(1010)));
        assert_eq!(stats.first_commit_datetime(), Some(at(105)));
    }

    #[test]
    fn means_truncate() {
        let mut collector = CommitsStatsCollector::new();
        collector.push(&commit(10, 10, "ab"));
        collector.push(&commit(5, 7, "abcde"));
        collector.push(&commit(0, 0, "é"));
        let stats = collector.finish();

        // gaps: 10 - 5 = 5, 7 - 0 = 7 -> 12 / 2 = 6; lengths 8 / 3 = 2
        assert_eq!(stats.avg_time_between_commits(), 6);
        assert_eq!(stats.avg_msg_length(), 2);
    }

    #[test]
    fn datetimes_are_reported_with_offset() {
        let mut collector = CommitsStatsCollector::new();
        collector.push(&commit(0, 0, "x"));
        let values = collector.finish().values();
        assert_eq!(values[1], "1970-01-01 01:00:00+01:00");
        assert_eq!(values[2], values[1]);
    }

    #[test]
    fn git_time_keeps_its_offset() {
        let dt = to_datetime(git2::Time::new(0, -120)).expect("in range");
        assert_eq!(dt.format(DATETIME_FORMAT).to_string(), "1969-12-31 22:00:00-02:00");
    }

    #[test]
    fn out_of_range_git_time_is_rejected() {
        assert_eq!(to_datetime(git2::Time::new(i64::MAX, 0)), None);
    }
}
