use serde::{Deserialize, Serialize};

use crate::diff::{DiffEntry, DiffStats, FileStatus, ParsedDiff};

/// Counts derived from a parsed diff. Never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Number of file sections, including failed ones.
    pub files: usize,
    /// Files with [`FileStatus::Modified`].
    pub modified: usize,
    /// Files with [`FileStatus::Added`].
    pub added: usize,
    /// Files with [`FileStatus::Deleted`].
    pub deleted: usize,
    /// Files with [`FileStatus::Renamed`].
    pub renamed: usize,
    /// Sections discarded by the parser.
    pub failed: usize,
    /// Binary files among the parsed ones.
    pub binary: usize,
    /// Hunks across all parsed files.
    pub hunks: usize,
    /// Added/removed lines across all parsed files.
    pub stats: DiffStats,
}

impl Summary {
    /// Tally a parsed diff in a single pass.
    #[must_use]
    pub fn of(parsed: &ParsedDiff) -> Self {
        Self::from_entries(&parsed.entries)
    }

    /// Tally an ordered slice of entries.
    #[must_use]
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut summary, entry| {
            summary.files += 1;
            match entry {
                DiffEntry::Failed(_) => summary.failed += 1,
                DiffEntry::File(file) => {
                    match file.status {
                        FileStatus::Modified => summary.modified += 1,
                        FileStatus::Added => summary.added += 1,
                        FileStatus::Deleted => summary.deleted += 1,
                        FileStatus::Renamed => summary.renamed += 1,
                    }
                    if file.is_binary() {
                        summary.binary += 1;
                    }
                    summary.hunks += file.hunks.len();
                    summary.stats = summary.stats.add(file.stats());
                }
            }
            summary
        })
    }

    /// Count for a single status.
    #[must_use]
    pub const fn count(&self, status: FileStatus) -> usize {
        match status {
            FileStatus::Modified => self.modified,
            FileStatus::Added => self.added,
            FileStatus::Deleted => self.deleted,
            FileStatus::Renamed => self.renamed,
        }
    }
}
