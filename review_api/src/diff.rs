use std::fmt;

use serde::{Deserialize, Serialize};

/// Path git prints for the side of a diff that does not exist.
pub const NULL_PATH: &str = "/dev/null";

/// Aggregate result of parsing one blob of diff text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDiff {
    /// One entry per file section, in the order they appear in the source.
    #[serde(default)]
    pub entries: Vec<DiffEntry>,
}

impl ParsedDiff {
    /// Wrap an ordered list of entries.
    #[must_use]
    pub const fn new(entries: Vec<DiffEntry>) -> Self {
        Self { entries }
    }

    /// Iterate the file sections that parsed cleanly.
    pub fn files(&self) -> impl Iterator<Item = &FileDiff> + '_ {
        self.entries.iter().filter_map(DiffEntry::as_file)
    }

    /// Iterate the file sections that failed structural validation.
    pub fn failures(&self) -> impl Iterator<Item = &FailedFile> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            DiffEntry::Failed(failed) => Some(failed),
            DiffEntry::File(_) => None,
        })
    }

    /// Number of file sections, clean or failed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the source text contained no file sections at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of parsing a single file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DiffEntry {
    /// The section parsed; hunks may still carry warnings.
    File(FileDiff),
    /// The section was discarded because it could not be parsed.
    Failed(FailedFile),
}

impl DiffEntry {
    /// The parsed file, when this entry is not a failure.
    #[must_use]
    pub const fn as_file(&self) -> Option<&FileDiff> {
        match self {
            Self::File(file) => Some(file),
            Self::Failed(_) => None,
        }
    }

    /// Path used to name the entry on screen.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::File(file) => file.path(),
            Self::Failed(failed) => &failed.path,
        }
    }
}

/// A file section that was dropped instead of being emitted half-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    /// Best known path for the file at the point of failure.
    pub path: String,
    /// What went wrong.
    pub reason: FailureReason,
}

/// Structural failures that invalidate a whole file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A line starting with `@@` did not match the hunk header grammar.
    MalformedHunkHeader {
        /// The offending line, verbatim.
        header: String,
    },
    /// A hunk's declared counts disagreed with its body (strict parsing only).
    UnterminatedHunk {
        /// Declared and observed line counts.
        warning: HunkWarning,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHunkHeader { header } => write!(f, "malformed hunk header: {header}"),
            Self::UnterminatedHunk { warning } => write!(f, "unterminated hunk: {warning}"),
        }
    }
}

/// All changes to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path on the old side; `None` when the file did not exist before.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Path on the new side; `None` when the file no longer exists.
    #[serde(default)]
    pub new_path: Option<String>,
    /// How the file changed.
    pub status: FileStatus,
    /// File mode transition, when git reported one.
    #[serde(default)]
    pub mode: Option<ModeChange>,
    /// The verbatim "Binary files ... differ" notice for binary files.
    #[serde(default)]
    pub binary: Option<String>,
    /// Hunks in the order they appear in the file.
    #[serde(default)]
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// Path to show for the file: the new path, or the old one for deletions.
    #[must_use]
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or(NULL_PATH)
    }

    /// Whether git reported the file as binary.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.binary.is_some()
    }

    /// Whether any hunk carries a count mismatch warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.hunks.iter().any(|hunk| hunk.warning.is_some())
    }

    /// Added/removed line totals across all hunks.
    #[must_use]
    pub fn stats(&self) -> DiffStats {
        self.hunks
            .iter()
            .fold(DiffStats::ZERO, |acc, hunk| acc.add(hunk.stats()))
    }
}

/// File status from the diff's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// File only exists on the new side.
    Added,
    /// File only exists on the old side.
    Deleted,
    /// File exists on both sides with modifications.
    Modified,
    /// File path changed between the two sides.
    Renamed,
}

impl FileStatus {
    /// Label used in summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "New",
            Self::Deleted => "Deleted",
            Self::Modified => "Modified",
            Self::Renamed => "Renamed",
        }
    }
}

/// `old mode` / `new mode` pair reported in the file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    /// Mode before the change, absent for new files.
    #[serde(default)]
    pub old: Option<String>,
    /// Mode after the change, absent for deleted files.
    #[serde(default)]
    pub new: Option<String>,
}

/// A contiguous block of changes anchored in both file versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Line ranges from the `@@` header.
    pub range: DiffRange,
    /// Text following the closing `@@`, usually the enclosing function.
    #[serde(default)]
    pub section: Option<String>,
    /// Lines in source order.
    #[serde(default)]
    pub lines: Vec<DiffLine>,
    /// Lines that are not part of the hunk body, e.g. `\ No newline at end of file`.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Set when the body does not match the counts in the header.
    #[serde(default)]
    pub warning: Option<HunkWarning>,
}

impl DiffHunk {
    /// Number of lines present on the old side (deletions and context).
    #[must_use]
    pub fn old_side_len(&self) -> u32 {
        self.count(|kind| kind != DiffLineKind::Addition)
    }

    /// Number of lines present on the new side (additions and context).
    #[must_use]
    pub fn new_side_len(&self) -> u32 {
        self.count(|kind| kind != DiffLineKind::Deletion)
    }

    /// Added/removed line totals for this hunk.
    #[must_use]
    pub fn stats(&self) -> DiffStats {
        DiffStats::new(
            self.count(|kind| kind == DiffLineKind::Addition),
            self.count(|kind| kind == DiffLineKind::Deletion),
        )
    }

    /// The canonical header line, always spelling out both counts.
    #[must_use]
    pub fn header(&self) -> String {
        match self.section.as_deref() {
            Some(section) => format!("{} {section}", self.range),
            None => self.range.to_string(),
        }
    }

    fn count(&self, keep: impl Fn(DiffLineKind) -> bool) -> u32 {
        let total = self.lines.iter().filter(|line| keep(line.kind)).count();
        u32::try_from(total).unwrap_or(u32::MAX)
    }
}

/// The line number ranges referenced by a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    /// First line of the hunk in the old file.
    pub old_start: u32,
    /// Number of old-side lines covered.
    pub old_count: u32,
    /// First line of the hunk in the new file.
    pub new_start: u32,
    /// Number of new-side lines covered.
    pub new_count: u32,
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Declared versus observed counts for a hunk whose body disagrees with its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkWarning {
    /// `old_count` from the header.
    pub expected_old: u32,
    /// `new_count` from the header.
    pub expected_new: u32,
    /// Deletion and context lines actually collected.
    pub actual_old: u32,
    /// Addition and context lines actually collected.
    pub actual_new: u32,
}

impl fmt::Display for HunkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} old / {} new lines, found {} / {}",
            self.expected_old, self.expected_new, self.actual_old, self.actual_new
        )
    }
}

/// A single line within a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// The role the line plays in the diff.
    pub kind: DiffLineKind,
    /// Line text without its leading marker.
    pub content: String,
}

impl DiffLine {
    /// Convenience constructor.
    pub fn new(kind: DiffLineKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

impl fmt::Display for DiffLine {
    /// Writes the line as it appears in a unified diff, marker included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.marker(), self.content)
    }
}

/// Type of a line contained in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    /// Unchanged context line.
    Context,
    /// A newly added line.
    Addition,
    /// A deleted line.
    Deletion,
}

impl DiffLineKind {
    /// The unified-diff marker character for this kind.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Context => ' ',
            Self::Addition => '+',
            Self::Deletion => '-',
        }
    }
}

/// Added/removed line counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffStats {
    /// Number of added lines.
    pub additions: u32,
    /// Number of removed lines.
    pub deletions: u32,
}

impl DiffStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        additions: 0,
        deletions: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(additions: u32, deletions: u32) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    /// Combine two stats structs.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            additions: self.additions.saturating_add(other.additions),
            deletions: self.deletions.saturating_add(other.deletions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hunk() -> DiffHunk {
        DiffHunk {
            range: DiffRange {
                old_start: 10,
                old_count: 2,
                new_start: 10,
                new_count: 3,
            },
            section: Some("fn example()".into()),
            lines: vec![
                DiffLine::new(DiffLineKind::Context, "fn example() {"),
                DiffLine::new(DiffLineKind::Deletion, "    old();"),
                DiffLine::new(DiffLineKind::Addition, "    new();"),
                DiffLine::new(DiffLineKind::Addition, "    newer();"),
            ],
            notes: vec![],
            warning: None,
        }
    }

    #[test]
    fn parsed_diff_round_trip() {
        let parsed = ParsedDiff::new(vec![
            DiffEntry::File(FileDiff {
                old_path: Some("src/lib.rs".into()),
                new_path: Some("src/lib.rs".into()),
                status: FileStatus::Modified,
                mode: None,
                binary: None,
                hunks: vec![sample_hunk()],
            }),
            DiffEntry::Failed(FailedFile {
                path: "broken.rs".into(),
                reason: FailureReason::MalformedHunkHeader {
                    header: "@@ -x +1 @@".into(),
                },
            }),
        ]);

        let json = serde_json::to_string_pretty(&parsed).expect("serialize parsed diff");
        let decoded: ParsedDiff = serde_json::from_str(&json).expect("deserialize parsed diff");
        assert_eq!(parsed, decoded);
    }

    #[test]
    fn serde_defaults_are_applied() {
        let json = r#"{
            "entries": [{
                "outcome": "file",
                "new_path": "README.md",
                "status": "added"
            }]
        }"#;

        let parsed: ParsedDiff = serde_json::from_str(json).expect("deserialize with defaults");
        let file = parsed.files().next().expect("one file");
        assert_eq!(file.path(), "README.md");
        assert_eq!(file.status, FileStatus::Added);
        assert!(file.old_path.is_none());
        assert!(!file.is_binary());
        assert!(file.hunks.is_empty());
    }

    #[test]
    fn encoded_uses_snake_case() {
        let json = serde_json::to_string(&FileStatus::Renamed).expect("serialize status");
        assert_eq!(json, "\"renamed\"");

        let json = serde_json::to_string(&DiffLineKind::Addition).expect("serialize line kind");
        assert_eq!(json, "\"addition\"");
    }

    #[test]
    fn path_falls_back_to_old_side_for_deletions() {
        let file = FileDiff {
            old_path: Some("gone.txt".into()),
            new_path: None,
            status: FileStatus::Deleted,
            mode: None,
            binary: None,
            hunks: vec![],
        };
        assert_eq!(file.path(), "gone.txt");
    }

    #[test]
    fn hunk_side_lengths_include_context() {
        let hunk = sample_hunk();
        assert_eq!(hunk.old_side_len(), 2);
        assert_eq!(hunk.new_side_len(), 3);
        assert_eq!(hunk.stats(), DiffStats::new(2, 1));
    }

    #[test]
    fn header_spells_out_counts_and_section() {
        let hunk = sample_hunk();
        assert_eq!(hunk.header(), "@@ -10,2 +10,3 @@ fn example()");
    }

    #[test]
    fn line_display_restores_marker() {
        assert_eq!(DiffLine::new(DiffLineKind::Deletion, "x").to_string(), "-x");
        assert_eq!(DiffLine::new(DiffLineKind::Context, "").to_string(), " ");
    }

    #[test]
    fn diff_stats_add() {
        let aggregate = DiffStats::new(5, 3).add(DiffStats::new(2, 4));
        assert_eq!(aggregate, DiffStats::new(7, 7));
    }

    #[test]
    fn parsed_diff_splits_files_and_failures() {
        let parsed = ParsedDiff::new(vec![DiffEntry::Failed(FailedFile {
            path: "a".into(),
            reason: FailureReason::MalformedHunkHeader { header: "@@".into() },
        })]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.files().count(), 0);
        assert_eq!(parsed.failures().count(), 1);
    }
}
