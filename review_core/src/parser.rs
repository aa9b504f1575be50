//! Single-pass state machine over the lines of a unified diff.
//!
//! The outer level tracks file sections (`diff --git` markers), the inner
//! level tracks hunks (`@@` headers). A file section whose hunk header cannot
//! be parsed is dropped as a whole and reported as a [`FailedFile`]; parsing
//! resumes at the next file marker.

use review_api::{
    DiffEntry, DiffHunk, DiffLine, DiffLineKind, DiffRange, FailedFile, FailureReason, FileDiff,
    FileStatus, HunkWarning, ModeChange, ParsedDiff, NULL_PATH,
};
use tracing::{debug, warn};

const FILE_MARKER: &str = "diff --git ";
const HUNK_MARKER: &str = "@@";

/// How hunks whose body disagrees with their header counts are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Keep the hunk and attach a [`HunkWarning`].
    #[default]
    Lenient,
    /// Discard the whole file section as a [`FailedFile`].
    Strict,
}

/// Parses unified diff text into a [`ParsedDiff`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffParser {
    mode: ParseMode,
}

impl DiffParser {
    /// Construct a parser with the given mismatch policy.
    #[must_use]
    pub const fn new(mode: ParseMode) -> Self {
        Self { mode }
    }

    /// Parse diff text. Total and deterministic: empty text yields an empty result.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParsedDiff {
        let mut machine = Machine {
            mode: self.mode,
            entries: Vec::new(),
        };
        let mut state = State::ExpectingFileHeader;
        for line in split_lines(text) {
            state = machine.feed(state, line);
        }
        machine.flush(state);
        ParsedDiff::new(machine.entries)
    }
}

/// Parse diff text with the lenient default policy.
#[must_use]
pub fn parse(text: &str) -> ParsedDiff {
    DiffParser::default().parse(text)
}

#[derive(Debug)]
enum State {
    /// Before the first file marker; lines such as commit headers are skipped.
    ExpectingFileHeader,
    /// Inside a file section, before or between hunks.
    ExpectingHunkOrMetadata(Section),
    /// Collecting body lines for a hunk.
    InHunk(Section, HunkBuilder),
    /// The current section failed; skip until the next file marker.
    Discarding,
}

struct Machine {
    mode: ParseMode,
    entries: Vec<DiffEntry>,
}

impl Machine {
    fn feed(&mut self, state: State, line: &str) -> State {
        if let Some(header) = structural(line).strip_prefix(FILE_MARKER) {
            self.flush(state);
            return State::ExpectingHunkOrMetadata(Section::from_git_header(header));
        }

        match state {
            State::ExpectingFileHeader => State::ExpectingFileHeader,
            State::Discarding => State::Discarding,
            State::ExpectingHunkOrMetadata(section) => self.metadata(section, structural(line)),
            State::InHunk(section, hunk) => self.hunk_body(section, hunk, line),
        }
    }

    fn metadata(&mut self, mut section: Section, line: &str) -> State {
        if line.starts_with(HUNK_MARKER) {
            if section.binary.is_some() {
                return State::ExpectingHunkOrMetadata(section);
            }
            return self.open_hunk(section, line);
        }
        section.apply_metadata(line);
        State::ExpectingHunkOrMetadata(section)
    }

    fn hunk_body(&mut self, mut section: Section, mut hunk: HunkBuilder, line: &str) -> State {
        if line.starts_with(HUNK_MARKER) {
            return match self.close_hunk(&mut section, hunk) {
                Ok(()) => self.open_hunk(section, structural(line)),
                Err(reason) => self.fail(&section, reason),
            };
        }

        match line.as_bytes().first() {
            Some(b'+') => hunk.push(DiffLineKind::Addition, &line[1..]),
            Some(b'-') => hunk.push(DiffLineKind::Deletion, &line[1..]),
            Some(b' ') => hunk.push(DiffLineKind::Context, &line[1..]),
            // A bare empty line is a context line whose single space was
            // trimmed, unless the hunk already has every line it declared.
            None if !hunk.is_satisfied() => hunk.push(DiffLineKind::Context, ""),
            None => {}
            Some(_) => hunk.notes.push(line.to_owned()),
        }
        State::InHunk(section, hunk)
    }

    fn open_hunk(&mut self, section: Section, line: &str) -> State {
        match parse_hunk_header(line) {
            Some((range, header_section)) => {
                debug!(path = section.display_path(), header = line, "hunk");
                State::InHunk(section, HunkBuilder::new(range, header_section))
            }
            None => {
                warn!(
                    path = section.display_path(),
                    header = line,
                    "malformed hunk header, discarding file section"
                );
                self.fail(
                    &section,
                    FailureReason::MalformedHunkHeader {
                        header: line.to_owned(),
                    },
                )
            }
        }
    }

    fn close_hunk(&self, section: &mut Section, hunk: HunkBuilder) -> Result<(), FailureReason> {
        let hunk = hunk.finish();
        if let Some(warning) = hunk.warning {
            warn!(path = section.display_path(), %warning, "hunk counts disagree with header");
            if self.mode == ParseMode::Strict {
                return Err(FailureReason::UnterminatedHunk { warning });
            }
        }
        section.hunks.push(hunk);
        Ok(())
    }

    fn fail(&mut self, section: &Section, reason: FailureReason) -> State {
        self.entries.push(DiffEntry::Failed(FailedFile {
            path: section.display_path().to_owned(),
            reason,
        }));
        State::Discarding
    }

    fn flush(&mut self, state: State) {
        match state {
            State::ExpectingFileHeader | State::Discarding => {}
            State::ExpectingHunkOrMetadata(section) => self.emit(section),
            State::InHunk(mut section, hunk) => match self.close_hunk(&mut section, hunk) {
                Ok(()) => self.emit(section),
                Err(reason) => {
                    self.fail(&section, reason);
                }
            },
        }
    }

    fn emit(&mut self, section: Section) {
        let file = section.finish();
        debug!(
            path = file.path(),
            status = ?file.status,
            hunks = file.hunks.len(),
            binary = file.is_binary(),
            "file section"
        );
        self.entries.push(DiffEntry::File(file));
    }
}

/// File section under construction.
#[derive(Debug, Default)]
struct Section {
    old_path: Option<String>,
    new_path: Option<String>,
    created: bool,
    removed: bool,
    renamed: bool,
    mode: Option<ModeChange>,
    binary: Option<String>,
    hunks: Vec<DiffHunk>,
}

impl Section {
    fn from_git_header(header: &str) -> Self {
        let (old_path, new_path) = split_git_header(header);
        Self {
            old_path,
            new_path,
            ..Self::default()
        }
    }

    fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or(NULL_PATH)
    }

    fn apply_metadata(&mut self, line: &str) {
        if let Some(mode) = line.strip_prefix("new file mode ") {
            self.created = true;
            self.mode = Some(ModeChange {
                old: None,
                new: Some(mode.trim().to_owned()),
            });
        } else if let Some(mode) = line.strip_prefix("deleted file mode ") {
            self.removed = true;
            self.mode = Some(ModeChange {
                old: Some(mode.trim().to_owned()),
                new: None,
            });
        } else if let Some(mode) = line.strip_prefix("old mode ") {
            self.mode.get_or_insert_with(empty_mode).old = Some(mode.trim().to_owned());
        } else if let Some(mode) = line.strip_prefix("new mode ") {
            self.mode.get_or_insert_with(empty_mode).new = Some(mode.trim().to_owned());
        } else if let Some(path) = line.strip_prefix("rename from ") {
            self.renamed = true;
            self.old_path = Some(unquote_path(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            self.renamed = true;
            self.new_path = Some(unquote_path(path));
        } else if let Some(path) = line.strip_prefix("--- ") {
            match file_line_path(path) {
                None => self.created = true,
                Some(path) if !self.renamed => self.old_path = Some(path),
                Some(_) => {}
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            match file_line_path(path) {
                None => self.removed = true,
                Some(path) if !self.renamed => self.new_path = Some(path),
                Some(_) => {}
            }
        } else if is_binary_notice(line) {
            self.binary = Some(line.to_owned());
        }
    }

    fn finish(self) -> FileDiff {
        let Self {
            mut old_path,
            mut new_path,
            created,
            removed,
            renamed,
            mode,
            binary,
            hunks,
        } = self;

        let status = if created {
            old_path = None;
            FileStatus::Added
        } else if removed {
            new_path = None;
            FileStatus::Deleted
        } else if renamed && old_path != new_path {
            FileStatus::Renamed
        } else {
            FileStatus::Modified
        };

        FileDiff {
            old_path,
            new_path,
            status,
            mode: mode.filter(|mode| mode.old != mode.new),
            binary,
            hunks,
        }
    }
}

const fn empty_mode() -> ModeChange {
    ModeChange {
        old: None,
        new: None,
    }
}

#[derive(Debug)]
struct HunkBuilder {
    range: DiffRange,
    section: Option<String>,
    lines: Vec<DiffLine>,
    notes: Vec<String>,
    old_seen: u32,
    new_seen: u32,
}

impl HunkBuilder {
    const fn new(range: DiffRange, section: Option<String>) -> Self {
        Self {
            range,
            section,
            lines: Vec::new(),
            notes: Vec::new(),
            old_seen: 0,
            new_seen: 0,
        }
    }

    fn push(&mut self, kind: DiffLineKind, content: &str) {
        if kind != DiffLineKind::Addition {
            self.old_seen = self.old_seen.saturating_add(1);
        }
        if kind != DiffLineKind::Deletion {
            self.new_seen = self.new_seen.saturating_add(1);
        }
        self.lines.push(DiffLine::new(kind, content));
    }

    const fn is_satisfied(&self) -> bool {
        self.old_seen >= self.range.old_count && self.new_seen >= self.range.new_count
    }

    fn finish(self) -> DiffHunk {
        let warning = (self.old_seen != self.range.old_count
            || self.new_seen != self.range.new_count)
            .then_some(HunkWarning {
                expected_old: self.range.old_count,
                expected_new: self.range.new_count,
                actual_old: self.old_seen,
                actual_new: self.new_seen,
            });

        DiffHunk {
            range: self.range,
            section: self.section,
            lines: self.lines,
            notes: self.notes,
            warning,
        }
    }
}

/// Split on `\n` only. A `\r` before the terminator belongs to the line, since
/// files with CRLF endings show up that way in git's output.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    (!body.is_empty())
        .then(|| body.split('\n'))
        .into_iter()
        .flatten()
}

/// Header and metadata lines of a patch saved with CRLF endings.
fn structural(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parse `@@ -<start>[,<count>] +<start>[,<count>] @@[ section]`.
///
/// Omitted counts default to 1. A range that starts at line 0 must be empty.
fn parse_hunk_header(line: &str) -> Option<(DiffRange, Option<String>)> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, tail) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    let (old_start, old_count) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(new.strip_prefix('+')?)?;

    let section = tail.strip_prefix(' ').unwrap_or(tail);
    let section = (!section.is_empty()).then(|| section.to_owned());

    Some((
        DiffRange {
            old_start,
            old_count,
            new_start,
            new_count,
        },
        section,
    ))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    let (start, count) = match range.split_once(',') {
        Some((start, count)) => (parse_number(start)?, parse_number(count)?),
        None => (parse_number(range)?, 1),
    };
    if start == 0 && count != 0 {
        return None;
    }
    Some((start, count))
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_binary_notice(line: &str) -> bool {
    (line.starts_with("Binary files ") && line.ends_with(" differ"))
        || line == "GIT binary patch"
}

/// Split the `a/<old> b/<new>` part of a `diff --git` line.
///
/// Unquoted paths may contain spaces, which makes the split ambiguous; the
/// split that yields identical old and new paths wins, otherwise the first
/// ` b/` separator is used.
fn split_git_header(header: &str) -> (Option<String>, Option<String>) {
    if header.starts_with('"') {
        let Some((old, rest)) = unquote(header) else {
            return (None, None);
        };
        let rest = rest.trim_start();
        let new = if rest.starts_with('"') {
            unquote(rest).map(|(new, _)| new)
        } else {
            Some(rest.to_owned())
        };
        return (Some(strip_side_prefix(&old)), new.map(|p| strip_side_prefix(&p)));
    }

    if let Some(old_side) = header.strip_prefix("a/") {
        let separators: Vec<usize> = old_side.match_indices(" b/").map(|(i, _)| i).collect();
        let split = separators
            .iter()
            .copied()
            .find(|&i| old_side[..i] == old_side[i + 3..])
            .or_else(|| separators.first().copied());
        if let Some(i) = split {
            return (
                Some(old_side[..i].to_owned()),
                Some(old_side[i + 3..].to_owned()),
            );
        }
        if let Some((old, new)) = old_side.split_once(" \"") {
            let new = unquote(&format!("\"{new}"))
                .map(|(new, _)| strip_side_prefix(&new))
                .unwrap_or_default();
            return (Some(old.to_owned()), Some(new));
        }
    }

    match header.split_once(' ') {
        Some((old, new)) => (Some(old.to_owned()), Some(new.to_owned())),
        None => (Some(header.to_owned()), Some(header.to_owned())),
    }
}

/// Path from a `---`/`+++` line; `None` for `/dev/null`.
fn file_line_path(rest: &str) -> Option<String> {
    let path = if rest.starts_with('"') {
        unquote(rest).map_or_else(|| rest.to_owned(), |(path, _)| path)
    } else {
        rest.split('\t').next().unwrap_or(rest).to_owned()
    };
    if path == NULL_PATH {
        return None;
    }
    Some(strip_side_prefix(&path))
}

fn unquote_path(path: &str) -> String {
    if path.starts_with('"') {
        if let Some((path, _)) = unquote(path) {
            return path;
        }
    }
    path.to_owned()
}

fn strip_side_prefix(path: &str) -> String {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_owned()
}

/// Decode a C-style quoted path as git writes it, returning the path and the
/// text after the closing quote.
fn unquote(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let path = String::from_utf8_lossy(&out).into_owned();
                return Some((path, &body[i + 1..]));
            }
            b'\\' => {
                let escaped = *bytes.get(i + 1)?;
                i += 2;
                match escaped {
                    b'0'..=b'7' => {
                        let digits = bytes.get(i - 1..i + 2)?;
                        let value = digits.iter().try_fold(0u8, |acc, &d| {
                            if !(b'0'..=b'7').contains(&d) {
                                return None;
                            }
                            acc.checked_mul(8)?.checked_add(d - b'0')
                        })?;
                        out.push(value);
                        i += 2;
                    }
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b't' => out.push(b'\t'),
                    b'n' => out.push(b'\n'),
                    b'v' => out.push(0x0b),
                    b'f' => out.push(0x0c),
                    b'r' => out.push(b'\r'),
                    other => out.push(other),
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    None
}
