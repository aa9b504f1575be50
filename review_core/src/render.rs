//! Turns the parsed model into lines of role-tagged text.
//!
//! Rendering is a forward walk over already parsed records. It never touches
//! escape codes: a [`StyleTable`] decides how each [`Role`] looks when a
//! [`Line`] is painted.

use std::fmt;

use review_api::{
    DiffEntry, DiffHunk, DiffLineKind, FailedFile, FileDiff, FileStatus, ParsedDiff, Summary,
};

use crate::style::{Role, StyleTable};

/// Default width of horizontal rules.
pub const DEFAULT_RULE_WIDTH: usize = 80;

/// A run of text sharing one presentation role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// How the text should be presented.
    pub role: Role,
    /// The text itself.
    pub text: String,
}

impl Span {
    /// Span with an explicit role.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// One output line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// Spans in display order.
    pub spans: Vec<Span>,
}

impl Line {
    /// An empty line.
    #[must_use]
    pub const fn blank() -> Self {
        Self { spans: Vec::new() }
    }

    /// A line with a single span.
    pub fn styled(role: Role, text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::new(role, text)],
        }
    }

    /// Append a span.
    #[must_use]
    pub fn with(mut self, role: Role, text: impl Into<String>) -> Self {
        self.spans.push(Span::new(role, text));
        self
    }

    /// Text without any styling.
    #[must_use]
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Text styled through the given table.
    #[must_use]
    pub fn paint(&self, styles: &StyleTable) -> String {
        self.spans
            .iter()
            .map(|span| styles.paint(span.role, &span.text))
            .collect()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Renders summaries and per-file blocks.
#[derive(Debug, Clone, Copy)]
pub struct DiffRenderer {
    rule_width: usize,
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_WIDTH)
    }
}

impl DiffRenderer {
    /// Renderer drawing rules of the given width.
    #[must_use]
    pub const fn new(rule_width: usize) -> Self {
        Self { rule_width }
    }

    /// Summary block followed by one block per entry, in parse order.
    #[must_use]
    pub fn render(&self, parsed: &ParsedDiff) -> Vec<Line> {
        let mut lines = self.render_summary(&parsed.entries);
        for entry in &parsed.entries {
            lines.extend(self.render_entry(entry));
        }
        lines
    }

    /// File counts by status, hunk total and line totals.
    #[must_use]
    pub fn render_summary(&self, entries: &[DiffEntry]) -> Vec<Line> {
        let summary = Summary::from_entries(entries);
        let mut lines = vec![
            Line::blank(),
            self.rule('='),
            Line::styled(Role::Title, "Diff Summary"),
            self.rule('='),
            Line::blank(),
            Line::styled(Role::Label, "Files changed:")
                .with(Role::Plain, format!(" {}", summary.files)),
        ];

        for (status, role) in [
            (FileStatus::Modified, Role::Plain),
            (FileStatus::Added, Role::Added),
            (FileStatus::Deleted, Role::Deleted),
            (FileStatus::Renamed, Role::Renamed),
        ] {
            lines.push(
                Line::styled(Role::Plain, format!("  - {}: ", status.label()))
                    .with(role, summary.count(status).to_string()),
            );
        }
        if summary.failed > 0 {
            lines.push(
                Line::styled(Role::Plain, "  - Unparsed: ")
                    .with(Role::Failure, summary.failed.to_string()),
            );
        }
        if summary.binary > 0 {
            lines.push(
                Line::styled(Role::Label, "Binary files:")
                    .with(Role::Binary, format!(" {}", summary.binary)),
            );
        }

        lines.push(
            Line::styled(Role::Label, "Total sections:")
                .with(Role::Plain, format!(" {}", summary.hunks)),
        );
        lines.push(
            Line::styled(Role::Label, "Lines:")
                .with(Role::Plain, " ")
                .with(Role::Addition, format!("+{}", summary.stats.additions))
                .with(Role::Plain, " ")
                .with(Role::Deletion, format!("-{}", summary.stats.deletions)),
        );
        lines.push(self.rule('='));
        lines
    }

    /// Block for either a parsed file or a failure placeholder.
    #[must_use]
    pub fn render_entry(&self, entry: &DiffEntry) -> Vec<Line> {
        match entry {
            DiffEntry::File(file) => self.render_file(file),
            DiffEntry::Failed(failed) => self.render_failure(failed),
        }
    }

    /// Header naming the file, then each hunk with its lines in source order.
    #[must_use]
    pub fn render_file(&self, file: &FileDiff) -> Vec<Line> {
        let mut lines = vec![Line::blank(), file_header(file)];

        if let Some(mode) = &file.mode {
            if let (Some(old), Some(new)) = (&mode.old, &mode.new) {
                lines.push(Line::styled(Role::Note, format!("mode {old} → {new}")));
            }
        }
        lines.push(self.rule('─'));

        if let Some(notice) = &file.binary {
            lines.push(Line::styled(Role::Binary, notice.clone()));
            return lines;
        }

        for hunk in &file.hunks {
            lines.push(Line::blank());
            render_hunk(hunk, &mut lines);
        }
        lines
    }

    /// Placeholder shown in place of hunks for a discarded file section.
    #[must_use]
    pub fn render_failure(&self, failed: &FailedFile) -> Vec<Line> {
        vec![
            Line::blank(),
            Line::styled(Role::Label, "File:")
                .with(Role::Plain, " ")
                .with(Role::FileHeader, failed.path.clone())
                .with(Role::Plain, " ")
                .with(Role::Failure, "(unparsed)"),
            self.rule('─'),
            Line::styled(Role::Failure, format!("parse failed: {}", failed.reason)),
        ]
    }

    fn rule(&self, ch: char) -> Line {
        Line::styled(Role::Rule, ch.to_string().repeat(self.rule_width))
    }
}

fn file_header(file: &FileDiff) -> Line {
    let mut line = Line::styled(Role::Label, "File:").with(Role::Plain, " ");

    line = match (file.status, &file.old_path, &file.new_path) {
        (FileStatus::Renamed, Some(old), Some(new)) => line
            .with(Role::FileHeader, format!("{old} → {new}"))
            .with(Role::Plain, " ")
            .with(Role::Renamed, "(renamed)"),
        (FileStatus::Added, _, _) => line
            .with(Role::FileHeader, file.path())
            .with(Role::Plain, " ")
            .with(Role::Added, "(new file)"),
        (FileStatus::Deleted, _, _) => line
            .with(Role::FileHeader, file.path())
            .with(Role::Plain, " ")
            .with(Role::Deleted, "(deleted)"),
        _ => line.with(Role::FileHeader, file.path()),
    };

    if let Some(language) = language_for(file.path()) {
        line = line
            .with(Role::Plain, " ")
            .with(Role::Language, format!("[{language}]"));
    }
    if file.has_warnings() {
        line = line
            .with(Role::Plain, " ")
            .with(Role::Warning, "(incomplete hunks)");
    }
    line
}

fn render_hunk(hunk: &DiffHunk, lines: &mut Vec<Line>) {
    let mut header = Line::styled(Role::HunkHeader, hunk.header());
    if let Some(warning) = &hunk.warning {
        header = header
            .with(Role::Plain, " ")
            .with(Role::Warning, format!("[unterminated: {warning}]"));
    }
    lines.push(header);

    for line in &hunk.lines {
        let role = match line.kind {
            DiffLineKind::Addition => Role::Addition,
            DiffLineKind::Deletion => Role::Deletion,
            DiffLineKind::Context => Role::Context,
        };
        lines.push(Line::styled(role, line.to_string()));
    }
    for note in &hunk.notes {
        lines.push(Line::styled(Role::Note, note.clone()));
    }
}

/// Language name for a path, based on its extension.
#[must_use]
pub fn language_for(path: &str) -> Option<&'static str> {
    const LANGUAGES: &[(&str, &str)] = &[
        (".py", "python"),
        (".js", "javascript"),
        (".ts", "typescript"),
        (".jsx", "javascript"),
        (".tsx", "typescript"),
        (".java", "java"),
        (".go", "go"),
        (".rs", "rust"),
        (".c", "c"),
        (".cpp", "cpp"),
        (".h", "c"),
        (".hpp", "cpp"),
        (".css", "css"),
        (".html", "html"),
        (".json", "json"),
        (".yaml", "yaml"),
        (".yml", "yaml"),
        (".md", "markdown"),
        (".sh", "bash"),
        (".sql", "sql"),
        (".toml", "toml"),
    ];

    LANGUAGES
        .iter()
        .find(|(extension, _)| path.ends_with(extension))
        .map(|&(_, language)| language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_api::{DiffLine, DiffRange, FailureReason, HunkWarning, ModeChange};

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    fn modified(path: &str, hunks: Vec<DiffHunk>) -> FileDiff {
        FileDiff {
            old_path: Some(path.into()),
            new_path: Some(path.into()),
            status: FileStatus::Modified,
            mode: None,
            binary: None,
            hunks,
        }
    }

    fn hunk() -> DiffHunk {
        DiffHunk {
            range: DiffRange {
                old_start: 1,
                old_count: 2,
                new_start: 1,
                new_count: 3,
            },
            section: None,
            lines: vec![
                DiffLine::new(DiffLineKind::Context, "foo"),
                DiffLine::new(DiffLineKind::Addition, "bar"),
                DiffLine::new(DiffLineKind::Context, "baz"),
            ],
            notes: vec![],
            warning: None,
        }
    }

    #[test]
    fn file_block_restores_markers_in_order() {
        let rendered = texts(&DiffRenderer::new(4).render_file(&modified("notes.txt", vec![hunk()])));
        assert_eq!(
            rendered,
            vec![
                "",
                "File: notes.txt",
                "────",
                "",
                "@@ -1,2 +1,3 @@",
                " foo",
                "+bar",
                " baz",
            ]
        );
    }

    #[test]
    fn line_roles_follow_line_kind() {
        let rendered = DiffRenderer::default().render_file(&modified("a", vec![hunk()]));
        let roles: Vec<Role> = rendered[rendered.len() - 3..]
            .iter()
            .map(|line| line.spans[0].role)
            .collect();
        assert_eq!(roles, vec![Role::Context, Role::Addition, Role::Context]);
    }

    #[test]
    fn renamed_header_names_both_paths() {
        let file = FileDiff {
            old_path: Some("a.py".into()),
            new_path: Some("b.py".into()),
            status: FileStatus::Renamed,
            mode: None,
            binary: None,
            hunks: vec![],
        };
        let rendered = texts(&DiffRenderer::default().render_file(&file));
        assert_eq!(rendered[1], "File: a.py → b.py (renamed) [python]");
        assert_eq!(rendered.len(), 3);
    }

    #[test]
    fn added_file_without_hunks_renders_header_only() {
        let file = FileDiff {
            old_path: None,
            new_path: Some("empty.txt".into()),
            status: FileStatus::Added,
            mode: None,
            binary: None,
            hunks: vec![],
        };
        let rendered = texts(&DiffRenderer::new(3).render_file(&file));
        assert_eq!(rendered, vec!["", "File: empty.txt (new file)", "───"]);
    }

    #[test]
    fn binary_notice_is_rendered_verbatim() {
        let notice = "Binary files a/img.png and b/img.png differ";
        let mut file = modified("img.png", vec![]);
        file.binary = Some(notice.into());
        let rendered = texts(&DiffRenderer::default().render_file(&file));
        assert_eq!(rendered.last().map(String::as_str), Some(notice));
    }

    #[test]
    fn warning_annotates_hunk_header() {
        let mut flagged = hunk();
        flagged.warning = Some(HunkWarning {
            expected_old: 2,
            expected_new: 3,
            actual_old: 1,
            actual_new: 2,
        });
        let rendered = texts(&DiffRenderer::default().render_file(&modified("x", vec![flagged])));
        assert!(rendered[1].ends_with("(incomplete hunks)"));
        assert_eq!(
            rendered[4],
            "@@ -1,2 +1,3 @@ [unterminated: expected 2 old / 3 new lines, found 1 / 2]"
        );
    }

    #[test]
    fn failure_renders_placeholder() {
        let failed = FailedFile {
            path: "broken.rs".into(),
            reason: FailureReason::MalformedHunkHeader {
                header: "@@ -x @@".into(),
            },
        };
        let rendered = texts(&DiffRenderer::new(2).render_failure(&failed));
        assert_eq!(
            rendered,
            vec![
                "",
                "File: broken.rs (unparsed)",
                "──",
                "parse failed: malformed hunk header: @@ -x @@",
            ]
        );
    }

    #[test]
    fn summary_counts_by_status() {
        let entries = vec![
            DiffEntry::File(modified("a.txt", vec![hunk(), hunk()])),
            DiffEntry::File(modified("b.txt", vec![hunk()])),
        ];
        let rendered = texts(&DiffRenderer::new(1).render_summary(&entries));
        assert_eq!(
            rendered,
            vec![
                "",
                "=",
                "Diff Summary",
                "=",
                "",
                "Files changed: 2",
                "  - Modified: 2",
                "  - New: 0",
                "  - Deleted: 0",
                "  - Renamed: 0",
                "Total sections: 3",
                "Lines: +3 -0",
                "=",
            ]
        );
    }

    #[test]
    fn mode_change_is_noted() {
        let mut file = modified("run.sh", vec![]);
        file.mode = Some(ModeChange {
            old: Some("100644".into()),
            new: Some("100755".into()),
        });
        let rendered = texts(&DiffRenderer::default().render_file(&file));
        assert_eq!(rendered[1], "File: run.sh [bash]");
        assert_eq!(rendered[2], "mode 100644 → 100755");
    }

    #[test]
    fn painting_with_plain_table_matches_text() {
        let line = Line::styled(Role::Addition, "+x").with(Role::Warning, " !");
        assert_eq!(line.paint(&StyleTable::plain()), line.text());
        assert_ne!(line.paint(&StyleTable::ansi()), line.text());
    }

    #[test]
    fn language_lookup_uses_extension() {
        assert_eq!(language_for("src/main.rs"), Some("rust"));
        assert_eq!(language_for("Makefile"), None);
    }
}
