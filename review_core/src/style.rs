use std::collections::HashMap;
use std::io::IsTerminal;

use crossterm::style::{ContentStyle, Stylize};
use serde::{Deserialize, Serialize};

/// Presentation token attached to each piece of rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Unstyled text.
    Plain,
    /// Block titles such as "Diff Summary".
    Title,
    /// Field labels such as "Files changed:".
    Label,
    /// Horizontal separators.
    Rule,
    /// The path in a file header.
    FileHeader,
    /// `@@ ... @@` lines.
    HunkHeader,
    /// Added lines.
    Addition,
    /// Removed lines.
    Deletion,
    /// Unchanged context lines.
    Context,
    /// New-file markers and counts.
    Added,
    /// Deleted-file markers and counts.
    Deleted,
    /// Rename markers and counts.
    Renamed,
    /// Binary file notices.
    Binary,
    /// Hunk annotations and mode changes.
    Note,
    /// Inconsistencies that did not stop parsing.
    Warning,
    /// File sections that could not be parsed.
    Failure,
    /// Language hint derived from the file extension.
    Language,
}

/// When to emit terminal styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Style only when writing to a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always style.
    Always,
    /// Never style.
    Never,
}

impl ColorMode {
    /// Decide whether to style given the output destination.
    #[must_use]
    pub const fn enabled(self, is_terminal: bool, no_color: bool) -> bool {
        match self {
            Self::Auto => is_terminal && !no_color,
            Self::Always => true,
            Self::Never => false,
        }
    }

    /// Decide for standard output of the current process.
    #[must_use]
    pub fn enabled_for_stdout(self) -> bool {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        self.enabled(std::io::stdout().is_terminal(), no_color)
    }
}

/// Lookup table from [`Role`] to terminal style.
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: HashMap<Role, ContentStyle>,
}

impl StyleTable {
    /// Table that leaves all text unstyled.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            styles: HashMap::new(),
        }
    }

    /// Default colour scheme.
    #[must_use]
    pub fn ansi() -> Self {
        let base = ContentStyle::new();
        let styles = HashMap::from([
            (Role::Title, base.cyan().bold()),
            (Role::Label, base.blue().bold()),
            (Role::Rule, base.dim()),
            (Role::FileHeader, base.bold()),
            (Role::HunkHeader, base.cyan()),
            (Role::Addition, base.green()),
            (Role::Deletion, base.red()),
            (Role::Context, base.dim()),
            (Role::Added, base.green()),
            (Role::Deleted, base.red()),
            (Role::Renamed, base.yellow()),
            (Role::Binary, base.magenta()),
            (Role::Note, base.dim().italic()),
            (Role::Warning, base.yellow().bold()),
            (Role::Failure, base.red().bold()),
            (Role::Language, base.dim()),
        ]);
        Self { styles }
    }

    /// Pick [`StyleTable::ansi`] or [`StyleTable::plain`].
    #[must_use]
    pub fn for_output(styled: bool) -> Self {
        if styled {
            Self::ansi()
        } else {
            Self::plain()
        }
    }

    /// Style registered for a role, if any.
    #[must_use]
    pub fn style(&self, role: Role) -> Option<ContentStyle> {
        self.styles.get(&role).copied()
    }

    /// Render `text` for `role`.
    #[must_use]
    pub fn paint(&self, role: Role, text: &str) -> String {
        match self.style(role) {
            Some(style) => style.apply(text).to_string(),
            None => text.to_owned(),
        }
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::ansi()
    }
}
