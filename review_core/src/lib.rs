//! Core library behind `cc-review`.
//!
//! The crate is layered around three responsibilities:
//! - turning unified diff text into the structured model from `review_api`
//! - rendering that model as styled terminal lines
//! - producing diff text from a git repository for the command-line wrapper

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Layered configuration (defaults, config file, environment).
pub mod config;
/// Unified diff text to structured model.
pub mod parser;
/// Structured model to role-tagged terminal lines.
pub mod render;
/// Git repository access and diff text generation.
pub mod repository;
/// Presentation lookup table from roles to terminal styles.
pub mod style;

pub use review_api as api;

pub use config::ReviewConfig;
pub use parser::{parse, DiffParser, ParseMode};
pub use render::{DiffRenderer, Line, Span};
pub use repository::{DiffRequest, Repository};
pub use style::{ColorMode, Role, StyleTable};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
///
/// Parsing never fails; malformed file sections are reported as values in
/// [`api::ParsedDiff`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error bubbled up by the core library.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Bare repositories have no working tree to diff.
    #[error("repository at {path} is bare and unsupported")]
    BareRepository {
        /// Path of the repository lacking a working tree.
        path: String,
    },
    /// Repository has no commit to diff the working tree against.
    #[error("repository has no head revision to diff against")]
    MissingHeadRevision,
    /// The requested commit or branch could not be resolved.
    #[error("unknown revision: {reference}")]
    UnknownReference {
        /// Reference exactly as supplied by the caller.
        reference: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Configuration could not be loaded or had the wrong shape.
    #[error("invalid configuration: {source}")]
    Config {
        /// Error reported by the configuration layers.
        #[source]
        source: Box<figment::Error>,
    },
}
