use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    parser::ParseMode, render::DEFAULT_RULE_WIDTH, repository::DiffRequest, style::ColorMode,
    Error, Result,
};

// Three equivalent ways to configure, later layers winning:
//
//   defaults
//   .cc-review.toml:   strict = true
//   env var:           CC_REVIEW_STRICT=true

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = ".cc-review.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "CC_REVIEW_";

/// Tunables for parsing, rendering and diff generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// When to emit terminal styling.
    pub color: ColorMode,
    /// Reject hunks whose body disagrees with the header instead of flagging them.
    pub strict: bool,
    /// Width of horizontal rules.
    pub rule_width: usize,
    /// Context lines git includes around each change.
    pub context_lines: u32,
    /// Ask git to pair deletions and additions into renames.
    pub detect_renames: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            strict: false,
            rule_width: DEFAULT_RULE_WIDTH,
            context_lines: 3,
            detect_renames: true,
        }
    }
}

impl ReviewConfig {
    /// Layer defaults, the TOML file at `path` (if present) and `CC_REVIEW_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file is not valid TOML or a value has the wrong type.
    pub fn load(path: &Path) -> Result<Self> {
        figment(path).extract().map_err(|source| Error::Config {
            source: Box::new(source),
        })
    }

    /// Parser policy implied by [`ReviewConfig::strict`].
    #[must_use]
    pub const fn parse_mode(&self) -> ParseMode {
        if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        }
    }

    /// Diff generation options for the repository collaborator.
    #[must_use]
    pub const fn diff_request(&self) -> DiffRequest {
        DiffRequest {
            context_lines: self.context_lines,
            detect_renames: self.detect_renames,
        }
    }
}

/// Build the layered figment without extracting it.
#[must_use]
pub fn figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(ReviewConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["log"]))
}
