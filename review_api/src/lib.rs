//! Structured unified-diff model shared by the parser, the renderer, and any
//! layer built on top of a parsed diff.
//!
//! Every record here is a plain value: constructed once by the parser and only
//! read afterwards.

pub mod diff;
pub mod summary;

pub use diff::*;
pub use summary::*;
