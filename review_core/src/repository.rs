//! Repository access and diff text generation built on top of libgit2.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{
    DiffFindOptions, DiffFormat, DiffOptions, ErrorClass, ErrorCode,
    Repository as GitRepository,
};
use tracing::debug;

use crate::{Error, Result};

/// Options for producing diff text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRequest {
    /// Unchanged lines shown around each change.
    pub context_lines: u32,
    /// Pair deleted and added files into renames.
    pub detect_renames: bool,
}

impl Default for DiffRequest {
    fn default() -> Self {
        Self {
            context_lines: 3,
            detect_renames: true,
        }
    }
}

/// Lightweight handle to the repository under review.
pub struct Repository {
    inner: GitRepository,
    root: PathBuf,
}

impl Repository {
    /// Open a repository from the given filesystem path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized, does not resolve
    /// to a git repository, or if libgit2 reports an unsupported repository
    /// layout (such as a bare repository).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::BareRepository {
                path: display_path(&canonical),
            })?;

        Ok(Self { inner: repo, root })
    }

    /// Returns the absolute path to the repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unified diff text between `reference` (default `HEAD`) and the working
    /// tree plus index, the same comparison `git diff <reference>` makes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeadRevision`] when no reference is given and
    /// HEAD is unborn, [`Error::UnknownReference`] when `reference` does not
    /// resolve, and propagates other libgit2 failures.
    pub fn diff_text(&self, reference: Option<&str>, request: &DiffRequest) -> Result<String> {
        if reference.is_none() && self.head_is_unborn()? {
            return Err(Error::MissingHeadRevision);
        }

        let revision = reference.unwrap_or("HEAD");
        let object = match self.inner.revparse_single(revision) {
            Ok(object) => object,
            Err(err) if matches!(err.code(), ErrorCode::NotFound | ErrorCode::Ambiguous) => {
                return Err(Error::UnknownReference {
                    reference: revision.to_owned(),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };
        let tree = object.peel_to_tree()?;

        let mut options = DiffOptions::new();
        options.context_lines(request.context_lines);
        let mut diff = self
            .inner
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut options))?;

        if request.detect_renames {
            let mut find = DiffFindOptions::new();
            find.renames(true);
            diff.find_similar(Some(&mut find))?;
        }

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if let origin @ ('+' | '-' | ' ') = line.origin() {
                text.push(origin);
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        debug!(
            reference = revision,
            files = diff.deltas().len(),
            bytes = text.len(),
            "generated diff text"
        );
        Ok(text)
    }

    fn head_is_unborn(&self) -> Result<bool> {
        match self.inner.head() {
            Ok(_) => Ok(false),
            Err(err)
                if matches!(
                    (err.class(), err.code()),
                    (
                        ErrorClass::Reference,
                        ErrorCode::NotFound | ErrorCode::UnbornBranch
                    )
                ) =>
            {
                Ok(true)
            }
            Err(err) => Err(Error::from(err)),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_path_buf()
        .into_os_string()
        .to_string_lossy()
        .into_owned()
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Repository as GitRepository};
    use tempfile::TempDir;

    #[test]
    fn open_non_repository_returns_error() {
        let temp = TempDir::new().expect("tempdir");
        let err = Repository::open(temp.path());
        assert!(matches!(err, Err(Error::NotARepository { .. })));
    }

    #[test]
    fn open_missing_path_is_io_error() {
        let temp = TempDir::new().expect("tempdir");
        let err = Repository::open(temp.path().join("missing"));
        assert!(matches!(err, Err(Error::Io { .. })));
    }

    #[test]
    fn unborn_head_has_nothing_to_diff() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        GitRepository::init(temp.path())?;

        let repo = Repository::open(temp.path())?;
        let result = repo.diff_text(None, &DiffRequest::default());
        assert!(matches!(result, Err(Error::MissingHeadRevision)));
        Ok(())
    }

    #[test]
    fn clean_tree_produces_empty_text() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        std::fs::write(temp.path().join("README.md"), "hello\n").expect("write file");
        commit_all(&git_repo, "Initial commit")?;

        let repo = Repository::open(temp.path())?;
        assert_eq!(repo.diff_text(None, &DiffRequest::default())?, "");
        Ok(())
    }

    #[test]
    fn modified_file_produces_git_style_patch() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        std::fs::write(temp.path().join("file.txt"), "one\n").expect("write file");
        commit_all(&git_repo, "Initial commit")?;
        std::fs::write(temp.path().join("file.txt"), "one\ntwo\n").expect("write file");

        let repo = Repository::open(temp.path())?;
        let text = repo.diff_text(None, &DiffRequest::default())?;
        assert!(text.starts_with("diff --git a/file.txt b/file.txt\n"));
        assert!(text.contains("\n@@ -1"));
        assert!(text.ends_with(" one\n+two\n"));
        Ok(())
    }

    fn commit_all(repo: &GitRepository, message: &str) -> Result<()> {
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature = git2::Signature::now("Test User", "test@example.com")?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(())
    }
}
