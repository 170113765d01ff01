//! In-memory [`Repository`] that records calls, for tests.

use std::cell::{Cell, RefCell};

use camino::Utf8PathBuf;

use super::{GitError, GitResult, Repository, commit_message};

/// A commit recorded by [`MockRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    /// Files passed to the commit.
    pub files: Vec<Utf8PathBuf>,
    /// Commit message after version substitution.
    pub message: String,
    /// Version passed to the commit.
    pub version: String,
    /// Tag created for the commit.
    pub tag: String,
}

/// Mock repository for testing without a real git checkout
#[derive(Debug, Default)]
pub struct MockRepository {
    dirty: bool,
    commit_error: Option<String>,
    commits: RefCell<Vec<RecordedCommit>>,
    checkouts: Cell<usize>,
}

impl MockRepository {
    /// A clean repository that accepts commits.
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository reporting uncommitted changes.
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    /// Make every commit fail with `stderr`.
    pub fn failing_commits(mut self, stderr: impl Into<String>) -> Self {
        self.commit_error = Some(stderr.into());
        self
    }

    /// Commits made so far.
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.borrow().clone()
    }

    /// How many times the working tree was checked out.
    pub fn checkouts(&self) -> usize {
        self.checkouts.get()
    }
}

impl Repository for MockRepository {
    fn is_clean(&self) -> GitResult<bool> {
        Ok(!self.dirty)
    }

    fn commit(
        &self,
        files: &[Utf8PathBuf],
        message: &str,
        version: &str,
        tag: &str,
    ) -> GitResult<()> {
        if let Some(ref stderr) = self.commit_error {
            return Err(GitError::Command {
                command: "commit".into(),
                stderr: stderr.clone(),
            });
        }
        self.commits.borrow_mut().push(RecordedCommit {
            files: files.to_vec(),
            message: commit_message(message, version),
            version: version.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }

    fn checkout(&self) -> GitResult<()> {
        self.checkouts.set(self.checkouts.get() + 1);
        Ok(())
    }
}
