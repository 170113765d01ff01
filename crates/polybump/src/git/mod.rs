//! Version-control operations needed to commit and tag a bump.
//!
//! The [`Repository`] trait is the seam: [`GitCli`] shells out to `git`,
//! which means we inherit the user's signing setup, hooks and other
//! configuration, and [`MockRepository`] records calls for tests.

pub mod mock;

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

pub use mock::MockRepository;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "commit").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// The repository operations a bump needs.
pub trait Repository {
    /// Whether the working tree has no staged or unstaged changes.
    fn is_clean(&self) -> GitResult<bool>;

    /// Stage `files`, commit them with `message`, and create `tag`.
    ///
    /// A `%s` in `message` is replaced with `version`.
    fn commit(
        &self,
        files: &[Utf8PathBuf],
        message: &str,
        version: &str,
        tag: &str,
    ) -> GitResult<()>;

    /// Discard all working-tree changes.
    fn checkout(&self) -> GitResult<()>;
}

impl<R: Repository + ?Sized> Repository for &R {
    fn is_clean(&self) -> GitResult<bool> {
        (**self).is_clean()
    }

    fn commit(
        &self,
        files: &[Utf8PathBuf],
        message: &str,
        version: &str,
        tag: &str,
    ) -> GitResult<()> {
        (**self).commit(files, message, version, tag)
    }

    fn checkout(&self) -> GitResult<()> {
        (**self).checkout()
    }
}

/// A repository driven through the `git` command line.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    workdir: Option<Utf8PathBuf>,
}

impl GitCli {
    /// Operate on the repository containing the current directory.
    pub const fn new() -> Self {
        Self { workdir: None }
    }

    /// Operate on the repository containing `dir`.
    pub fn in_dir(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }

    /// Check if the working directory is inside a git repository.
    #[instrument(skip(self))]
    pub fn is_inside_repo(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Files as `git add` must name them. Relative paths are relative to the
    /// process, so they are anchored there when git runs in another directory.
    fn pathspecs(&self, files: &[Utf8PathBuf]) -> GitResult<Vec<Utf8PathBuf>> {
        if self.workdir.is_none() || files.iter().all(|p| p.is_absolute()) {
            return Ok(files.to_vec());
        }
        let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)
            .map_err(|e| GitError::Exec(e.into_io_error()))?;
        Ok(files.iter().map(|p| cwd.join(p)).collect())
    }

    /// Run a git command and return its stdout.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir.as_std_path());
        }
        let output = cmd.output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepo);
            }

            Err(GitError::Command {
                command: args.first().unwrap_or(&"").to_string(),
                stderr,
            })
        }
    }
}

impl Repository for GitCli {
    #[instrument(skip(self))]
    fn is_clean(&self) -> GitResult<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        let clean = output.trim().is_empty();
        debug!(clean, "working tree status");
        Ok(clean)
    }

    #[instrument(skip(self, files), fields(count = files.len()))]
    fn commit(
        &self,
        files: &[Utf8PathBuf],
        message: &str,
        version: &str,
        tag: &str,
    ) -> GitResult<()> {
        let message = commit_message(message, version);

        let pathspecs = self.pathspecs(files)?;
        let mut add = vec!["add", "--"];
        add.extend(pathspecs.iter().map(|p| p.as_str()));
        self.git(&add)?;

        self.git(&["commit", "-m", &message])?;
        self.git(&["tag", "-a", tag, "-m", &message])?;
        debug!(%tag, "committed and tagged");
        Ok(())
    }

    #[instrument(skip(self))]
    fn checkout(&self) -> GitResult<()> {
        self.git(&["checkout", "--", "."])?;
        debug!("discarded working-tree changes");
        Ok(())
    }
}

/// Substitute the version into a commit message template.
pub fn commit_message(template: &str, version: &str) -> String {
    template.replace("%s", version)
}

/// Build a tag name from a template such as `v%s`.
///
/// The first `%s` is replaced with `version` and all quote characters are
/// removed from the result.
pub fn tag_name(template: &str, version: &str) -> String {
    template
        .replacen("%s", version, 1)
        .chars()
        .filter(|c| !matches!(c, '"' | '\''))
        .collect()
}

/// The default tag template: `v%s`, or `%s` without the prefix.
pub fn default_tag_template(no_prefix: bool) -> String {
    if no_prefix { "%s".into() } else { "v%s".into() }
}

/// Whether `path` is inside a git working tree.
pub fn is_inside_repo(path: &Utf8Path) -> bool {
    GitCli::in_dir(path).is_inside_repo().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_tmp(tmp: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(tmp.path()).expect("tempdir is UTF-8")
    }

    /// Initialize a throwaway repository with one commit, or `None` when
    /// `git` is unavailable.
    fn init_repo(root: &Utf8Path) -> Option<GitCli> {
        let repo = GitCli::in_dir(root);
        repo.git(&["init", "--quiet"]).ok()?;
        repo.git(&["config", "user.email", "dev@example.com"]).ok()?;
        repo.git(&["config", "user.name", "Dev"]).ok()?;
        repo.git(&["config", "commit.gpgsign", "false"]).ok()?;
        repo.git(&["config", "tag.gpgsign", "false"]).ok()?;
        fs::write(root.join("package.json"), "{\"version\": \"1.0.0\"}\n").ok()?;
        repo.git(&["add", "."]).ok()?;
        repo.git(&["commit", "--quiet", "-m", "init"]).ok()?;
        Some(repo)
    }

    #[test]
    fn tag_name_substitutes_version() {
        assert_eq!(tag_name("v%s", "1.2.3"), "v1.2.3");
        assert_eq!(tag_name("%s", "1.2.3"), "1.2.3");
        assert_eq!(tag_name("release-%s-final", "2.0.0"), "release-2.0.0-final");
    }

    #[test]
    fn tag_name_strips_quotes() {
        assert_eq!(tag_name("\"v%s\"", "1.2.3"), "v1.2.3");
        assert_eq!(tag_name("'v%s'", "1.2.3"), "v1.2.3");
    }

    #[test]
    fn tag_name_replaces_first_placeholder_only() {
        assert_eq!(tag_name("%s-%s", "1.0.0"), "1.0.0-%s");
    }

    #[test]
    fn default_template_prefix() {
        assert_eq!(default_tag_template(false), "v%s");
        assert_eq!(default_tag_template(true), "%s");
    }

    #[test]
    fn commit_message_substitutes_version() {
        assert_eq!(commit_message("Release %s", "1.2.3"), "Release 1.2.3");
        assert_eq!(commit_message("Bump version", "1.2.3"), "Bump version");
    }

    #[test]
    fn outside_repo_is_not_inside() {
        let tmp = TempDir::new().unwrap();
        let nested = utf8_tmp(&tmp).join("plain");
        fs::create_dir(&nested).unwrap();
        // A temp dir could itself live under a repo; only assert it doesn't error.
        let _ = is_inside_repo(&nested);
    }

    #[test]
    fn relative_files_are_anchored_to_process_dir() {
        let cwd = Utf8PathBuf::try_from(std::env::current_dir().unwrap()).unwrap();
        let files: Vec<Utf8PathBuf> = vec!["package.json".into(), "/abs/AssemblyInfo.cs".into()];

        let anchored = GitCli::in_dir("/somewhere/else").pathspecs(&files).unwrap();
        assert_eq!(
            anchored,
            vec![cwd.join("package.json"), Utf8PathBuf::from("/abs/AssemblyInfo.cs")]
        );

        assert_eq!(GitCli::new().pathspecs(&files).unwrap(), files);
    }

    #[test]
    fn git_error_on_bad_command() {
        let result = GitCli::new().git(&["not-a-real-subcommand"]);
        assert!(result.is_err());
    }

    #[test]
    fn clean_dirty_commit_and_checkout() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let Some(repo) = init_repo(root) else {
            return;
        };

        assert!(repo.is_clean().unwrap());

        let manifest = root.join("package.json");
        fs::write(&manifest, "{\"version\": \"1.1.0\"}\n").unwrap();
        assert!(!repo.is_clean().unwrap());

        repo.commit(&[manifest.clone()], "Release %s", "1.1.0", "v1.1.0")
            .unwrap();
        assert!(repo.is_clean().unwrap());
        assert_eq!(repo.git(&["tag", "--list"]).unwrap().trim(), "v1.1.0");
        assert_eq!(
            repo.git(&["log", "-1", "--format=%s"]).unwrap().trim(),
            "Release 1.1.0"
        );

        fs::write(&manifest, "{\"version\": \"9.9.9\"}\n").unwrap();
        repo.checkout().unwrap();
        assert_eq!(
            fs::read_to_string(&manifest).unwrap(),
            "{\"version\": \"1.1.0\"}\n"
        );
    }
}
