//! Committing and tagging a bump.
//!
//! [`Updater`] is the entry point: it checks the working tree, runs the
//! [`UpdatePipeline`], and, when a commit message is configured, hands the
//! outcome to a [`CommitCoordinator`] which runs the precommit hook and
//! commits and tags the rewritten files.

use camino::Utf8PathBuf;
use tracing::{debug, error, info, instrument, warn};

use crate::config::BumpConfig;
use crate::git::{Repository, default_tag_template, tag_name};
use crate::hooks::{HookContext, PrecommitHook, ShellHook};
use crate::source::{FileSink, FsSink, SourceFile};
use crate::update::{UpdateError, UpdateOutcome, UpdatePipeline, UpdateResult};
use crate::version::VersionResolver;

/// The directive used when none is given.
pub const DEFAULT_DIRECTIVE: &str = "minor";

// ──────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────

/// Options for a single update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Alias, increment keyword, or explicit version.
    pub version: String,
    /// Use `%s` instead of `v%s` as the default tag template.
    pub no_prefix: bool,
    /// Tag template; overrides `no_prefix` when set.
    pub tag_name: Option<String>,
    /// Commit message; the run commits and tags only when this is set.
    pub commit_message: Option<String>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_DIRECTIVE.into(),
            no_prefix: false,
            tag_name: None,
            commit_message: None,
        }
    }
}

impl From<&str> for UpdateOptions {
    fn from(version: &str) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

impl UpdateOptions {
    /// Options taken from the `[bump]` section of a loaded config.
    ///
    /// `precommit` commands are not options; [`Updater::from_config`]
    /// installs them as a hook.
    pub fn from_config(config: &BumpConfig) -> Self {
        Self {
            version: config.version.clone(),
            no_prefix: config.no_prefix,
            tag_name: config.tag_name.clone(),
            commit_message: config.commit_message.clone(),
        }
    }

    /// The tag template for this run.
    pub fn tag_template(&self) -> String {
        self.tag_name
            .clone()
            .unwrap_or_else(|| default_tag_template(self.no_prefix))
    }

    /// Whether the run ends in a commit.
    pub fn commits(&self) -> bool {
        self.commit_message.is_some()
    }
}

// ──────────────────────────────────────────────
// Coordinator
// ──────────────────────────────────────────────

/// Commits and tags the files an update rewrote.
#[derive(Debug, Clone)]
pub struct CommitCoordinator<R> {
    repo: R,
    message: String,
    tag_template: String,
}

impl<R: Repository> CommitCoordinator<R> {
    /// A coordinator committing to `repo` with `message`, tagging with `tag_template`.
    pub fn new(repo: R, message: impl Into<String>, tag_template: impl Into<String>) -> Self {
        Self {
            repo,
            message: message.into(),
            tag_template: tag_template.into(),
        }
    }

    /// Fail with [`UpdateError::DirtyRepository`] if the working tree has changes.
    pub fn ensure_clean(&self) -> UpdateResult<()> {
        if self.repo.is_clean()? {
            Ok(())
        } else {
            Err(UpdateError::DirtyRepository)
        }
    }

    /// The tag created for `version`.
    pub fn tag_for(&self, version: &str) -> String {
        tag_name(&self.tag_template, version)
    }

    /// Run `precommit`, then commit and tag the outcome's files.
    ///
    /// If the hook fails the working tree is checked out and the hook's
    /// error is returned. On success the outcome's message gains a line
    /// naming the tag.
    #[instrument(skip_all, fields(version = %outcome.new_version))]
    pub fn commit(
        &self,
        mut outcome: UpdateOutcome,
        precommit: Option<&mut (dyn PrecommitHook + '_)>,
    ) -> UpdateResult<UpdateOutcome> {
        if outcome.updated_files.is_empty() {
            info!("no files updated; nothing to commit");
            return Ok(outcome);
        }

        let tag = self.tag_for(&outcome.new_version);

        if let Some(hook) = precommit {
            let context = HookContext {
                version: outcome.new_version.clone(),
                tag: tag.clone(),
            };
            if let Err(e) = hook.run(&context) {
                warn!(error = %e, "precommit hook failed; discarding changes");
                if let Err(checkout) = self.repo.checkout() {
                    error!(error = %checkout, "could not discard changes");
                }
                return Err(UpdateError::Hook(e));
            }
            debug!("precommit hook passed");
        }

        self.repo.commit(
            &outcome.updated_files,
            &self.message,
            &outcome.new_version,
            &tag,
        )?;
        info!(%tag, files = outcome.updated_files.len(), "committed and tagged");

        if !outcome.message.is_empty() {
            outcome.message.push('\n');
        }
        outcome.message.push_str("Committed to git and created tag ");
        outcome.message.push_str(&tag);
        Ok(outcome)
    }
}

// ──────────────────────────────────────────────
// Updater
// ──────────────────────────────────────────────

/// Runs a full bump: clean check, file updates, precommit hook, commit.
pub struct Updater<'a, R> {
    options: UpdateOptions,
    repo: R,
    resolver: VersionResolver,
    sink: Box<dyn FileSink + 'a>,
    precommit: Option<Box<dyn PrecommitHook + 'a>>,
}

impl<R> std::fmt::Debug for Updater<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("options", &self.options)
            .field("resolver", &self.resolver)
            .field("precommit", &self.precommit.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, R: Repository> Updater<'a, R> {
    /// An updater writing files in place and committing through `repo`.
    pub fn new(options: impl Into<UpdateOptions>, repo: R) -> Self {
        Self {
            options: options.into(),
            repo,
            resolver: VersionResolver::default(),
            sink: Box::new(FsSink),
            precommit: None,
        }
    }

    /// An updater for the `[bump]` section of a loaded config.
    ///
    /// Non-empty `precommit` commands become a [`ShellHook`] running in `workdir`.
    pub fn from_config(config: &BumpConfig, repo: R, workdir: impl Into<Utf8PathBuf>) -> Self {
        let updater = Self::new(UpdateOptions::from_config(config), repo);
        if config.precommit.is_empty() {
            updater
        } else {
            debug!(commands = config.precommit.len(), "precommit hook from config");
            updater.with_precommit(ShellHook::new(config.precommit.clone(), workdir))
        }
    }

    /// Run `hook` before committing.
    pub fn with_precommit(mut self, hook: impl PrecommitHook + 'a) -> Self {
        self.precommit = Some(Box::new(hook));
        self
    }

    /// Send rewritten files to `sink`.
    pub fn with_sink(mut self, sink: impl FileSink + 'a) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Resolve directives with `resolver`.
    pub fn with_resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The options for this updater.
    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    /// The repository commits go to.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Bump every file in `files`.
    ///
    /// With a commit message set, a dirty working tree fails before any
    /// file is touched, and per-file errors skip the commit.
    #[instrument(skip_all, fields(directive = %self.options.version))]
    pub fn run<I>(&mut self, files: I) -> UpdateResult<UpdateOutcome>
    where
        I: IntoIterator,
        I::Item: Into<Option<SourceFile>>,
    {
        let coordinator = self.options.commit_message.as_deref().map(|message| {
            CommitCoordinator::new(&self.repo, message, self.options.tag_template())
        });

        if let Some(ref coordinator) = coordinator {
            coordinator.ensure_clean()?;
        }

        let outcome = UpdatePipeline::new(self.options.version.as_str())
            .with_resolver(self.resolver.clone())
            .with_sink(&mut *self.sink)
            .run(files)?;

        match coordinator {
            Some(coordinator) => coordinator.commit(outcome, self.precommit.as_deref_mut()),
            None => Ok(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use camino::Utf8Path;
    use tempfile::TempDir;

    use crate::git::MockRepository;
    use crate::hooks::{HookError, HookResult};

    fn utf8_tmp(tmp: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(tmp.path()).expect("tempdir is UTF-8")
    }

    fn write_manifest(root: &Utf8Path, name: &str, version: &str) -> SourceFile {
        let path = root.join(name);
        fs::write(&path, format!("{{\n  \"version\": \"{version}\"\n}}\n")).unwrap();
        SourceFile::read(&path).unwrap()
    }

    fn committing(version: &str) -> UpdateOptions {
        UpdateOptions {
            version: version.into(),
            commit_message: Some("Release %s".into()),
            ..UpdateOptions::default()
        }
    }

    #[test]
    fn options_default_to_minor() {
        let options = UpdateOptions::default();
        assert_eq!(options.version, "minor");
        assert!(!options.commits());
        assert_eq!(options.tag_template(), "v%s");
    }

    #[test]
    fn tag_template_precedence() {
        let mut options = UpdateOptions::from("patch");
        options.no_prefix = true;
        assert_eq!(options.tag_template(), "%s");
        options.tag_name = Some("release-%s".into());
        assert_eq!(options.tag_template(), "release-%s");
    }

    #[test]
    fn options_from_config() {
        let config = BumpConfig {
            version: "p".into(),
            commit_message: Some("Bump %s".into()),
            ..BumpConfig::default()
        };
        let options = UpdateOptions::from_config(&config);
        assert_eq!(options.version, "p");
        assert!(options.commits());
    }

    #[test]
    fn without_commit_message_repo_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let file = write_manifest(utf8_tmp(&tmp), "package.json", "1.2.3");
        let repo = MockRepository::dirty();

        let mut updater = Updater::new("patch", &repo);
        let outcome = updater.run([file]).unwrap();

        assert_eq!(outcome.new_version, "1.2.4");
        assert_eq!(outcome.message, "Updated package.json");
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn commits_and_tags() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let file = write_manifest(root, "package.json", "2.0.0");
        let repo = MockRepository::new();

        let outcome = Updater::new(committing("m"), &repo).run([file]).unwrap();

        assert_eq!(outcome.new_version, "3.0.0");
        assert_eq!(
            outcome.message,
            "Updated package.json\nCommitted to git and created tag v3.0.0"
        );
        let commits = repo.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "Release 3.0.0");
        assert_eq!(commits[0].tag, "v3.0.0");
        assert_eq!(commits[0].files, vec![root.join("package.json")]);
    }

    #[test]
    fn dirty_repo_fails_before_writing() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let file = write_manifest(root, "package.json", "1.0.0");
        let repo = MockRepository::dirty();

        let err = Updater::new(committing("patch"), &repo)
            .run([file])
            .unwrap_err();

        assert!(matches!(err, UpdateError::DirtyRepository));
        assert!(
            fs::read_to_string(root.join("package.json"))
                .unwrap()
                .contains("1.0.0")
        );
    }

    #[test]
    fn hook_failure_checks_out_and_skips_commit() {
        let tmp = TempDir::new().unwrap();
        let file = write_manifest(utf8_tmp(&tmp), "package.json", "1.0.0");
        let repo = MockRepository::new();

        let err = Updater::new(committing("patch"), &repo)
            .with_precommit(|_: &HookContext| -> HookResult<()> {
                Err(HookError::Rejected("tests failed".into()))
            })
            .run([file])
            .unwrap_err();

        assert_eq!(err.to_string(), "precommit hook failed: tests failed");
        assert_eq!(repo.checkouts(), 1);
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn hook_sees_version_and_tag() {
        let tmp = TempDir::new().unwrap();
        let file = write_manifest(utf8_tmp(&tmp), "package.json", "1.0.0");
        let repo = MockRepository::new();
        let mut seen = None;

        let mut options = committing("1.5.0");
        options.tag_name = Some("\"rel-%s\"".into());
        Updater::new(options, &repo)
            .with_precommit(|ctx: &HookContext| -> HookResult<()> {
                seen = Some(ctx.clone());
                Ok(())
            })
            .run([file])
            .unwrap();

        let seen = seen.unwrap();
        assert_eq!(seen.version, "1.5.0");
        assert_eq!(seen.tag, "rel-1.5.0");
        assert_eq!(repo.commits()[0].tag, "rel-1.5.0");
    }

    #[test]
    fn configured_precommit_failure_checks_out() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let file = write_manifest(root, "package.json", "1.0.0");
        let repo = MockRepository::new();
        let config = BumpConfig {
            version: "patch".into(),
            commit_message: Some("Release %s".into()),
            precommit: vec!["exit 1".into()],
            ..BumpConfig::default()
        };

        let err = Updater::from_config(&config, &repo, root)
            .run([file])
            .unwrap_err();

        assert!(matches!(err, UpdateError::Hook(_)));
        assert_eq!(repo.checkouts(), 1);
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn configured_precommit_runs_in_workdir() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let file = write_manifest(root, "package.json", "1.0.0");
        let repo = MockRepository::new();
        let config = BumpConfig {
            commit_message: Some("Release %s".into()),
            precommit: vec!["touch {tag}.checked".into()],
            ..BumpConfig::default()
        };

        let outcome = Updater::from_config(&config, &repo, root)
            .run([file])
            .unwrap();

        assert_eq!(outcome.new_version, "1.1.0");
        assert!(root.join("v1.1.0.checked").exists());
        assert_eq!(repo.commits().len(), 1);
    }

    #[test]
    fn commit_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let file = write_manifest(utf8_tmp(&tmp), "package.json", "1.0.0");
        let repo = MockRepository::new().failing_commits("nothing added");

        let err = Updater::new(committing("patch"), &repo)
            .run([file])
            .unwrap_err();
        assert!(matches!(err, UpdateError::Git(_)));
        assert_eq!(repo.checkouts(), 0);
    }

    #[test]
    fn file_errors_skip_commit() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let good = write_manifest(root, "package.json", "1.0.0");
        let bad = SourceFile::new(root.join("setup.py"), "version = '1.0.0'");
        let repo = MockRepository::new();

        let err = Updater::new(committing("patch"), &repo)
            .run([good, bad])
            .unwrap_err();

        assert_eq!(err.file_errors().len(), 1);
        assert!(repo.commits().is_empty());
        assert_eq!(
            err.partial_outcome().unwrap().updated_files,
            vec![root.join("package.json")]
        );
    }

    #[test]
    fn nothing_to_commit() {
        let repo = MockRepository::new();
        let outcome = Updater::new(committing("patch"), &repo)
            .run(Vec::<SourceFile>::new())
            .unwrap();
        assert!(!outcome.has_new_version());
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn coordinator_without_hook() {
        let repo = MockRepository::new();
        let coordinator = CommitCoordinator::new(&repo, "v%s", "%s");
        let outcome = UpdateOutcome {
            new_version: "0.2.0".into(),
            versions: [("a.json".to_string(), "0.2.0".to_string())].into(),
            message: String::new(),
            updated_files: vec!["a.json".into()],
        };

        let outcome = coordinator.commit(outcome, None).unwrap();
        assert_eq!(outcome.message, "Committed to git and created tag 0.2.0");
        assert_eq!(repo.commits()[0].message, "v0.2.0");
    }
}
