//! The multi-file update pipeline.
//!
//! Files stream through one at a time, in discovery order:
//!
//! 1. pick a [`FileFormat`] from the extension,
//! 2. parse the file and read its current version,
//! 3. resolve the directive against that version,
//! 4. rewrite the file with the run's canonical version,
//! 5. hand the new bytes to the [`FileSink`].
//!
//! Problems with a single file (unknown extension, bad JSON, missing
//! `AssemblyVersion`) are collected and reported together once the stream
//! ends. A directive that cannot be resolved stops the run at that file.
//! Files written before the stop stay written.

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::format::{FileFormat, FormatError, FormatResult, ParsedFile};
use crate::git::GitError;
use crate::hooks::HookError;
use crate::source::{FileSink, FsSink, SourceFile};
use crate::version::VersionResolver;

/// Reported as the new version when no file resolved one.
pub const NO_VERSION: &str = "N/A";

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// A problem with one file. The rest of the run carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// The file that failed.
    pub path: Utf8PathBuf,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors from an update run.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The directive produced no valid version for a file. The run stopped there.
    #[error("Version bump failed, {directive} is not valid version.")]
    Resolution {
        /// The directive as given.
        directive: String,
        /// The file being processed when resolution failed.
        path: Utf8PathBuf,
        /// Files already written before the run stopped.
        persisted: Vec<Utf8PathBuf>,
        /// Per-file errors recorded before the run stopped.
        errors: Vec<FileError>,
    },

    /// Some files could not be updated; the rest were.
    #[error("{}", bullet_list(.errors))]
    Files {
        /// One entry per failed file.
        errors: Vec<FileError>,
        /// What did get updated.
        outcome: Box<UpdateOutcome>,
    },

    /// Some files could not be read while reporting current versions.
    #[error("{}", bullet_list(.errors))]
    Report {
        /// One entry per failed file.
        errors: Vec<FileError>,
        /// Versions of the files that could be read.
        versions: BTreeMap<String, String>,
    },

    /// A commit was requested but the working tree has changes.
    #[error("git working directory not clean, commit or stash changes first")]
    DirtyRepository,

    /// Committing or tagging failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The precommit hook failed; working-tree changes were discarded.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl UpdateError {
    /// The partial outcome carried by a per-file failure, if any.
    pub fn partial_outcome(&self) -> Option<&UpdateOutcome> {
        match self {
            Self::Files { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Per-file errors recorded during the run, including before a fatal stop.
    pub fn file_errors(&self) -> &[FileError] {
        match self {
            Self::Resolution { errors, .. }
            | Self::Files { errors, .. }
            | Self::Report { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Result alias for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

fn bullet_list(errors: &[FileError]) -> String {
    errors
        .iter()
        .map(|e| format!(" * {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ──────────────────────────────────────────────
// Outcome
// ──────────────────────────────────────────────

/// What an update run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// The version written to every file, or [`NO_VERSION`].
    pub new_version: String,
    /// File name → version written to it.
    pub versions: BTreeMap<String, String>,
    /// Human-readable summary, one line per updated file.
    pub message: String,
    /// Paths of the files that were written.
    pub updated_files: Vec<Utf8PathBuf>,
}

impl UpdateOutcome {
    /// Whether any file resolved a version.
    pub fn has_new_version(&self) -> bool {
        self.new_version != NO_VERSION
    }
}

// ──────────────────────────────────────────────
// Files
// ──────────────────────────────────────────────

/// A discovered file after parsing.
#[derive(Debug, Clone)]
pub struct VersionedFile {
    /// Where the file lives.
    pub path: Utf8PathBuf,
    /// The format picked from the extension.
    pub format: FileFormat,
    document: ParsedFile,
    new_version: Option<String>,
}

impl VersionedFile {
    /// Detect the format and parse the contents.
    pub fn parse(file: &SourceFile) -> FormatResult<Self> {
        let format = FileFormat::detect(&file.path)?;
        let document = format.parse(&file.contents)?;
        Ok(Self {
            path: file.path.clone(),
            format,
            document,
            new_version: None,
        })
    }

    /// The version the file carries now.
    pub fn current_version(&self) -> Option<&str> {
        self.document.current_version()
    }

    /// The version written by the last [`rewrite`](Self::rewrite).
    pub fn new_version(&self) -> Option<&str> {
        self.new_version.as_deref()
    }

    /// Store `version` in the document and return the new contents.
    pub fn rewrite(&mut self, version: &str) -> FormatResult<Vec<u8>> {
        let contents = self.document.rewrite(version)?;
        self.new_version = Some(version.to_string());
        Ok(contents)
    }

    /// The file name without its directory.
    pub fn basename(&self) -> &str {
        basename(&self.path)
    }
}

fn basename(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}

// ──────────────────────────────────────────────
// Run state
// ──────────────────────────────────────────────

/// Everything one run accumulates. Never shared between runs.
#[derive(Debug, Default)]
struct RunState {
    canonical: Option<String>,
    versions: BTreeMap<String, String>,
    updated: Vec<Utf8PathBuf>,
    errors: Vec<FileError>,
}

impl RunState {
    /// Take a file's resolved version and return the version to write.
    ///
    /// The first version resolved in a run is canonical for the whole run.
    fn adopt(&mut self, path: &Utf8Path, resolved: String) -> String {
        match self.canonical {
            Some(ref canonical) => {
                if *canonical != resolved {
                    warn!(
                        %path,
                        %resolved,
                        %canonical,
                        "file resolved a different version; writing the canonical one"
                    );
                }
                canonical.clone()
            }
            None => {
                debug!(%resolved, "canonical version");
                self.canonical = Some(resolved.clone());
                resolved
            }
        }
    }

    fn record_error(&mut self, path: &Utf8Path, err: impl fmt::Display) {
        warn!(%path, error = %err, "skipping file");
        self.errors.push(FileError {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
    }

    fn record_update(&mut self, path: &Utf8Path, version: String) {
        self.versions.insert(basename(path).to_string(), version);
        self.updated.push(path.to_path_buf());
    }

    fn finish(self) -> UpdateResult<UpdateOutcome> {
        let message = self
            .updated
            .iter()
            .map(|path| format!("Updated {}", basename(path)))
            .collect::<Vec<_>>()
            .join("\n");

        let outcome = UpdateOutcome {
            new_version: self.canonical.unwrap_or_else(|| NO_VERSION.to_string()),
            versions: self.versions,
            message,
            updated_files: self.updated,
        };

        info!(
            new_version = %outcome.new_version,
            updated = outcome.updated_files.len(),
            failed = self.errors.len(),
            "update finished"
        );

        if self.errors.is_empty() {
            Ok(outcome)
        } else {
            Err(UpdateError::Files {
                errors: self.errors,
                outcome: Box::new(outcome),
            })
        }
    }
}

// ──────────────────────────────────────────────
// Pipeline
// ──────────────────────────────────────────────

/// Applies one version directive to a stream of files.
#[derive(Debug, Clone)]
pub struct UpdatePipeline<S = FsSink> {
    directive: String,
    resolver: VersionResolver,
    sink: S,
}

impl UpdatePipeline<FsSink> {
    /// A pipeline that writes files in place.
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            resolver: VersionResolver::default(),
            sink: FsSink,
        }
    }
}

impl<S: FileSink> UpdatePipeline<S> {
    /// Send rewritten files to `sink` instead.
    pub fn with_sink<T: FileSink>(self, sink: T) -> UpdatePipeline<T> {
        UpdatePipeline {
            directive: self.directive,
            resolver: self.resolver,
            sink,
        }
    }

    /// Resolve directives with a custom resolver (e.g. other aliases).
    pub fn with_resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The directive this pipeline applies.
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Run the pipeline over `files`.
    ///
    /// Items may be [`SourceFile`]s or `Option<SourceFile>`s; `None` items
    /// are end markers and are skipped.
    #[instrument(skip_all, fields(directive = %self.directive))]
    pub fn run<I>(&mut self, files: I) -> UpdateResult<UpdateOutcome>
    where
        I: IntoIterator,
        I::Item: Into<Option<SourceFile>>,
    {
        let mut state = RunState::default();

        for file in files.into_iter().filter_map(Into::into) {
            self.process(file, &mut state)?;
        }

        state.finish()
    }

    fn process(&mut self, file: SourceFile, state: &mut RunState) -> UpdateResult<()> {
        let mut versioned = match VersionedFile::parse(&file) {
            Ok(v) => v,
            Err(e) => {
                state.record_error(&file.path, e);
                return Ok(());
            }
        };

        let Some(resolved) = self
            .resolver
            .resolve(&self.directive, versioned.current_version())
        else {
            return Err(UpdateError::Resolution {
                directive: self.directive.clone(),
                path: file.path,
                persisted: std::mem::take(&mut state.updated),
                errors: std::mem::take(&mut state.errors),
            });
        };

        let version = state.adopt(&file.path, resolved);
        let contents = match versioned.rewrite(&version) {
            Ok(contents) => contents,
            Err(e) => {
                state.record_error(&file.path, e);
                return Ok(());
            }
        };

        match self.sink.persist(&file.path, &contents) {
            Ok(()) => {
                debug!(
                    path = %file.path,
                    format = %versioned.format,
                    to = %version,
                    "updated file"
                );
                state.record_update(&file.path, version);
            }
            Err(e) => state.record_error(&file.path, e),
        }

        Ok(())
    }
}

// ──────────────────────────────────────────────
// Report
// ──────────────────────────────────────────────

/// Read every file's current version without changing anything.
///
/// Returns file name → version. Files that cannot be read, or carry no
/// version, are reported together in [`UpdateError::Report`] alongside the
/// versions that could be read.
#[instrument(skip_all)]
pub fn current_versions<I>(files: I) -> UpdateResult<BTreeMap<String, String>>
where
    I: IntoIterator,
    I::Item: Into<Option<SourceFile>>,
{
    let mut versions = BTreeMap::new();
    let mut errors = Vec::new();

    for file in files.into_iter().filter_map(Into::into) {
        let current = VersionedFile::parse(&file).and_then(|versioned| {
            versioned
                .current_version()
                .map(str::to_string)
                .ok_or(FormatError::NoVersion)
        });

        match current {
            Ok(version) => {
                versions.insert(file.basename().to_string(), version);
            }
            Err(e) => errors.push(FileError {
                path: file.path,
                message: e.to_string(),
            }),
        }
    }

    debug!(found = versions.len(), failed = errors.len(), "read current versions");

    if errors.is_empty() {
        Ok(versions)
    } else {
        Err(UpdateError::Report { errors, versions })
    }
}
