//! Bump one semantic version across JSON manifests and `AssemblyInfo.cs` files.
//!
//! A run takes a version directive (an increment keyword such as `patch`, a
//! short alias such as `p`, or an explicit version such as `1.2.3`) and a
//! stream of discovered files. The first file's resolved version becomes the
//! version written to every file. Optionally the rewritten files are then
//! committed and tagged.
//!
//! # Modules
//!
//! - [`version`] - Directive resolution, aliases, and semver increments
//! - [`format`] - Reading and rewriting JSON and `AssemblyInfo.cs` files
//! - [`source`] - Discovered files and where rewritten files go
//! - [`update`] - The multi-file update pipeline and version reports
//! - [`commit`] - Clean-tree check, precommit hook, commit and tag
//! - [`git`] - Repository operations behind a trait
//! - [`hooks`] - Precommit hooks
//! - [`config`] - Layered configuration for run defaults
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use polybump::{GitCli, SourceFile, UpdateOptions, Updater};
//!
//! let files = ["package.json", "Properties/AssemblyInfo.cs"]
//!     .into_iter()
//!     .map(|path| SourceFile::read(Utf8Path::new(path)))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let options = UpdateOptions {
//!     commit_message: Some("Release %s".into()),
//!     ..UpdateOptions::from("patch")
//! };
//! let outcome = Updater::new(options, GitCli::new()).run(files)?;
//! println!("{}", outcome.message);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(unsafe_code)]

pub mod commit;

pub mod config;

pub mod format;

pub mod git;

pub mod hooks;

pub mod source;

pub mod update;

pub mod version;

pub use commit::{CommitCoordinator, UpdateOptions, Updater};

pub use config::{BumpConfig, Config, ConfigError, ConfigLoader, ConfigResult};

pub use git::{GitCli, Repository};

pub use source::{FileSink, FsSink, SourceFile};

pub use update::{
    NO_VERSION, UpdateError, UpdateOutcome, UpdatePipeline, UpdateResult, current_versions,
};

pub use version::VersionResolver;

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
