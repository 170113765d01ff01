//! Run defaults from config files.
//!
//! Layers, later ones winning:
//!
//! - built-in defaults (`version = "minor"`, no commit),
//! - `config.<ext>` in the user config dir,
//! - the nearest `.polybump.<ext>` or `polybump.<ext>`, searching upward
//!   from a start directory and stopping above a `.git` directory,
//! - files added with [`ConfigLoader::with_file`].
//!
//! `<ext>` is `toml`, `yaml`, `yml` or `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use polybump::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("default directive: {}", config.bump.version);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The configuration for polybump.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Defaults for the bump itself.
    pub bump: BumpConfig,
}

/// Defaults for a bump run.
///
/// # Example
///
/// ```toml
/// [bump]
/// version = "patch"
/// commit_message = "Release %s"
/// precommit = ["cargo test"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BumpConfig {
    /// Directive used when none is given: alias, keyword, or explicit version.
    pub version: String,
    /// Leave the `v` off the default tag template.
    pub no_prefix: bool,
    /// Tag template; `%s` is replaced with the new version.
    pub tag_name: Option<String>,
    /// Commit message; when set, the bump is committed and tagged.
    pub commit_message: Option<String>,
    /// Shell commands to run before committing (e.g. the test suite).
    pub precommit: Vec<String>,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            version: "minor".into(),
            no_prefix: false,
            tag_name: None,
            commit_message: None,
            precommit: Vec::new(),
        }
    }
}

/// Config file extensions, tried in this order in each directory.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Directory name under the user config dir and stem of project config files.
const APP_NAME: &str = "polybump";

/// Layers [`Config`] from defaults, the user config dir, the nearest project
/// config and explicit files.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search_from: Option<Utf8PathBuf>,
    skip_user_config: bool,
    boundary: Option<String>,
    files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// A loader that reads the user config and stops project search at `.git`.
    pub fn new() -> Self {
        Self {
            boundary: Some(".git".into()),
            ..Self::default()
        }
    }

    /// Look for a project config in `dir` and its ancestors.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.search_from = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Whether to read `config.<ext>` from the user config dir.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.skip_user_config = !include;
        self
    }

    /// Stop project search above a directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary = None;
        self
    }

    /// Merge `path` after everything else. Later files win.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Merge every layer over the defaults.
    #[instrument(skip(self), fields(search_from = ?self.search_from))]
    pub fn load(self) -> ConfigResult<Config> {
        let layers = self.layers();
        debug!(?layers, "config layers");

        let config: Config = layers
            .iter()
            .fold(
                Figment::from(Serialized::defaults(Config::default())),
                |figment, path| merge_file(figment, path),
            )
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;

        info!(
            directive = %config.bump.version,
            commit = config.bump.commit_message.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Like [`load`](Self::load), but fail when no config file exists anywhere.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        if self.layers().is_empty() {
            return Err(ConfigError::NotFound);
        }
        self.load()
    }

    /// Config files to merge, lowest precedence first.
    fn layers(&self) -> Vec<Utf8PathBuf> {
        let user = (!self.skip_user_config)
            .then(find_user_config)
            .flatten();
        let project = self
            .search_from
            .as_deref()
            .and_then(|dir| self.nearest_project_config(dir));

        user.into_iter()
            .chain(project)
            .chain(self.files.iter().cloned())
            .collect()
    }

    fn nearest_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            let crossed_boundary = dir != start
                && self
                    .boundary
                    .as_deref()
                    .is_some_and(|marker| dir.join(marker).exists());
            if crossed_boundary {
                return None;
            }

            let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
                [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.is_file())
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// The project config `start` would pick up, searching without a boundary.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .without_boundary_marker()
        .nearest_project_config(start.as_ref())
}

/// Per-user config directory (`~/.config/polybump` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf()).ok()
}
