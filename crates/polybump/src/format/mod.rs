//! File formats that carry a version string.
//!
//! Each supported format is a [`FileFormat`] variant chosen from the file
//! extension alone. Parsing a file yields a [`ParsedFile`] that can report
//! its current version and be rewritten with a new one, leaving everything
//! else in the file as it was.
//!
//! | Extension | Format | Version location |
//! |-----------|--------|------------------|
//! | `.json` | [`FileFormat::Json`] | top-level `"version"` field |
//! | `.cs` | [`FileFormat::AssemblyInfo`] | `[assembly: AssemblyVersion("…")]` and friends |

pub mod assembly;
pub mod json;

use camino::Utf8Path;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use assembly::AssemblyInfo;
pub use json::JsonDocument;

/// Errors from reading or rewriting a single file.
///
/// All of these are per-file: the update pipeline records them and moves on.
#[derive(Error, Debug)]
pub enum FormatError {
    /// No format is registered for the file extension.
    #[error("Extension '{0}' isn't supported.")]
    Unsupported(String),

    /// The JSON document could not be parsed or serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The JSON document is valid but not an object.
    #[error("top-level JSON value is not an object")]
    NotAnObject,

    /// The source file has no `AssemblyVersion` attribute.
    #[error("This is possibly not an AssemblyInfo.cs file.")]
    MissingAssemblyVersion,

    /// The file carries no version string.
    #[error("no version string found")]
    NoVersion,

    /// The file contents are not UTF-8 text.
    #[error("contents are not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result alias for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// A supported version-carrying file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    /// A JSON manifest with a top-level `version` field (`package.json`, ...).
    Json,
    /// A C# source file with assembly version attributes.
    AssemblyInfo,
}

impl FileFormat {
    /// Pick the format for a path by its extension (case-insensitive).
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        let ext = path.extension()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "cs" => Some(Self::AssemblyInfo),
            _ => None,
        }
    }

    /// Like [`from_path`](Self::from_path), but an unknown extension is an error.
    pub fn detect(path: &Utf8Path) -> FormatResult<Self> {
        Self::from_path(path).ok_or_else(|| {
            let ext = path.extension().map(|e| format!(".{e}")).unwrap_or_default();
            FormatError::Unsupported(ext)
        })
    }

    /// Parse raw file contents in this format.
    pub fn parse(self, contents: &[u8]) -> FormatResult<ParsedFile> {
        let text = std::str::from_utf8(contents)?;
        let parsed = match self {
            Self::Json => ParsedFile::Json(JsonDocument::parse(text)?),
            Self::AssemblyInfo => ParsedFile::AssemblyInfo(AssemblyInfo::parse(text)?),
        };
        debug!(format = ?self, current = ?parsed.current_version(), "parsed file");
        Ok(parsed)
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::AssemblyInfo => write!(f, "assembly-info"),
        }
    }
}

/// Whether `path` has an extension polybump knows how to rewrite.
pub fn is_package_file(path: &Utf8Path) -> bool {
    FileFormat::from_path(path).is_some()
}

/// A parsed file, ready to report or rewrite its version.
#[derive(Debug, Clone)]
pub enum ParsedFile {
    /// A parsed JSON manifest.
    Json(JsonDocument),
    /// A parsed AssemblyInfo source file.
    AssemblyInfo(AssemblyInfo),
}

impl ParsedFile {
    /// The version currently stored in the file, if any.
    pub fn current_version(&self) -> Option<&str> {
        match self {
            Self::Json(doc) => doc.version(),
            Self::AssemblyInfo(info) => Some(info.version()),
        }
    }

    /// Store `version` and return the new file contents.
    pub fn rewrite(&mut self, version: &str) -> FormatResult<Vec<u8>> {
        match self {
            Self::Json(doc) => {
                doc.set_version(version);
                doc.to_bytes()
            }
            Self::AssemblyInfo(info) => {
                info.set_version(version);
                Ok(info.as_str().as_bytes().to_vec())
            }
        }
    }
}
