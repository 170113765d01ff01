//! Discovered files and where rewritten files go.
//!
//! Discovery itself (globbing, package-file patterns) happens upstream: the
//! update pipeline consumes any iterator of [`SourceFile`]s and hands
//! rewritten bytes to a [`FileSink`].

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument};

/// A discovered file: its path and raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path the file was read from and will be written back to.
    pub path: Utf8PathBuf,
    /// Raw file contents.
    pub contents: Vec<u8>,
}

impl SourceFile {
    /// Create a source file from a path and contents already in memory.
    pub fn new(path: impl Into<Utf8PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk.
    #[instrument]
    pub fn read(path: &Utf8Path) -> io::Result<Self> {
        let contents = std::fs::read(path)?;
        debug!(bytes = contents.len(), "read file");
        Ok(Self::new(path, contents))
    }

    /// The file name without its directory, as used in version reports.
    pub fn basename(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }
}

/// Receives rewritten file contents.
pub trait FileSink {
    /// Store `contents` for `path`, replacing whatever was there.
    fn persist(&mut self, path: &Utf8Path, contents: &[u8]) -> io::Result<()>;
}

/// Writes files in place on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl FileSink for FsSink {
    fn persist(&mut self, path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)?;
        debug!(%path, bytes = contents.len(), "wrote file");
        Ok(())
    }
}

impl<S: FileSink + ?Sized> FileSink for &mut S {
    fn persist(&mut self, path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
        (**self).persist(path, contents)
    }
}
