//! Byte sources for the asset server
//!
//! The server is agnostic about where bytes come from; it consumes the
//! [`AssetSource`] capability. Two implementations are provided: a
//! filesystem source rooted at a directory and an in-memory table.

use std::io::ErrorKind;
use std::path::PathBuf;

use futures::future::{BoxFuture, FutureExt};
use rustc_hash::FxHashMap;

/// Errors that can occur while fetching asset bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No bytes exist for the requested path
    NotFound(String),
    /// Transport or IO failure
    Io(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "no bytes found for {path:?}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Capability to asynchronously fetch raw bytes for a path.
pub trait AssetSource: Send + Sync + 'static {
    /// Fetch the bytes stored at `path`
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>>;
}

/// Byte source reading files under a root directory.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Create a source rooted at the given directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the configured root directory
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let full = self.root.join(path);
        let path = path.to_string();
        async move {
            std::fs::read(&full).map_err(|e| match e.kind() {
                ErrorKind::NotFound => FetchError::NotFound(path),
                _ => FetchError::Io(e.to_string()),
            })
        }
        .boxed()
    }
}

/// Byte source backed by an in-memory path table.
///
/// Useful for tests and for embedding assets directly in a binary.
#[derive(Default)]
pub struct MemorySource {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bytes for a path, replacing any previous contents
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let result = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()));
        async move { result }.boxed()
    }
}
