//! Pluggable asset decoding
//!
//! A loader turns raw bytes plus a path into a decoded value, scoped by the
//! lowercase file extensions it claims.

use std::any::Any;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

/// Result of a loader decode operation.
pub type DecodeResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A decoder for one asset type, registered by file extension.
///
/// `load` receives the fetched bytes and the path they came from; the path
/// is available synchronously so implementations can pick a format variant
/// before constructing the returned future.
pub trait AssetLoader: Send + Sync + 'static {
    /// The decoded value type
    type Asset: Send + Sync + 'static;

    /// The lowercase file extensions this loader decodes (e.g. `"png"`)
    fn extensions(&self) -> &[&str];

    /// Decode an asset from raw bytes
    fn load(&self, bytes: Vec<u8>, path: &str) -> BoxFuture<'static, DecodeResult<Self::Asset>>;
}

/// Object-safe loader form used by the server's untyped value map.
pub(crate) trait ErasedLoader: Send + Sync {
    fn load(
        &self,
        bytes: Vec<u8>,
        path: &str,
    ) -> BoxFuture<'static, DecodeResult<Arc<dyn Any + Send + Sync>>>;
}

impl<L: AssetLoader> ErasedLoader for L {
    fn load(
        &self,
        bytes: Vec<u8>,
        path: &str,
    ) -> BoxFuture<'static, DecodeResult<Arc<dyn Any + Send + Sync>>> {
        let future = AssetLoader::load(self, bytes, path);
        async move {
            future
                .await
                .map(|asset| Arc::new(asset) as Arc<dyn Any + Send + Sync>)
        }
        .boxed()
    }
}

/// Extract the extension of a path: the substring after the last `.`,
/// lowercased. A path without a `.` has no extension.
pub(crate) fn extension_of(path: &str) -> Option<String> {
    path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}
