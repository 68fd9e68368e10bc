//! Image decoding
//!
//! Decodes PNG and JPEG bytes into CPU-side RGBA8 pixel data, ready for
//! upload by whatever rendering backend consumes it.

use futures::future::{BoxFuture, FutureExt};
use image::GenericImageView;

use crate::loader::{AssetLoader, DecodeResult};

/// A decoded image as tightly-packed RGBA8 pixels
#[derive(Debug, Clone)]
pub struct Image {
    /// Pixel data, `width * height * 4` bytes, row-major
    pub rgba: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Image {
    /// Get the image dimensions as `(width, height)`
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Loader for `png`, `jpg` and `jpeg` files
pub struct ImageLoader;

impl AssetLoader for ImageLoader {
    type Asset = Image;

    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg"]
    }

    fn load(&self, bytes: Vec<u8>, _path: &str) -> BoxFuture<'static, DecodeResult<Image>> {
        let decoded = image::load_from_memory(&bytes)
            .map(|img| {
                let (width, height) = img.dimensions();
                Image {
                    rgba: img.to_rgba8().into_raw(),
                    width,
                    height,
                }
            })
            .map_err(Into::into);
        futures::future::ready(decoded).boxed()
    }
}
