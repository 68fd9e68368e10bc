//! Audio clip decoding
//!
//! Audio is kept as compressed bytes and decoded at play time; the loader
//! validates the bytes up front by constructing a decoder once.

use std::io::Cursor;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rodio::Decoder;

use crate::loader::{AssetLoader, DecodeResult};

/// A playable audio clip holding the original compressed bytes.
///
/// The bytes are cheap to clone and share; every playback gets its own
/// decoder via [`decoder`](Self::decoder).
#[derive(Clone)]
pub struct AudioClip {
    bytes: Arc<[u8]>,
}

impl AudioClip {
    /// Get the compressed bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Create a fresh decoder over the clip's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be decoded; for clips produced
    /// by [`AudioClipLoader`] this was already verified at load time.
    pub fn decoder(
        &self,
    ) -> Result<Decoder<Cursor<Arc<[u8]>>>, rodio::decoder::DecoderError> {
        Decoder::new(Cursor::new(Arc::clone(&self.bytes)))
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Loader for `wav`, `ogg`, `mp3` and `flac` files
pub struct AudioClipLoader;

impl AssetLoader for AudioClipLoader {
    type Asset = AudioClip;

    fn extensions(&self) -> &[&str] {
        &["wav", "ogg", "mp3", "flac"]
    }

    fn load(&self, bytes: Vec<u8>, _path: &str) -> BoxFuture<'static, DecodeResult<AudioClip>> {
        let clip = AudioClip {
            bytes: Arc::from(bytes),
        };
        let decoded = clip.decoder().map(|_| clip).map_err(Into::into);
        futures::future::ready(decoded).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 16-bit PCM mono WAV file
    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);

        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&44100u32.to_le_bytes());
        bytes.extend_from_slice(&(44100u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_load_wav_clip() {
        let bytes = wav_bytes(&[0, 1000, -1000, 0]);
        let clip = pollster::block_on(AudioClipLoader.load(bytes.clone(), "beep.wav")).unwrap();

        assert_eq!(clip.bytes(), bytes.as_slice());
        assert!(clip.decoder().is_ok());
    }

    #[test]
    fn test_load_garbage_fails() {
        let result = pollster::block_on(AudioClipLoader.load(vec![1, 2, 3, 4], "noise.wav"));
        assert!(result.is_err());
    }
}
