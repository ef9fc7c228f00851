//! Program image loader.
//!
//! An image is a sequence of big-endian 16-bit words. The first word is the
//! load origin; every following word is stored at ascending addresses from
//! there. Words that would land past `0xFFFF` are discarded.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::memory::{decode_memory_region, Memory, MEMORY_WORDS};

/// Failure to load a program image. Memory is left unchanged.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path given by the caller.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Reading from an in-memory or streamed source failed.
    #[error("cannot read image: {0}")]
    Read(#[from] io::Error),
    /// The image is shorter than one word and has no origin.
    #[error("image has no origin word")]
    MissingOrigin,
}

/// What a successful load placed in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImageSummary {
    /// Address of the first body word.
    pub origin: u16,
    /// Words written to memory.
    pub words_loaded: usize,
    /// Body words that did not fit below `0xFFFF`.
    pub words_discarded: usize,
}

/// Reads a whole image from `reader` and loads it into `memory`.
///
/// The stream is consumed before any memory is written, so a read failure
/// leaves memory untouched.
///
/// # Errors
///
/// Returns [`LoadError::Read`] when the stream fails, or
/// [`LoadError::MissingOrigin`] when it holds fewer than two bytes.
pub fn load_image<R: Read>(memory: &mut Memory, mut reader: R) -> Result<ImageSummary, LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_image_bytes(memory, &bytes)
}

/// Opens `path` and loads the image it contains.
///
/// # Errors
///
/// Returns [`LoadError::Io`] naming the path when it cannot be opened or
/// read, or [`LoadError::MissingOrigin`] for an empty image.
pub fn load_image_file(
    memory: &mut Memory,
    path: impl AsRef<Path>,
) -> Result<ImageSummary, LoadError> {
    let path = path.as_ref();
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(io_error)?;

    let summary = load_image_bytes(memory, &bytes)?;
    tracing::debug!(path = %path.display(), "image file loaded");
    Ok(summary)
}

/// Loads an image already held in memory.
///
/// # Errors
///
/// Returns [`LoadError::MissingOrigin`] when `bytes` holds fewer than two
/// bytes.
pub fn load_image_bytes(memory: &mut Memory, bytes: &[u8]) -> Result<ImageSummary, LoadError> {
    let mut words = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    let Some(origin) = words.next() else {
        return Err(LoadError::MissingOrigin);
    };

    if bytes.len() % 2 == 1 {
        tracing::warn!("ignoring odd trailing byte in image at x{origin:04X}");
    }

    let body_words = words.len();
    let capacity = MEMORY_WORDS - usize::from(origin);
    let words_loaded = body_words.min(capacity);
    let words_discarded = body_words - words_loaded;

    for (addr, word) in (origin..=u16::MAX).zip(words) {
        memory.write(addr, word);
    }

    if words_discarded > 0 {
        tracing::warn!(
            words_discarded,
            "image at x{origin:04X} extends past xFFFF; trailing words discarded"
        );
    }
    tracing::debug!(
        region = ?decode_memory_region(origin),
        words_loaded,
        "image loaded at x{origin:04X}"
    );

    Ok(ImageSummary {
        origin,
        words_loaded,
        words_discarded,
    })
}
