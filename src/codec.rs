//! Reading and writing raster images as flat sRGB pixel buffers.
//!
//! The quantizer itself never touches files. Callers pick an [`ImageCodec`] once at startup
//! (usually an [`ImageCrateCodec`]) and pass it to whatever needs to load or save images.

use crate::{AboveMaxLen, ColorSlice};
use image::{ImageError, ImageFormat, ImageReader, RgbImage};
use palette::{
    cast::{ComponentsAs, IntoComponents},
    Srgb,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from decoding or encoding an image.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The file could not be read or is not a valid image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// The file being decoded.
        path: PathBuf,
        /// The underlying error.
        source: ImageError,
    },

    /// The image could not be encoded or written.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// The file being written.
        path: PathBuf,
        /// The underlying error.
        source: ImageError,
    },

    /// The pixel buffer does not match the image dimensions.
    #[error("{width}x{height} image needs {expected} pixels but {actual} were given")]
    DimensionMismatch {
        /// The image width.
        width: u32,
        /// The image height.
        height: u32,
        /// The number of pixels the dimensions call for.
        expected: u64,
        /// The number of pixels supplied.
        actual: usize,
    },
}

/// A decoded image as a flat, row-major list of pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// The pixels, `width * height` of them.
    pub pixels: Vec<Srgb<u8>>,
    /// The image width.
    pub width: u32,
    /// The image height.
    pub height: u32,
}

impl DecodedImage {
    /// Borrows the pixels as a [`ColorSlice`].
    ///
    /// # Errors
    /// Returns [`AboveMaxLen`] if the image has more than [`MAX_PIXELS`](crate::MAX_PIXELS) pixels.
    pub fn colors(&self) -> Result<ColorSlice<'_>, AboveMaxLen<u32>> {
        self.pixels.as_slice().try_into()
    }
}

impl From<RgbImage> for DecodedImage {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels: &[Srgb<u8>] = image.as_raw().components_as();
        Self {
            pixels: pixels.to_vec(),
            width,
            height,
        }
    }
}

/// Turns image files into pixel buffers and back.
pub trait ImageCodec {
    /// Reads the image at `path`, discarding any alpha channel.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the file cannot be read or decoded.
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError>;

    /// Writes `pixels` as a `width × height` image to `path`.
    ///
    /// # Errors
    /// Returns [`CodecError::DimensionMismatch`] if `pixels` does not hold `width * height` pixels,
    /// or [`CodecError::Encode`] if the image cannot be encoded or written.
    fn encode(&self, path: &Path, pixels: &[Srgb<u8>], width: u32, height: u32)
        -> Result<(), CodecError>;
}

/// An [`ImageCodec`] backed by the [`image`] crate.
///
/// By default the format is guessed from the file contents when decoding
/// and from the file extension when encoding.
/// Use [`ImageCrateCodec::with_format`] to always use a specific format instead.
/// Only the formats enabled on the `image` crate can be read or written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCrateCodec {
    /// The format to use for every file, if any.
    format: Option<ImageFormat>,
}

impl ImageCrateCodec {
    /// Creates a codec that detects the format of each file.
    #[must_use]
    pub const fn new() -> Self {
        Self { format: None }
    }

    /// Creates a codec that reads and writes every file as `format`.
    #[must_use]
    pub const fn with_format(format: ImageFormat) -> Self {
        Self { format: Some(format) }
    }

    /// The configured format, if any.
    #[must_use]
    pub const fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Reads and decodes the image at `path`.
    fn read(&self, path: &Path) -> Result<RgbImage, ImageError> {
        let reader = ImageReader::open(path)?;
        let reader = match self.format {
            Some(format) => {
                let mut reader = reader;
                reader.set_format(format);
                reader
            }
            None => reader.with_guessed_format()?,
        };
        Ok(reader.decode()?.into_rgb8())
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
        let image = self
            .read(path)
            .map_err(|source| CodecError::Decode { path: path.to_owned(), source })?;

        debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded image");
        Ok(image.into())
    }

    fn encode(
        &self,
        path: &Path,
        pixels: &[Srgb<u8>],
        width: u32,
        height: u32,
    ) -> Result<(), CodecError> {
        let expected = u64::from(width) * u64::from(height);
        let mismatch = || CodecError::DimensionMismatch {
            width,
            height,
            expected,
            actual: pixels.len(),
        };

        if u64::try_from(pixels.len()).map_or(true, |len| len != expected) {
            return Err(mismatch());
        }

        let image = RgbImage::from_vec(width, height, pixels.to_vec().into_components())
            .ok_or_else(mismatch)?;

        let saved = match self.format {
            Some(format) => image.save_with_format(path, format),
            None => image.save(path),
        };
        saved.map_err(|source| CodecError::Encode { path: path.to_owned(), source })?;

        debug!(path = %path.display(), width, height, "encoded image");
        Ok(())
    }
}
