//! The high level API: one-call quantization and the [`ImagePipeline`] builder.

use crate::{
    extract_palette, remap, ColorOctree, ColorSlice, ConfigError, PaletteSize, QuantizeOutput,
    QuantizeResult,
};
use palette::Srgb;
use tracing::{debug, info_span};
#[cfg(feature = "image")]
use {
    crate::{AboveMaxLen, QuantizeError},
    image::RgbImage,
    palette::cast::IntoComponents,
};

/// Builds the output struct from a palette and the palette index of every pixel.
fn output(palette: Vec<Srgb<u8>>, indices: &[u32]) -> QuantizeOutput {
    let mut counts = vec![0; palette.len()];
    for &i in indices {
        counts[i as usize] += 1;
    }

    let remapped = indices.iter().map(|&i| palette[i as usize]).collect();

    QuantizeOutput { palette, counts, remapped }
}

/// Returns an error if there are no pixels to quantize.
fn check_not_empty(colors: ColorSlice) -> QuantizeResult<()> {
    if colors.is_empty() {
        Err(ConfigError::EmptyInput.into())
    } else {
        Ok(())
    }
}

/// Computes a palette of at most `k` colors for `colors`.
fn palette_of(octree: &mut ColorOctree, k: PaletteSize) -> QuantizeResult<Vec<Srgb<u8>>> {
    octree.reduce_to(k)?;
    extract_palette(octree)
}

/// Quantizes `colors` down to a palette of at most `k` colors
/// and maps every pixel to its nearest palette color.
///
/// # Errors
/// Returns [`ConfigError::EmptyInput`] if `colors` is empty,
/// or [`QuantizeError::InternalInvariant`](crate::QuantizeError::InternalInvariant)
/// if the color trie is found to be inconsistent.
///
/// # Examples
/// ```
/// # use octette::{quantize, ColorSlice, PaletteSize, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let pixels = [vec![Srgb::new(0, 0, 0); 5], vec![Srgb::new(255, 255, 255); 5]].concat();
/// let output = quantize(ColorSlice::from_truncated(&pixels), PaletteSize::try_from(2u32)?)?;
///
/// assert_eq!(output.palette, vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)]);
/// assert_eq!(output.counts, vec![5, 5]);
/// assert_eq!(output.remapped, pixels);
/// # Ok(())
/// # }
/// ```
pub fn quantize(colors: ColorSlice, k: PaletteSize) -> QuantizeResult<QuantizeOutput> {
    let _span = info_span!("quantize", pixels = colors.num_colors(), %k).entered();
    check_not_empty(colors)?;

    let mut octree = ColorOctree::from_colors(colors);
    debug!(buckets = octree.distinct_color_count(), nodes = octree.node_count(), "indexed colors");

    let palette = palette_of(&mut octree, k)?;
    let indices = remap::map_indices(&colors, &palette)?;
    Ok(output(palette, &indices))
}

/// Computes [`quantize`] in parallel.
///
/// The insertion and remapping phases are split across threads.
/// The output is identical to [`quantize`].
///
/// # Errors
/// See [`quantize`].
#[cfg(feature = "threads")]
pub fn quantize_par(colors: ColorSlice, k: PaletteSize) -> QuantizeResult<QuantizeOutput> {
    let _span = info_span!("quantize_par", pixels = colors.num_colors(), %k).entered();
    check_not_empty(colors)?;

    let mut octree = ColorOctree::from_colors_par(colors);
    debug!(buckets = octree.distinct_color_count(), nodes = octree.node_count(), "indexed colors");

    let palette = palette_of(&mut octree, k)?;
    let indices = remap::map_indices_par(&colors, &palette)?;
    Ok(output(palette, &indices))
}

/// A builder struct to quantize an image or compute its palette.
///
/// # Examples
/// To start, create a [`ImagePipeline`] from a [`RgbImage`] (note that the `image` feature is needed):
/// ```no_run
/// # use octette::ImagePipeline;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let mut pipeline = ImagePipeline::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
///
/// Then, set the number of colors in the palette and run the pipeline:
/// ```
/// # use octette::{ImagePipeline, PaletteSize};
/// # use palette::Srgb;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let srgb = vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)];
/// let mut pipeline = ImagePipeline::new(srgb.as_slice().try_into()?, 2, 1).unwrap();
/// let output = pipeline.palette_size(PaletteSize::ONE).quantize()?;
/// assert_eq!(output.palette.len(), 1);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct ImagePipeline<'a> {
    /// The input image as a flat slice of pixels.
    pub(crate) colors: ColorSlice<'a>,
    /// The dimensions of the image.
    pub(crate) dimensions: (u32, u32),
    /// The number of colors to put in the palette.
    pub(crate) k: PaletteSize,
}

impl<'a> ImagePipeline<'a> {
    /// Creates a new [`ImagePipeline`] with default options
    /// and does not validate the size of the input image/slice.
    fn new_unchecked(colors: ColorSlice<'a>, width: u32, height: u32) -> Self {
        Self {
            colors,
            dimensions: (width, height),
            k: PaletteSize::default(),
        }
    }

    /// Creates a new [`ImagePipeline`] with default options.
    /// Returns `None` if the length of `colors` is not equal to `width * height`.
    #[must_use]
    pub fn new(colors: ColorSlice<'a>, width: u32, height: u32) -> Option<Self> {
        if colors.len() as u64 == u64::from(width) * u64::from(height) {
            Some(Self::new_unchecked(colors, width, height))
        } else {
            None
        }
    }

    /// Sets the palette size which determines the (maximum) number of colors to have in the palette.
    ///
    /// The default palette size is [`PaletteSize::DEFAULT`].
    pub fn palette_size(&mut self, size: impl Into<PaletteSize>) -> &mut Self {
        self.k = size.into();
        self
    }

    /// The dimensions of the image as `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ImagePipeline<'a> {
    type Error = AboveMaxLen<u32>;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        Ok(Self::new_unchecked(
            image.try_into()?,
            image.width(),
            image.height(),
        ))
    }
}

impl<'a> ImagePipeline<'a> {
    /// Computes the color palette of the image without remapping any pixels.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyInput`] if the image has no pixels.
    pub fn palette(&self) -> QuantizeResult<Vec<Srgb<u8>>> {
        check_not_empty(self.colors)?;
        palette_of(&mut ColorOctree::from_colors(self.colors), self.k)
    }

    /// Runs the pipeline, returning the palette, its pixel counts, and the remapped pixels.
    ///
    /// # Errors
    /// See [`quantize`].
    pub fn quantize(&self) -> QuantizeResult<QuantizeOutput> {
        quantize(self.colors, self.k)
    }

    /// Runs the pipeline in parallel.
    ///
    /// # Errors
    /// See [`quantize`].
    #[cfg(feature = "threads")]
    pub fn quantize_par(&self) -> QuantizeResult<QuantizeOutput> {
        quantize_par(self.colors, self.k)
    }

    /// Runs the pipeline and returns the quantized image.
    ///
    /// # Errors
    /// See [`quantize`].
    #[cfg(feature = "image")]
    pub fn quantized_rgbimage(&self) -> QuantizeResult<RgbImage> {
        self.to_rgbimage(self.quantize()?)
    }

    /// Runs the pipeline in parallel and returns the quantized image.
    ///
    /// # Errors
    /// See [`quantize`].
    #[cfg(all(feature = "threads", feature = "image"))]
    pub fn quantized_rgbimage_par(&self) -> QuantizeResult<RgbImage> {
        self.to_rgbimage(self.quantize_par()?)
    }

    /// Packs the remapped pixels back into an image of the original size.
    #[cfg(feature = "image")]
    fn to_rgbimage(&self, output: QuantizeOutput) -> QuantizeResult<RgbImage> {
        let (width, height) = self.dimensions;
        RgbImage::from_vec(width, height, output.remapped.into_components()).ok_or_else(|| {
            QuantizeError::InternalInvariant(format!(
                "remapped pixels do not fill a {width}x{height} image"
            ))
        })
    }
}
