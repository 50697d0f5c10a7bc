//! Contains various types needed across the crate.

use crate::{ConfigError, MAX_PIXELS};
use palette::Srgb;
use std::{
    error::Error,
    fmt::{Debug, Display},
    num::NonZeroU32,
    ops::Deref,
};
#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::ComponentsAs};

/// An error type for when the length of an input (e.g., `Vec` or slice)
/// is above the maximum supported value.
///
/// The inner value is the maximum supported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AboveMaxLen<T>(pub T);

impl<T: Display> Display for AboveMaxLen<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "above the maximum length of {}", self.0)
    }
}

impl<T: Debug + Display> Error for AboveMaxLen<T> {}

/// A simple new type wrapper around `&'a [Srgb<u8>]` with the invariant that the length of the
/// inner slice must not be greater than [`MAX_PIXELS`].
///
/// The invariant guarantees that every per-color pixel count in a
/// [`QuantizeOutput`] fits in a `u32`.
///
/// # Examples
/// Use `try_into` or [`ColorSlice::from_truncated`] to create [`ColorSlice`]s.
///
/// From a raw color slice:
/// ```
/// # use octette::{ColorSlice, AboveMaxLen};
/// # use palette::Srgb;
/// # fn main() -> Result<(), AboveMaxLen<u32>> {
/// let srgb = vec![Srgb::new(0, 0, 0)];
/// let colors: ColorSlice = srgb.as_slice().try_into()?;
/// # Ok(())
/// # }
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use octette::ColorSlice;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let colors = ColorSlice::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorSlice<'a>(&'a [Srgb<u8>]);

impl<'a> ColorSlice<'a> {
    /// Creates a new [`ColorSlice`] by truncating the input slice to a max length of [`MAX_PIXELS`].
    #[must_use]
    pub fn from_truncated(colors: &'a [Srgb<u8>]) -> Self {
        Self(&colors[..colors.len().min(MAX_PIXELS as usize)])
    }

    /// Returns the length of the slice as a `u32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_colors(&self) -> u32 {
        self.0.len() as u32
    }
}

impl<'a> AsRef<[Srgb<u8>]> for ColorSlice<'a> {
    fn as_ref(&self) -> &[Srgb<u8>] {
        self
    }
}

impl<'a> Deref for ColorSlice<'a> {
    type Target = [Srgb<u8>];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'a> From<ColorSlice<'a>> for &'a [Srgb<u8>] {
    fn from(val: ColorSlice<'a>) -> Self {
        val.0
    }
}

impl<'a> TryFrom<&'a [Srgb<u8>]> for ColorSlice<'a> {
    type Error = AboveMaxLen<u32>;

    fn try_from(slice: &'a [Srgb<u8>]) -> Result<Self, Self::Error> {
        if slice.len() <= MAX_PIXELS as usize {
            Ok(Self(slice))
        } else {
            Err(AboveMaxLen(MAX_PIXELS))
        }
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ColorSlice<'a> {
    type Error = AboveMaxLen<u32>;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let pixels = image.pixels().len();
        if pixels <= MAX_PIXELS as usize {
            let buf = &image.as_raw()[..(pixels * 3)];
            Ok(Self(buf.components_as()))
        } else {
            Err(AboveMaxLen(MAX_PIXELS))
        }
    }
}

/// This type is used to specify the maximum number of colors to include in a palette.
///
/// This is a simple new type wrapper around a `u32` with the invariant that it must be at least `1`.
/// Zero or negative sizes are rejected with [`ConfigError::PaletteSize`]
/// before any quantization work starts.
///
/// # Examples
/// ```
/// # use octette::{PaletteSize, ConfigError};
/// # fn main() -> Result<(), ConfigError> {
/// let size = PaletteSize::try_from(16u32)?;
/// let size: PaletteSize = 16i64.try_into()?;
/// assert!(PaletteSize::try_from(0u32).is_err());
/// assert!(PaletteSize::try_from(-1i64).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PaletteSize(NonZeroU32);

impl PaletteSize {
    /// The default palette size of `256` colors.
    pub const DEFAULT: Self = match NonZeroU32::new(256) {
        Some(n) => Self(n),
        None => unreachable!(),
    };

    /// A palette size of a single color.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Gets the inner `u32` value.
    #[must_use]
    pub const fn into_inner(self) -> u32 {
        self.0.get()
    }

    /// Gets the inner value as a `usize`, for comparison against lengths and counts.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0.get() as usize
    }
}

impl Default for PaletteSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<NonZeroU32> for PaletteSize {
    fn from(value: NonZeroU32) -> Self {
        Self(value)
    }
}

impl From<PaletteSize> for u32 {
    fn from(val: PaletteSize) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u32> for PaletteSize {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(ConfigError::PaletteSize(0))
    }
}

impl TryFrom<i64> for PaletteSize {
    type Error = ConfigError;

    /// Sizes above `u32::MAX` are clamped, since a palette can never have more
    /// colors than the image has pixels.
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ConfigError::PaletteSize(value));
        }
        let clamped = u32::try_from(value).unwrap_or(u32::MAX);
        Self::try_from(clamped)
    }
}

impl TryFrom<usize> for PaletteSize {
    type Error = ConfigError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::try_from(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl Display for PaletteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// The output struct returned by quantization functions.
///
/// It contains the color `palette` for the image, alongside `counts` which has
/// the number of pixels mapped to each palette color,
/// and `remapped`, which replaces every input pixel with its nearest palette color.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuantizeOutput {
    /// The computed color palette, in the trie's enumeration order.
    ///
    /// The palette has at most as many colors as the requested [`PaletteSize`].
    /// Colors are not guaranteed to be unique, since two buckets can average to the same color.
    pub palette: Vec<Srgb<u8>>,
    /// The number of pixels that were mapped to each color in `palette`.
    ///
    /// A count can be zero if another palette entry is always nearer.
    pub counts: Vec<u32>,
    /// The quantized pixels, with the same length and order as the input.
    pub remapped: Vec<Srgb<u8>>,
}
