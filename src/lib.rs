//! A library for adaptive color octree quantization and palette generation.
//!
//! `octette` indexes every pixel of an image in an 8-level color trie,
//! folds the lowest-weight subtrees into their parents until at most `K` color buckets remain,
//! and then remaps each pixel to its nearest palette color.
//!
//! # Features
//! To reduce dependencies and compile times, `octette` has several `cargo` features
//! that can be turned off or on:
//! - `threads`: exposes parallel versions of the insert and remapping phases via [`rayon`].
//! - `image`: enables integration with the [`image`] crate and the [`codec`] module.
//!
//! # High-Level API
//! The simplest entry point is [`quantize`], which takes a [`ColorSlice`] and a [`PaletteSize`]:
//! ```
//! # use octette::{quantize, ColorSlice, PaletteSize, QuantizeError};
//! # use palette::Srgb;
//! # fn main() -> Result<(), QuantizeError> {
//! let pixels = vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255), Srgb::new(250, 250, 250)];
//! let colors = ColorSlice::try_from(pixels.as_slice()).expect("small input");
//!
//! let output = quantize(colors, PaletteSize::try_from(2u32)?)?;
//! assert_eq!(output.palette.len(), 2);
//! assert_eq!(output.remapped.len(), pixels.len());
//! # Ok(())
//! # }
//! ```
//!
//! For images, see [`ImagePipeline`].
//! The individual stages are also public: [`ColorOctree`] for indexing and reduction,
//! [`extract_palette`] for palette extraction, and [`remap`] for pixel mapping.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal
)]

mod api;
mod error;
mod extract;
mod octree;
mod reduce;
mod swatch;
mod types;

pub mod remap;

#[cfg(feature = "image")]
pub mod codec;

pub use api::*;
pub use error::*;
pub use extract::extract_palette;
pub use octree::ColorOctree;
pub use reduce::ReduceSummary;
pub use swatch::*;
pub use types::*;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The depth of the color trie, equal to the bit width of each color channel.
pub const MAX_DEPTH: u8 = 8;

#[cfg(test)]
pub(crate) mod tests {
    use palette::Srgb;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoroshiro128PlusPlus;

    /// `len` pseudo-random colors from a fixed seed.
    pub fn test_data(len: usize, seed: u64) -> Vec<Srgb<u8>> {
        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
        (0..len)
            .map(|_| Srgb::new(rng.gen(), rng.gen(), rng.gen()))
            .collect()
    }

    pub fn test_data_256() -> Vec<Srgb<u8>> {
        test_data(256, 42)
    }

    pub fn test_data_1024() -> Vec<Srgb<u8>> {
        test_data(1024, 7)
    }

    /// `count` copies of `color`.
    pub fn repeat(color: Srgb<u8>, count: usize) -> Vec<Srgb<u8>> {
        vec![color; count]
    }
}
