//! Reads the palette back out of a (possibly reduced) [`ColorOctree`].

use crate::{ColorOctree, QuantizeError, QuantizeResult};
use palette::Srgb;
use tracing::debug;

/// Returns one averaged color per bucket in `octree`.
///
/// The trie is walked in post-order with children visited in slot order,
/// so the palette order is the same for identical inputs.
/// Each color is the truncated per-channel mean of the colors in its bucket.
///
/// # Errors
/// Returns [`QuantizeError::InternalInvariant`] if a bucket holds no pixels,
/// which can only happen if the trie was corrupted during reduction.
///
/// # Examples
/// ```
/// # use octette::{extract_palette, ColorOctree, ColorSlice, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let pixels = [Srgb::new(10, 0, 0), Srgb::new(11, 0, 0), Srgb::new(200, 200, 200)];
/// let mut octree = ColorOctree::from_colors(ColorSlice::try_from(pixels.as_slice()).unwrap());
/// octree.reduce(2)?;
/// assert_eq!(extract_palette(&octree)?, vec![Srgb::new(10, 0, 0), Srgb::new(200, 200, 200)]);
/// # Ok(())
/// # }
/// ```
pub fn extract_palette(octree: &ColorOctree) -> QuantizeResult<Vec<Srgb<u8>>> {
    let mut palette = Vec::with_capacity(octree.distinct_color_count());

    for node in octree.post_order().map(|id| octree.node(id)) {
        if !node.is_leaf {
            continue;
        }

        if node.pixel_count == 0 {
            return Err(QuantizeError::InternalInvariant(format!(
                "empty color bucket at depth {}",
                node.depth
            )));
        }

        let count = node.pixel_count;
        let mut rgb = [0u8; 3];
        for (c, sum) in rgb.iter_mut().zip(node.sums) {
            *c = u8::try_from(sum / count).map_err(|_| {
                QuantizeError::InternalInvariant(format!(
                    "channel sum {sum} is too large for {count} pixels"
                ))
            })?;
        }

        let [r, g, b] = rgb;
        palette.push(Srgb::new(r, g, b));
    }

    debug!(colors = palette.len(), "extracted palette");
    Ok(palette)
}
