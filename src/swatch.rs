//! Lays out a palette as a square grid of color cells for previewing.

use palette::Srgb;
#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::IntoComponents};

/// The color of swatch cells that have no palette color.
pub const SWATCH_BACKGROUND: Srgb<u8> = Srgb::new(0, 0, 0);

/// The default width and height in pixels of each swatch cell when rendered to an image.
pub const DEFAULT_TILE_SIZE: u32 = 50;

/// A `side × side` grid of palette colors, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    /// The cell colors, `side * side` of them.
    pub pixels: Vec<Srgb<u8>>,
    /// The number of cells along each edge of the grid.
    pub side: u32,
}

/// Arranges `palette` into the smallest square grid that can hold it.
///
/// The colors are sorted by red, then green, then blue,
/// and the remaining cells are filled with [`SWATCH_BACKGROUND`].
///
/// # Examples
/// ```
/// # use octette::{render_palette_swatch, SWATCH_BACKGROUND};
/// # use palette::Srgb;
/// let palette = vec![Srgb::new(9, 9, 9); 5];
/// let swatch = render_palette_swatch(&palette);
/// assert_eq!(swatch.side, 3);
/// assert_eq!(swatch.pixels.iter().filter(|&&c| c == SWATCH_BACKGROUND).count(), 4);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn render_palette_swatch(palette: &[Srgb<u8>]) -> Swatch {
    let side = ceil_sqrt(palette.len());
    let mut pixels = palette.to_vec();
    pixels.sort_by_key(|srgb| srgb.into_components());
    pixels.resize(side * side, SWATCH_BACKGROUND);
    Swatch { pixels, side: side as u32 }
}

/// The smallest `side` such that `side * side >= n`.
fn ceil_sqrt(n: usize) -> usize {
    let root = n.isqrt();
    if root * root == n {
        root
    } else {
        root + 1
    }
}

impl Swatch {
    /// Renders the swatch as an image where each cell is a `tile_size × tile_size` square.
    ///
    /// Returns `None` if the image would not fit in memory.
    #[cfg(feature = "image")]
    #[must_use]
    pub fn to_rgbimage(&self, tile_size: u32) -> Option<RgbImage> {
        let side = usize::try_from(self.side).ok()?;
        let tile = usize::try_from(tile_size).ok()?;
        let width = self.side.checked_mul(tile_size)?;

        let mut buf = Vec::with_capacity(side.checked_mul(tile)?.checked_pow(2)?);
        for row in self.pixels.chunks_exact(side.max(1)) {
            let scanline = row
                .iter()
                .flat_map(|&color| std::iter::repeat(color).take(tile))
                .collect::<Vec<_>>();

            for _ in 0..tile {
                buf.extend_from_slice(&scanline);
            }
        }

        RgbImage::from_vec(width, width, buf.into_components())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn five_colors_fill_a_three_by_three_grid() {
        let palette = vec![
            Srgb::new(200, 0, 0),
            Srgb::new(0, 200, 0),
            Srgb::new(0, 0, 200),
            Srgb::new(0, 0, 100),
            Srgb::new(50, 50, 50),
        ];
        let swatch = render_palette_swatch(&palette);

        assert_eq!(swatch.side, 3);
        assert_eq!(
            swatch.pixels,
            vec![
                Srgb::new(0, 0, 100),
                Srgb::new(0, 0, 200),
                Srgb::new(0, 200, 0),
                Srgb::new(50, 50, 50),
                Srgb::new(200, 0, 0),
                SWATCH_BACKGROUND,
                SWATCH_BACKGROUND,
                SWATCH_BACKGROUND,
                SWATCH_BACKGROUND,
            ]
        );
    }

    #[test]
    fn side_is_ceil_sqrt() {
        let cases = [(0, 0), (1, 1), (2, 2), (4, 2), (5, 3), (9, 3), (10, 4), (255, 16), (256, 16), (257, 17)];
        for (len, side) in cases {
            let swatch = render_palette_swatch(&vec![Srgb::new(1, 1, 1); len]);
            assert_eq!(swatch.side, side, "len = {len}");
            assert_eq!(swatch.pixels.len(), side as usize * side as usize);
        }
    }

    #[test]
    fn ceil_sqrt_at_perfect_squares() {
        for root in [0usize, 1, 2, 3, 15, 16, 255, 4096] {
            let square = root * root;
            assert_eq!(ceil_sqrt(square), root);
            assert_eq!(ceil_sqrt(square + 1), root + 1);
        }
    }

    #[test]
    #[cfg(feature = "image")]
    fn rendered_tiles() {
        let palette = [Srgb::new(10, 20, 30), Srgb::new(40, 50, 60)];
        let image = render_palette_swatch(&palette).to_rgbimage(3).unwrap();

        assert_eq!(image.dimensions(), (6, 6));
        assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(image.get_pixel(2, 2).0, [10, 20, 30]);
        assert_eq!(image.get_pixel(3, 0).0, [40, 50, 60]);
        assert_eq!(image.get_pixel(5, 2).0, [40, 50, 60]);
        assert_eq!(image.get_pixel(0, 3).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 0]);

        let empty = render_palette_swatch(&[]).to_rgbimage(3).unwrap();
        assert_eq!(empty.dimensions(), (0, 0));
    }
}
