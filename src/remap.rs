//! Maps pixels to their nearest palette colors.
//!
//! Distances are squared euclidean distances over the raw sRGB components.
//! Ties go to the palette color that comes first in the palette.

use crate::{ConfigError, QuantizeResult};
use palette::{cast::AsArrays, Srgb};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Squared euclidean distance between two colors.
#[inline]
fn squared_euclidean_distance(x: [u8; 3], y: [u8; 3]) -> u32 {
    let mut dist = 0;
    for c in 0..3 {
        let d = u32::from(x[c].abs_diff(y[c]));
        dist += d * d;
    }
    dist
}

/// Returns the index of the first palette color with the smallest distance to `color`.
#[inline]
fn nearest(palette: &[[u8; 3]], color: [u8; 3]) -> usize {
    let mut min_index = 0;
    let mut min_dist = u32::MAX;
    for (i, &p) in palette.iter().enumerate() {
        let dist = squared_euclidean_distance(color, p);
        if dist < min_dist {
            min_dist = dist;
            min_index = i;
        }
    }
    min_index
}

/// Returns the palette as component arrays, or an error if it is empty.
fn palette_arrays(palette: &[Srgb<u8>]) -> QuantizeResult<&[[u8; 3]]> {
    if palette.is_empty() {
        Err(ConfigError::EmptyPalette.into())
    } else {
        Ok(palette.as_arrays())
    }
}

/// Returns the index of the palette color nearest to `color`,
/// or `None` if the palette is empty.
///
/// # Examples
/// ```
/// # use octette::remap::nearest_index;
/// # use palette::Srgb;
/// let palette = [Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)];
/// assert_eq!(nearest_index(&palette, Srgb::new(200, 180, 190)), Some(1));
/// assert_eq!(nearest_index(&[], Srgb::new(0, 0, 0)), None);
/// ```
#[must_use]
pub fn nearest_index(palette: &[Srgb<u8>], color: Srgb<u8>) -> Option<usize> {
    let (r, g, b) = color.into_components();
    (!palette.is_empty()).then(|| nearest(palette.as_arrays(), [r, g, b]))
}

/// Returns, for each color in `colors`, the index of its nearest color in `palette`.
///
/// # Errors
/// Returns [`ConfigError::EmptyPalette`] if `palette` is empty.
#[allow(clippy::cast_possible_truncation)]
pub fn map_indices(colors: &[Srgb<u8>], palette: &[Srgb<u8>]) -> QuantizeResult<Vec<u32>> {
    let palette = palette_arrays(palette)?;
    Ok(colors
        .as_arrays()
        .iter()
        .map(|&color| nearest(palette, color) as u32)
        .collect())
}

/// Replaces each color in `colors` with its nearest color in `palette`.
///
/// The result has the same length and order as `colors`,
/// and every color in it is a member of `palette`.
///
/// # Errors
/// Returns [`ConfigError::EmptyPalette`] if `palette` is empty.
pub fn map_all(colors: &[Srgb<u8>], palette: &[Srgb<u8>]) -> QuantizeResult<Vec<Srgb<u8>>> {
    let arrays = palette_arrays(palette)?;
    Ok(colors
        .as_arrays()
        .iter()
        .map(|&color| palette[nearest(arrays, color)])
        .collect())
}

/// Computes [`map_indices`] in parallel.
///
/// # Errors
/// Returns [`ConfigError::EmptyPalette`] if `palette` is empty.
#[cfg(feature = "threads")]
#[allow(clippy::cast_possible_truncation)]
pub fn map_indices_par(colors: &[Srgb<u8>], palette: &[Srgb<u8>]) -> QuantizeResult<Vec<u32>> {
    let palette = palette_arrays(palette)?;
    Ok(colors
        .as_arrays()
        .par_iter()
        .map(|&color| nearest(palette, color) as u32)
        .collect())
}

/// Computes [`map_all`] in parallel.
///
/// # Errors
/// Returns [`ConfigError::EmptyPalette`] if `palette` is empty.
#[cfg(feature = "threads")]
pub fn map_all_par(colors: &[Srgb<u8>], palette: &[Srgb<u8>]) -> QuantizeResult<Vec<Srgb<u8>>> {
    let arrays = palette_arrays(palette)?;
    Ok(colors
        .as_arrays()
        .par_iter()
        .map(|&color| palette[nearest(arrays, color)])
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{tests::*, QuantizeError};

    /// Nearest neighbor by brute force over `u64` distances.
    fn naive_nearest(palette: &[Srgb<u8>], color: Srgb<u8>) -> usize {
        let (r, g, b) = color.into_components();
        let dist = |p: &Srgb<u8>| {
            let (pr, pg, pb) = p.into_components();
            [(r, pr), (g, pg), (b, pb)]
                .into_iter()
                .map(|(a, b)| (i64::from(a) - i64::from(b)).pow(2))
                .sum::<i64>()
        };
        let min = palette.iter().map(dist).min().unwrap();
        palette.iter().position(|p| dist(p) == min).unwrap()
    }

    #[test]
    fn empty_palette() {
        let colors = test_data_256();
        let expected = QuantizeError::InvalidConfig(ConfigError::EmptyPalette);
        assert_eq!(map_indices(&colors, &[]).unwrap_err(), expected);
        assert_eq!(map_all(&colors, &[]).unwrap_err(), expected);

        #[cfg(feature = "threads")]
        {
            assert_eq!(map_indices_par(&colors, &[]).unwrap_err(), expected);
            assert_eq!(map_all_par(&colors, &[]).unwrap_err(), expected);
        }
    }

    #[test]
    fn empty_input() {
        let palette = test_data_256();
        assert!(map_all(&[], &palette).unwrap().is_empty());
        assert!(map_indices(&[], &palette).unwrap().is_empty());
    }

    #[test]
    fn ties_go_to_the_earliest_color() {
        let palette = [Srgb::new(10, 0, 0), Srgb::new(0, 0, 0), Srgb::new(20, 0, 0)];
        assert_eq!(nearest_index(&palette, Srgb::new(10, 0, 0)), Some(0));
        // (5, 0, 0) is 25 away from both the first and second color
        assert_eq!(nearest_index(&palette, Srgb::new(5, 0, 0)), Some(0));
        assert_eq!(nearest_index(&palette, Srgb::new(15, 0, 0)), Some(0));

        let duplicate = [Srgb::new(1, 2, 3), Srgb::new(1, 2, 3)];
        assert_eq!(map_indices(&[Srgb::new(1, 2, 3)], &duplicate).unwrap(), vec![0]);
    }

    #[test]
    fn naive_nearest_neighbor_oracle() {
        let palette = &test_data_256()[..61];
        let colors = test_data_1024();

        let indices = map_indices(&colors, palette).unwrap();
        let mapped = map_all(&colors, palette).unwrap();
        assert_eq!(indices.len(), colors.len());
        assert_eq!(mapped.len(), colors.len());

        for ((&color, &i), &m) in colors.iter().zip(&indices).zip(&mapped) {
            assert_eq!(i as usize, naive_nearest(palette, color));
            assert_eq!(m, palette[i as usize]);
            assert!(palette.contains(&m));
        }
    }

    #[test]
    fn palette_colors_map_to_themselves() {
        let palette = test_data_256();
        let mapped = map_all(&palette, &palette).unwrap();
        assert_eq!(mapped, palette);
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let palette = &test_data_256()[..100];
        let colors = [test_data_1024().as_slice(); 4].concat();

        assert_eq!(
            map_indices(&colors, palette).unwrap(),
            map_indices_par(&colors, palette).unwrap()
        );
        assert_eq!(
            map_all(&colors, palette).unwrap(),
            map_all_par(&colors, palette).unwrap()
        );
    }
}
