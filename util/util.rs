#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::RgbImage;

/// Overrides the directory of benchmark images.
pub const IMAGE_DIR_VAR: &str = "OCTETTE_BENCH_IMAGES";

/// Default directory of benchmark images, relative to the crate root.
pub const UNSPLASH_DIR: &str = "img/unsplash/img";

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn load_images(images: &[PathBuf]) -> Vec<(String, RgbImage)> {
    images
        .iter()
        .map(|path| {
            image::open(path)
                .map(|image| (file_name(path), image.into_rgb8()))
                .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
        })
        .collect()
}

pub fn load_image_dir(dir: impl AsRef<Path>) -> Vec<(String, RgbImage)> {
    let dir = dir.as_ref();
    let mut paths = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", dir.display()))
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .expect("read each file");

    paths.sort();

    load_images(&paths)
}

/// The crate root, assuming the current exe is something like `target/release/deps/octree-hash`.
fn crate_root() -> PathBuf {
    let exe = std::env::current_exe().expect("current exe path");
    exe.ancestors()
        .nth(4)
        .expect("exe is nested inside target/")
        .to_owned()
}

static IMAGES: OnceLock<Vec<(String, RgbImage)>> = OnceLock::new();

/// Loads the benchmark images once, from `$OCTETTE_BENCH_IMAGES` or [`UNSPLASH_DIR`].
pub fn unsplash_images() -> &'static [(String, RgbImage)] {
    IMAGES.get_or_init(|| match std::env::var_os(IMAGE_DIR_VAR) {
        Some(dir) => load_image_dir(dir),
        None => load_image_dir(crate_root().join(UNSPLASH_DIR)),
    })
}
