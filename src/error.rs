//! Error types for quantization.

use thiserror::Error;

/// A configuration problem detected before any trie work begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The requested palette size was zero or negative.
    #[error("invalid palette size {0}: at least one color is required")]
    PaletteSize(i64),

    /// There were no pixels to quantize.
    #[error("empty input: no pixels to quantize")]
    EmptyInput,

    /// There were no palette colors to map pixels to.
    #[error("empty palette: no colors to map pixels to")]
    EmptyPalette,
}

/// Errors that can occur while quantizing an image.
///
/// Quantization has no partial results: on error, nothing is produced
/// and any [`ColorOctree`](crate::ColorOctree) involved must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizeError {
    /// The quantization parameters or input were invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The color trie was found in an inconsistent state.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl QuantizeError {
    /// Whether this error was caused by invalid configuration or input.
    #[must_use]
    pub const fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

/// Result type for quantization.
pub type QuantizeResult<T> = Result<T, QuantizeError>;
