//! Upload normalization for product images.

mod normalizer;

pub use normalizer::{
    ImageNormalizer, ImageProcessor, NormalizeError, NormalizedImage, NormalizerSettings, OUTPUT_EXTENSION,
    sniff_format,
};
