use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

/// Extension of every normalized image.
pub const OUTPUT_EXTENSION: &str = "jpg";

const INITIAL_QUALITY: u8 = 85;
const FALLBACK_QUALITIES: [u8; 5] = [75, 65, 55, 45, 35];
const DOWNSCALE_QUALITY: u8 = 75;
/// Per-round downscale factors in tenths: 0.8, 0.7, ... 0.3. Each round
/// shrinks the previous round's result.
const DOWNSCALE_TENTHS: [u32; 6] = [8, 7, 6, 5, 4, 3];
/// Downscaling stops before either side drops below this many pixels.
const MIN_DIMENSION: u32 = 64;

const ACCEPTED_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unsupported image format (accepted: JPEG, PNG, GIF, BMP, WebP)")]
    UnsupportedFormat,

    #[error("Could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl NormalizeError {
    /// Input problems the client must fix. Everything else is a server-side
    /// processing failure subject to the configured failure policy.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::UnsupportedFormat | Self::Decode(_))
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    /// Encoded size ceiling in bytes.
    pub max_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// The smallest allowed size was reached and the result may still exceed
    /// the ceiling.
    pub floor_reached: bool,
}

/// Detect an accepted image format from magic bytes.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data)
        .ok()
        .filter(|format| ACCEPTED_FORMATS.contains(format))
}

/// Turns an uploaded image into the bytes that get stored.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn normalize(&self, data: Arc<[u8]>) -> Result<NormalizedImage, NormalizeError>;
}

/// Re-encodes uploads as JPEG under a byte ceiling.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    settings: NormalizerSettings,
}

impl ImageNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// CPU-bound part of [`ImageProcessor::normalize`]. Do not call from async code.
    pub fn normalize_blocking(&self, data: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        let format = sniff_format(data).ok_or(NormalizeError::UnsupportedFormat)?;
        let decoded =
            image::load_from_memory_with_format(data, format).map_err(NormalizeError::Decode)?;

        let (orig_w, orig_h) = decoded.dimensions();
        let base = flatten(&self.fit_within_bounds(decoded));
        let (width, height) = base.dimensions();
        debug!(
            ?format,
            orig_w, orig_h, width, height, "Normalizing product image"
        );

        let ceiling = self.settings.max_bytes;

        let mut last = encode_jpeg(&base, INITIAL_QUALITY)?;
        let mut quality = INITIAL_QUALITY;
        if within(&last, ceiling) {
            return Ok(done(last, width, height, quality, false));
        }

        for q in FALLBACK_QUALITIES {
            last = encode_jpeg(&base, q)?;
            quality = q;
            if within(&last, ceiling) {
                return Ok(done(last, width, height, quality, false));
            }
        }

        let mut current = base;
        for tenths in DOWNSCALE_TENTHS {
            let (cur_w, cur_h) = current.dimensions();
            let new_w = cur_w * tenths / 10;
            let new_h = cur_h * tenths / 10;
            if new_w < MIN_DIMENSION || new_h < MIN_DIMENSION {
                break;
            }

            current = image::imageops::resize(&current, new_w, new_h, FilterType::Lanczos3);
            last = encode_jpeg(&current, DOWNSCALE_QUALITY)?;
            quality = DOWNSCALE_QUALITY;
            if within(&last, ceiling) {
                return Ok(done(last, new_w, new_h, quality, false));
            }
        }

        let (out_w, out_h) = current.dimensions();
        debug!(
            size = last.len(),
            ceiling, out_w, out_h, "Image still above ceiling at the downscale floor"
        );
        Ok(done(last, out_w, out_h, quality, true))
    }

    /// Shrink to fit `max_width × max_height`, keeping the aspect ratio.
    fn fit_within_bounds(&self, img: DynamicImage) -> DynamicImage {
        let (w, h) = img.dimensions();
        let (max_w, max_h) = (self.settings.max_width, self.settings.max_height);
        if w <= max_w && h <= max_h {
            return img;
        }
        img.resize(max_w, max_h, FilterType::Lanczos3)
    }
}

#[async_trait]
impl ImageProcessor for ImageNormalizer {
    /// Normalize on the blocking thread pool.
    async fn normalize(&self, data: Arc<[u8]>) -> Result<NormalizedImage, NormalizeError> {
        let normalizer = self.clone();
        tokio::task::spawn_blocking(move || normalizer.normalize_blocking(&data)).await?
    }
}

fn within(data: &[u8], ceiling: u64) -> bool {
    data.len() as u64 <= ceiling
}

fn done(data: Vec<u8>, width: u32, height: u32, quality: u8, floor_reached: bool) -> NormalizedImage {
    NormalizedImage {
        data,
        width,
        height,
        quality,
        floor_reached,
    }
}

/// Convert to RGB, compositing any transparency onto a white background.
fn flatten(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut out = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(NormalizeError::Encode)?;
    Ok(out)
}
