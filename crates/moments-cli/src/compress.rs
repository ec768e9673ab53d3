//! Iterative re-encoding of images until they fit a byte budget.
//!
//! Each attempt lowers the JPEG quality and shrinks the bounding box. The
//! smallest encoding seen so far is kept, so a result is always returned even
//! when the budget is never met, and it is never larger than the original.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, RgbImage};
use thiserror::Error;

use crate::upload::ImageAsset;

/// Hard ceiling for any single compressed image.
pub const MAX_COMPRESSED_BYTES: usize = 5 * 1024 * 1024;

/// Budget used before analysis, chosen to keep eight images well under the
/// gateway body limit.
pub const ANALYZE_TARGET_BYTES: usize = 350 * 1024;

pub fn default_target_bytes() -> usize {
    MAX_COMPRESSED_BYTES.min(ANALYZE_TARGET_BYTES)
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("图片处理失败: {0}")]
    Image(#[from] ImageError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionSettings {
    pub initial_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
    pub initial_max_dimension: u32,
    pub dimension_ratio: f32,
    pub min_dimension: u32,
    pub max_attempts: usize,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            initial_quality: 82,
            quality_step: 10,
            min_quality: 28,
            initial_max_dimension: 1800,
            dimension_ratio: 0.82,
            min_dimension: 520,
            max_attempts: 8,
        }
    }
}

/// Parameters for a single encoding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub quality: u8,
    pub max_width: u32,
    pub max_height: u32,
}

impl EncodeParams {
    pub fn initial(settings: &CompressionSettings) -> Self {
        Self {
            quality: settings.initial_quality,
            max_width: settings.initial_max_dimension,
            max_height: settings.initial_max_dimension,
        }
    }

    /// Parameters for the attempt after this one, clamped to the floors.
    pub fn next(self, settings: &CompressionSettings) -> Self {
        let shrink = |dimension: u32| {
            ((dimension as f32 * settings.dimension_ratio).round() as u32).max(settings.min_dimension)
        };
        Self {
            quality: self
                .quality
                .saturating_sub(settings.quality_step)
                .max(settings.min_quality),
            max_width: shrink(self.max_width),
            max_height: shrink(self.max_height),
        }
    }
}

/// Codec used for each attempt.
pub trait ImageEncoder {
    fn mime(&self) -> &'static str;

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError>;
}

/// JPEG output; transparent pixels are flattened onto white first.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegReencoder;

impl ImageEncoder for JpegReencoder {
    fn mime(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
        let rgb = flatten_onto_white(image);
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)?;
        Ok(bytes)
    }
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        flattened.put_pixel(
            x,
            y,
            image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }
    flattened
}

/// Downscales to fit the box, preserving aspect ratio. Never upscales.
fn fit_within(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if image.width() <= max_width && image.height() <= max_height {
        return image.clone();
    }
    image.resize(max_width, max_height, FilterType::Triangle)
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data_url: String,
    pub byte_len: usize,
    pub original_len: usize,
    /// Encoding attempts made; zero when the original was used unchanged.
    pub attempts: usize,
    pub within_budget: bool,
}

impl CompressedImage {
    fn from_bytes(bytes: &[u8], mime: &str, original_len: usize, attempts: usize, budget: usize) -> Self {
        Self {
            data_url: format!("data:{};base64,{}", mime, BASE64.encode(bytes)),
            byte_len: bytes.len(),
            original_len,
            attempts,
            within_budget: bytes.len() <= budget,
        }
    }
}

/// Compresses `asset` toward `budget` bytes.
pub fn compress_image<E: ImageEncoder + ?Sized>(
    asset: &ImageAsset,
    budget: usize,
    settings: &CompressionSettings,
    encoder: &E,
) -> Result<CompressedImage, CompressError> {
    let original_len = asset.bytes.len();
    if original_len <= budget {
        return Ok(CompressedImage::from_bytes(
            &asset.bytes,
            asset.kind.mime(),
            original_len,
            0,
            budget,
        ));
    }

    let mut working = image::load_from_memory(&asset.bytes)?;
    let mut best: Option<Vec<u8>> = None;
    let mut best_len = original_len;
    let mut params = EncodeParams::initial(settings);
    let mut attempts = 0;

    while attempts < settings.max_attempts {
        attempts += 1;
        working = fit_within(&working, params.max_width, params.max_height);
        let encoded = encoder.encode(&working, params.quality)?;
        log::debug!(
            "{}: attempt {} q={} box={}x{} -> {} bytes",
            asset.name,
            attempts,
            params.quality,
            params.max_width,
            params.max_height,
            encoded.len()
        );

        if encoded.len() <= budget {
            return Ok(CompressedImage::from_bytes(
                &encoded,
                encoder.mime(),
                original_len,
                attempts,
                budget,
            ));
        }
        if encoded.len() < best_len {
            best_len = encoded.len();
            best = Some(encoded);
        }
        params = params.next(settings);
    }

    log::debug!(
        "{}: budget of {} bytes not met after {} attempts, keeping {} bytes",
        asset.name,
        budget,
        attempts,
        best_len
    );
    Ok(match best {
        Some(bytes) => {
            CompressedImage::from_bytes(&bytes, encoder.mime(), original_len, attempts, budget)
        }
        None => CompressedImage::from_bytes(
            &asset.bytes,
            asset.kind.mime(),
            original_len,
            attempts,
            budget,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Returns pre-set output sizes and records what it was asked to encode.
    struct ScriptedEncoder {
        sizes: Vec<usize>,
        calls: RefCell<Vec<(u8, u32, u32)>>,
    }

    impl ScriptedEncoder {
        fn new(sizes: &[usize]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ImageEncoder for ScriptedEncoder {
        fn mime(&self) -> &'static str {
            "image/jpeg"
        }

        fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
            let mut calls = self.calls.borrow_mut();
            let size = self.sizes[calls.len()];
            calls.push((quality, image.width(), image.height()));
            Ok(vec![0u8; size])
        }
    }

    fn noisy_png(width: u32, height: u32, alpha: u8) -> ImageAsset {
        let mut seed: u32 = 0x1234_5678;
        let image = RgbaImage::from_fn(width, height, |_, _| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let [r, g, b, _] = seed.to_le_bytes();
            Rgba([r, g, b, alpha])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        ImageAsset::from_bytes("noise.png", cursor.into_inner()).unwrap()
    }

    #[test]
    fn original_within_budget_is_returned_unchanged() {
        let asset = noisy_png(8, 8, 255);
        let encoder = ScriptedEncoder::new(&[]);

        let result = compress_image(&asset, asset.bytes.len(), &CompressionSettings::default(), &encoder).unwrap();

        assert_eq!(result.attempts, 0);
        assert_eq!(result.data_url, asset.data_url());
        assert!(result.within_budget);
        assert!(encoder.calls.borrow().is_empty());
    }

    #[test]
    fn stops_at_first_attempt_within_budget() {
        let asset = noisy_png(64, 64, 255);
        let encoder = ScriptedEncoder::new(&[900, 40, 10]);

        let result = compress_image(&asset, 50, &CompressionSettings::default(), &encoder).unwrap();

        assert_eq!(result.attempts, 2);
        assert_eq!(result.byte_len, 40);
        assert!(result.within_budget);
        assert!(result.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn keeps_smallest_attempt_when_budget_is_never_met() {
        let asset = noisy_png(64, 64, 255);
        let sizes = [500, 300, 400, 350, 600, 320, 310, 330];
        let encoder = ScriptedEncoder::new(&sizes);

        let result = compress_image(&asset, 10, &CompressionSettings::default(), &encoder).unwrap();

        assert_eq!(result.attempts, 8);
        assert_eq!(result.byte_len, 300);
        assert!(!result.within_budget);
        assert!(sizes.iter().all(|size| result.byte_len <= *size));
    }

    #[test]
    fn falls_back_to_original_when_every_attempt_is_larger() {
        let asset = noisy_png(16, 16, 255);
        let huge = asset.bytes.len() + 1;
        let encoder = ScriptedEncoder::new(&[huge; 8]);

        let result = compress_image(&asset, 1, &CompressionSettings::default(), &encoder).unwrap();

        assert_eq!(result.byte_len, asset.bytes.len());
        assert_eq!(result.data_url, asset.data_url());
    }

    #[test]
    fn quality_and_box_shrink_toward_their_floors() {
        let asset = noisy_png(800, 400, 255);
        let settings = CompressionSettings {
            initial_max_dimension: 600,
            min_dimension: 130,
            ..CompressionSettings::default()
        };
        let encoder = ScriptedEncoder::new(&[100; 8]);

        compress_image(&asset, 1, &settings, &encoder).unwrap();

        let calls = encoder.calls.borrow();
        let qualities: Vec<u8> = calls.iter().map(|call| call.0).collect();
        assert_eq!(qualities, vec![82, 72, 62, 52, 42, 32, 28, 28]);
        assert_eq!((calls[0].1, calls[0].2), (600, 300));
        assert!(calls.windows(2).all(|pair| pair[1].1 < pair[0].1));
        assert!(calls.iter().all(|call| call.1 >= 130));
    }

    #[test]
    fn params_clamp_at_floors() {
        let settings = CompressionSettings::default();
        let mut params = EncodeParams::initial(&settings);
        for _ in 0..20 {
            params = params.next(&settings);
        }
        assert_eq!(params.quality, 28);
        assert_eq!(params.max_width, 520);
        assert_eq!(params.max_height, 520);

        let second = EncodeParams::initial(&settings).next(&settings);
        assert_eq!(second.max_width, 1476);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let asset = noisy_png(300, 200, 255);
        let encoder = ScriptedEncoder::new(&[100; 8]);

        compress_image(&asset, 1, &CompressionSettings::default(), &encoder).unwrap();

        assert!(encoder.calls.borrow().iter().all(|call| (call.1, call.2) == (300, 200)));
    }

    #[test]
    fn jpeg_reencoder_flattens_transparency() {
        let transparent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let flattened = flatten_onto_white(&transparent);
        assert_eq!(flattened.get_pixel(0, 0), &image::Rgb([255, 255, 255]));

        let bytes = JpegReencoder.encode(&transparent, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn real_compression_never_grows_the_image() {
        let asset = noisy_png(256, 256, 200);

        let result = compress_image(&asset, 20 * 1024, &CompressionSettings::default(), &JpegReencoder).unwrap();

        assert!(result.attempts >= 1);
        assert!(result.byte_len <= asset.bytes.len());
        assert!(result.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn default_target_is_the_smaller_budget() {
        assert_eq!(default_target_bytes(), 350 * 1024);
    }
}
