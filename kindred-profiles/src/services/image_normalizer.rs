//! Uploaded photo normalization.
//!
//! Any supported container goes in, one baseline RGB JPEG comes out. The
//! pipeline is fixed:
//!
//! 1. decode and apply the EXIF orientation;
//! 2. drop alpha and palettes (RGB8);
//! 3. cap the longer side at [`MAX_DIMENSION`] px;
//! 4. encode at [`START_QUALITY`]; if that misses [`BYTE_BUDGET`], halve the
//!    dimensions once and encode again;
//! 5. step the quality down by [`QUALITY_STEP`] until the budget is met or
//!    [`MIN_QUALITY`] is reached.
//!
//! Ending at [`MIN_QUALITY`] above budget is accepted.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};

use kindred_shared::errors::{AppError, ErrorCode};

pub const MAX_DIMENSION: u32 = 1920;
pub const BYTE_BUDGET: usize = 100 * 1024;
pub const START_QUALITY: u8 = 90;
pub const MIN_QUALITY: u8 = 30;
pub const QUALITY_STEP: u8 = 10;

const HEIF_BRANDS: [&[u8; 4]; 7] = [b"heic", b"heix", b"hevc", b"heim", b"heis", b"mif1", b"msf1"];

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("unsupported or unreadable image: {0}")]
    Unsupported(String),
    #[error("image processing failed: {0}")]
    Processing(String),
}

impl NormalizeError {
    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Unsupported(_) => "unsupported",
            Self::Processing(_) => "failed",
        }
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::Unsupported(msg) => AppError::new(ErrorCode::UnsupportedFormat, msg),
            NormalizeError::Processing(msg) => AppError::new(ErrorCode::ProcessingFailed, msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// The one-off halving in step 4 ran.
    pub downscaled_for_budget: bool,
}

pub fn normalize(input: &[u8]) -> Result<NormalizedImage, NormalizeError> {
    let decoded = decode(input)?;
    let rgb = decoded.to_rgb8();
    drop(decoded);

    let (width, height) = capped_dimensions(rgb.width(), rgb.height());
    let mut image = if (width, height) == rgb.dimensions() {
        rgb
    } else {
        imageops::resize(&rgb, width, height, FilterType::Lanczos3)
    };

    let mut quality = START_QUALITY;
    let mut bytes = encode_jpeg(&image, quality)?;
    let mut downscaled_for_budget = false;

    if bytes.len() > BYTE_BUDGET {
        let (w, h) = image.dimensions();
        image = imageops::resize(&image, (w / 2).max(1), (h / 2).max(1), FilterType::Lanczos3);
        bytes = encode_jpeg(&image, quality)?;
        downscaled_for_budget = true;
    }

    while bytes.len() > BYTE_BUDGET && quality > MIN_QUALITY {
        quality -= QUALITY_STEP;
        bytes = encode_jpeg(&image, quality)?;
    }

    if bytes.len() > BYTE_BUDGET {
        tracing::debug!(size = bytes.len(), "image still over budget at minimum quality");
    }

    Ok(NormalizedImage {
        bytes,
        width: image.width(),
        height: image.height(),
        quality,
        downscaled_for_budget,
    })
}

/// Scale so the longer side is at most [`MAX_DIMENSION`], keeping the aspect ratio.
pub fn capped_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= MAX_DIMENSION {
        return (width, height);
    }

    let scale = MAX_DIMENSION as f64 / longer as f64;
    let fit = |side: u32| {
        if side == longer {
            MAX_DIMENSION
        } else {
            ((side as f64 * scale).round() as u32).max(1)
        }
    };
    (fit(width), fit(height))
}

fn decode(input: &[u8]) -> Result<DynamicImage, NormalizeError> {
    if input.is_empty() {
        return Err(NormalizeError::Unsupported("empty upload".into()));
    }
    if is_heif(input) {
        return decode_heif(input);
    }

    let unsupported = |e: image::ImageError| NormalizeError::Unsupported(e.to_string());

    let mut decoder = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| NormalizeError::Unsupported(e.to_string()))?
        .into_decoder()
        .map_err(unsupported)?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(unsupported)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// ISO BMFF `ftyp` box with a HEIF major brand.
pub fn is_heif(input: &[u8]) -> bool {
    input.len() >= 12
        && &input[4..8] == b"ftyp"
        && HEIF_BRANDS.iter().any(|brand| &input[8..12] == *brand)
}

#[cfg(feature = "heif")]
fn decode_heif(input: &[u8]) -> Result<DynamicImage, NormalizeError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let unsupported = |e: libheif_rs::HeifError| NormalizeError::Unsupported(e.to_string());

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(input).map_err(unsupported)?;
    let handle = ctx.primary_image_handle().map_err(unsupported)?;
    // libheif applies the container's rotation and mirroring itself.
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(unsupported)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| NormalizeError::Processing("HEIF image has no interleaved plane".into()))?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }

    RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| NormalizeError::Processing("HEIF plane size mismatch".into()))
}

#[cfg(not(feature = "heif"))]
fn decode_heif(_input: &[u8]) -> Result<DynamicImage, NormalizeError> {
    Err(NormalizeError::Unsupported(
        "HEIF/HEIC support is not enabled in this build".into(),
    ))
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| NormalizeError::Processing(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        }))
    }

    #[test]
    fn cap_keeps_aspect_ratio() {
        assert_eq!(capped_dimensions(3000, 2000), (1920, 1280));
        assert_eq!(capped_dimensions(1000, 4000), (480, 1920));
        assert_eq!(capped_dimensions(1920, 1080), (1920, 1080));
        assert_eq!(capped_dimensions(640, 480), (640, 480));
        assert_eq!(capped_dimensions(10_000, 1), (1920, 1));
    }

    #[test]
    fn small_image_passes_at_start_quality() {
        let input = encode(gradient(100, 80), ImageFormat::Png);
        let out = normalize(&input).unwrap();

        assert_eq!((out.width, out.height), (100, 80));
        assert_eq!(out.quality, START_QUALITY);
        assert!(!out.downscaled_for_budget);
        assert!(out.bytes.len() <= BYTE_BUDGET);
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn large_image_is_capped() {
        let input = encode(gradient(3000, 2000), ImageFormat::Png);
        let out = normalize(&input).unwrap();

        assert!(out.width.max(out.height) <= MAX_DIMENSION);
        assert_eq!(out.width * 2, out.height * 3);
        if !out.downscaled_for_budget {
            assert_eq!((out.width, out.height), (1920, 1280));
        }
    }

    #[test]
    fn noise_is_squeezed_toward_budget() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = RgbImage::from_fn(1200, 900, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
        let input = encode(DynamicImage::ImageRgb8(noise), ImageFormat::Png);

        let out = normalize(&input).unwrap();

        assert!(out.downscaled_for_budget);
        assert_eq!((out.width, out.height), (600, 450));
        assert!(out.bytes.len() <= BYTE_BUDGET || out.quality == MIN_QUALITY);
        assert!(out.quality >= MIN_QUALITY);
    }

    #[test]
    fn quality_floor_is_accepted_over_budget() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = RgbImage::from_fn(3000, 3000, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
        let input = encode(DynamicImage::ImageRgb8(noise), ImageFormat::Png);

        let out = normalize(&input).unwrap();

        assert!(out.downscaled_for_budget);
        assert_eq!((out.width, out.height), (960, 960));
        assert_eq!(out.quality, MIN_QUALITY);
        assert!(out.bytes.len() > BYTE_BUDGET);
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = RgbaImage::from_pixel(64, 64, Rgba([200, 10, 10, 40]));
        let input = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

        let out = normalize(&input).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn bmp_input_is_accepted() {
        let input = encode(gradient(40, 30), ImageFormat::Bmp);
        let out = normalize(&input).unwrap();
        assert_eq!((out.width, out.height), (40, 30));
    }

    #[test]
    fn garbage_is_unsupported() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, NormalizeError::Unsupported(_)));
        assert!(matches!(normalize(&[]).unwrap_err(), NormalizeError::Unsupported(_)));

        let app: AppError = err.into();
        assert_eq!(app.error_code(), ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn truncated_png_is_unsupported() {
        let input = encode(gradient(200, 200), ImageFormat::Png);
        let err = normalize(&input[..input.len() / 3]).unwrap_err();
        assert!(matches!(err, NormalizeError::Unsupported(_)));
    }

    #[test]
    fn heif_brand_sniffing() {
        let mut header = vec![0, 0, 0, 24];
        header.extend_from_slice(b"ftypheic");
        header.extend_from_slice(&[0; 12]);
        assert!(is_heif(&header));

        header[8..12].copy_from_slice(b"isom");
        assert!(!is_heif(&header));
        assert!(!is_heif(b"ftyp"));
    }
}
