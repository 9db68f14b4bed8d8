use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, Luma};
use std::io::Cursor;

use crate::error::EngineError;
use crate::models::EncodedImage;

/// General attachments are optimized for transfer size; OCR-directed images
/// keep a larger working resolution because text legibility matters more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    General,
    Ocr,
}

const GENERAL_MAX_EDGE: u32 = 1024;
const OCR_MAX_EDGE: u32 = 2048;
const OCR_UPSCALE_CAP: f32 = 2.0;
const PASSTHROUGH_MAX_BYTES: usize = 512 * 1024;
const JPEG_QUALITY: u8 = 80;

/// Convert an arbitrary image file into a size-capped, transport-ready
/// encoding. TIFF and friends go through the same decode step as everything
/// else; the output is always JPEG unless the input qualified for
/// pass-through.
pub fn normalize(bytes: &[u8], mode: NormalizeMode) -> Result<EncodedImage, EngineError> {
    let format = image::guess_format(bytes).ok();

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| EngineError::Decode(e.to_string()))?;
    let (width, height) = decoded.dimensions();
    let longest = width.max(height);

    // Small inputs already in a web-friendly format are forwarded untouched
    // to avoid a lossy re-encode.
    if mode == NormalizeMode::General
        && longest <= GENERAL_MAX_EDGE
        && bytes.len() <= PASSTHROUGH_MAX_BYTES
    {
        if let Some(fmt @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) = format {
            return Ok(EncodedImage {
                mime_type: mime_for(fmt).to_string(),
                data: STANDARD.encode(bytes),
            });
        }
    }

    let output = match mode {
        NormalizeMode::General => {
            if longest > GENERAL_MAX_EDGE {
                decoded.resize(GENERAL_MAX_EDGE, GENERAL_MAX_EDGE, FilterType::Triangle)
            } else {
                decoded
            }
        }
        NormalizeMode::Ocr => {
            let scaled = scale_for_ocr(decoded);
            DynamicImage::ImageLuma8(enhance_for_ocr(&scaled))
        }
    };

    encode_jpeg(&output)
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        _ => "image/jpeg",
    }
}

/// Bring the longest edge toward the OCR working limit. Upscaling is capped
/// at 2x so we never invent detail that is not in the source.
fn scale_for_ocr(img: DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height) as f32;
    let scale = (OCR_MAX_EDGE as f32 / longest).min(OCR_UPSCALE_CAP);

    if (scale - 1.0).abs() < 0.01 {
        return img;
    }

    let new_width = ((width as f32) * scale).round().max(1.0) as u32;
    let new_height = ((height as f32) * scale).round().max(1.0) as u32;
    img.resize(new_width, new_height, FilterType::Lanczos3)
}

/// Contrast enhancement for text extraction: weighted grayscale, gamma 0.8,
/// then a soft contrast stretch around the midpoint band. Deliberately not a
/// hard binarization, which destroys thin glyph strokes.
fn enhance_for_ocr(img: &DynamicImage) -> image::GrayImage {
    const BAND_LO: f32 = 96.0;
    const BAND_HI: f32 = 160.0;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut out = image::GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let gamma = (luma / 255.0).powf(0.8) * 255.0;

        let stretched = if gamma < BAND_LO {
            gamma * (64.0 / BAND_LO)
        } else if gamma <= BAND_HI {
            64.0 + (gamma - BAND_LO) * (128.0 / (BAND_HI - BAND_LO))
        } else {
            192.0 + (gamma - BAND_HI) * (63.0 / (255.0 - BAND_HI))
        };

        out.put_pixel(x, y, Luma([stretched.clamp(0.0, 255.0) as u8]));
    }

    out
}

fn encode_jpeg(img: &DynamicImage) -> Result<EncodedImage, EngineError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| EngineError::Encode(e.to_string()))?;

    let data = buffer.into_inner();
    if data.is_empty() {
        return Err(EngineError::Encode(
            "encoder returned an empty buffer".to_string(),
        ));
    }

    Ok(EncodedImage {
        mime_type: "image/jpeg".to_string(),
        data: STANDARD.encode(data),
    })
}
