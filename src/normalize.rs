//! Deterministic resize + JPEG re-encode for profile images, logos and
//! captured stills.
//!
//! Decoding and encoding run on the blocking pool; callers await the result.
//! The public `normalize` entry points never fail: a payload that cannot be
//! decoded comes back unchanged.

use crate::config::{NormalizePreset, NormalizerConfig};
use crate::error::NormalizeError;
use crate::frame::{FrameData, FrameFormat};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

/// Output size preserving aspect ratio with the longer side capped at
/// `max_dimension`. Never upscales.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max = u64::from(max_dimension.max(1));
    let (w, h) = (u64::from(width), u64::from(height));

    let (out_w, out_h) = if w > h {
        if w > max {
            (max, h * max / w)
        } else {
            (w, h)
        }
    } else if h > max {
        (w * max / h, max)
    } else {
        (w, h)
    };

    (out_w.max(1) as u32, out_h.max(1) as u32)
}

/// Map a 0..1 quality onto the encoder's 1..=100 scale
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn resize_and_encode(
    image: DynamicImage,
    max_dimension: u32,
    quality: f32,
) -> Result<Bytes, NormalizeError> {
    let (width, height) = (image.width(), image.height());
    let (out_w, out_h) = target_dimensions(width, height, max_dimension);

    let resized = if (out_w, out_h) == (width, height) {
        image
    } else {
        image.resize_exact(out_w, out_h, FilterType::Triangle)
    };
    let rgb = resized.to_rgb8();

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
    encoder
        .encode_image(&rgb)
        .map_err(|e| NormalizeError::EncodeFailed {
            details: e.to_string(),
        })?;

    debug!(
        "Normalized {}x{} -> {}x{} ({} bytes, quality {:.2})",
        width,
        height,
        out_w,
        out_h,
        buf.len(),
        quality
    );
    Ok(Bytes::from(buf))
}

/// Decode, resize and re-encode on the calling thread
pub fn try_normalize(
    input: &[u8],
    max_dimension: u32,
    quality: f32,
) -> Result<Bytes, NormalizeError> {
    let image = image::load_from_memory(input).map_err(|e| NormalizeError::DecodeFailed {
        details: e.to_string(),
    })?;
    resize_and_encode(image, max_dimension, quality)
}

/// Encode a raw device frame as a JPEG still, capped at `max_dimension`
pub fn encode_frame(
    frame: &FrameData,
    max_dimension: u32,
    quality: f32,
) -> Result<Bytes, NormalizeError> {
    let image = match frame.format {
        FrameFormat::Rgb24 => {
            RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        FrameFormat::Rgba32 => {
            RgbaImage::from_raw(frame.width, frame.height, frame.data.to_vec())
                .map(DynamicImage::ImageRgba8)
        }
        FrameFormat::Jpeg => image::load_from_memory(&frame.data).ok(),
    }
    .ok_or_else(|| NormalizeError::DecodeFailed {
        details: format!(
            "frame {} ({:?}, {}x{}, {} bytes) is not a valid image",
            frame.id,
            frame.format,
            frame.width,
            frame.height,
            frame.data.len()
        ),
    })?;

    resize_and_encode(image, max_dimension, quality)
}

/// Best-effort normalization: the original bytes come back if decoding fails
pub async fn normalize(input: Bytes, max_dimension: u32, quality: f32) -> Bytes {
    let source = input.clone();
    let result =
        tokio::task::spawn_blocking(move || try_normalize(&source, max_dimension, quality)).await;

    match result {
        Ok(Ok(normalized)) => normalized,
        Ok(Err(e)) => {
            debug!("Normalization skipped, keeping original: {}", e);
            input
        }
        Err(e) => {
            warn!("Normalization task failed, keeping original: {}", e);
            input
        }
    }
}

/// Apply a preset; inputs at or below its size threshold pass through
pub async fn normalize_with_preset(input: Bytes, preset: &NormalizePreset) -> Bytes {
    if let Some(min) = preset.min_input_bytes {
        if input.len() <= min {
            return input;
        }
    }
    normalize(input, preset.max_dimension, preset.quality).await
}

/// Company logo / personal photo upload path: reject oversized files, then
/// normalize unconditionally with the logo preset
pub async fn prepare_logo_upload(
    input: Bytes,
    config: &NormalizerConfig,
) -> Result<Bytes, NormalizeError> {
    if input.len() > config.max_logo_upload_bytes {
        return Err(NormalizeError::TooLarge {
            size: input.len(),
            limit: config.max_logo_upload_bytes,
        });
    }
    Ok(normalize_with_preset(input, &config.logo).await)
}

const DATA_URL_PREFIX: &str = "data:";
const IMAGE_DATA_URL_PREFIX: &str = "data:image/";

/// Size of the payload a data URL carries, estimated from its length
pub fn estimated_data_url_bytes(data_url: &str) -> usize {
    data_url.len() * 3 / 4
}

pub fn is_image_data_url(value: &str) -> bool {
    value.starts_with(IMAGE_DATA_URL_PREFIX)
}

/// Split a base64 data URL into its media type and decoded bytes
pub fn decode_data_url(data_url: &str) -> Option<(String, Vec<u8>)> {
    let rest = data_url.strip_prefix(DATA_URL_PREFIX)?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}

pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Shrink an embedded image data URL when its estimated size exceeds the
/// preset threshold. Anything else is returned as is.
pub async fn compress_data_url_if_needed(data_url: String, preset: &NormalizePreset) -> String {
    if !is_image_data_url(&data_url) {
        return data_url;
    }
    if let Some(min) = preset.min_input_bytes {
        if estimated_data_url_bytes(&data_url) <= min {
            return data_url;
        }
    }

    let Some((_, raw)) = decode_data_url(&data_url) else {
        debug!("Malformed image data URL left untouched");
        return data_url;
    };

    let raw = Bytes::from(raw);
    let normalized = normalize(raw.clone(), preset.max_dimension, preset.quality).await;
    if normalized == raw {
        return data_url;
    }
    encode_data_url("image/jpeg", &normalized)
}
