//! Decode, measure, resize, crop and encode uploaded images.

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat, Limits};
use std::io::Cursor;

use crate::api::error::SystemError;
use crate::constants::JPEG_QUALITY;
use crate::modules::uploader::model::{CropRect, DecodeLimits, DimensionBounds, ShowBand};

/// Formats accepted by the uploader.
pub const SUPPORTED_FORMATS: [ImageFormat; 4] =
    [ImageFormat::Gif, ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp];

#[derive(Debug)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    limits: DecodeLimits,
}

impl ImageProcessor {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Decodes GIF, JPEG, PNG or BMP data under the configured size limits.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage, SystemError> {
        let mut reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| SystemError::not_uploaded(e.to_string()))?;

        let format = reader
            .format()
            .filter(|f| SUPPORTED_FORMATS.contains(f))
            .ok_or_else(|| SystemError::not_uploaded("unsupported image format"))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_dimension);
        limits.max_image_height = Some(self.limits.max_dimension);
        limits.max_alloc = Some(self.limits.max_alloc);
        reader.limits(limits);

        let image = reader.decode().map_err(|e| SystemError::not_uploaded(e.to_string()))?;

        tracing::debug!(
            format = ?format,
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );

        Ok(DecodedImage { image, format })
    }

    pub fn extension(format: ImageFormat) -> &'static str {
        match format {
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            _ => "jpg",
        }
    }

    /// Checks each axis against its own bound, minimums first.
    pub fn check_bounds(
        (width, height): (u32, u32),
        bounds: &DimensionBounds,
    ) -> Result<(), SystemError> {
        let too_narrow = bounds.min_width.is_some_and(|min| width < min);
        let too_short = bounds.min_height.is_some_and(|min| height < min);
        if too_narrow || too_short {
            return Err(SystemError::ImageTooSmall(
                bound_message("at least", bounds.min_width, bounds.min_height).into(),
            ));
        }

        let too_wide = bounds.max_width.is_some_and(|max| width > max);
        let too_tall = bounds.max_height.is_some_and(|max| height > max);
        if too_wide || too_tall {
            return Err(SystemError::ImageTooLarge(
                bound_message("at most", bounds.max_width, bounds.max_height).into(),
            ));
        }

        Ok(())
    }

    /// Target size for resize-to-show, or `None` when the width already sits
    /// inside the display band.
    pub fn show_size(dimensions: (u32, u32), show: &ShowBand) -> Option<(u32, u32)> {
        let (width, _) = dimensions;
        if let Some(max) = show.max_width.filter(|max| width > *max) {
            return Some(Self::scale_to_width(dimensions, max));
        }
        if let Some(min) = show.min_width.filter(|min| width < *min) {
            return Some(Self::scale_to_width(dimensions, min));
        }
        None
    }

    /// Rejects a resize target the decoder itself would refuse to load.
    pub fn check_target(&self, (width, height): (u32, u32)) -> Result<(), SystemError> {
        let max = self.limits.max_dimension;
        // Resized buffers are RGBA at worst.
        let bytes = u64::from(width) * u64::from(height) * 4;
        if width > max || height > max || bytes > self.limits.max_alloc {
            return Err(SystemError::ImageTooLarge(
                format!("The resized image must be at most {max} pixels wide and {max} pixels tall.")
                    .into(),
            ));
        }
        Ok(())
    }

    /// Downscale-only variant used after a crop.
    pub fn shrink_to_width(dimensions: (u32, u32), target: u32) -> Option<(u32, u32)> {
        (dimensions.0 > target).then(|| Self::scale_to_width(dimensions, target))
    }

    pub fn scale_to_width((width, height): (u32, u32), target: u32) -> (u32, u32) {
        let target = target.max(1);
        let ratio = target as f64 / width.max(1) as f64;
        let scaled_height = (height as f64 * ratio).round().max(1.0) as u32;
        (target, scaled_height)
    }

    pub fn resize(image: &DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
        tracing::debug!(
            from_width = image.width(),
            from_height = image.height(),
            to_width = width,
            to_height = height,
            "Resizing image"
        );
        image.resize_exact(width, height, FilterType::CatmullRom)
    }

    /// Maps a preview-space rectangle back to source pixels. Rectangles that
    /// leave the source image are rejected, never clamped.
    pub fn source_rect(
        rect: CropRect,
        proportion: f64,
        (width, height): (u32, u32),
    ) -> Result<PixelRect, SystemError> {
        if !proportion.is_finite() || proportion <= 0.0 {
            return Err(SystemError::invalid_geometry("Upload proportion must be greater than zero."));
        }
        if [rect.x, rect.y, rect.w, rect.h].iter().any(|v| !v.is_finite()) {
            return Err(SystemError::invalid_geometry("Crop coordinates must be numbers."));
        }

        // Edges are rounded, not the extent, so a selection flush with the
        // preview border stays flush with the source border.
        let x = (rect.x / proportion).round();
        let y = (rect.y / proportion).round();
        let w = ((rect.x + rect.w) / proportion).round() - x;
        let h = ((rect.y + rect.h) / proportion).round() - y;

        if x < 0.0 || y < 0.0 {
            return Err(SystemError::invalid_geometry("Crop origin must not be negative."));
        }
        if w < 1.0 || h < 1.0 {
            return Err(SystemError::invalid_geometry("Crop area must be at least one pixel."));
        }
        if x + w > width as f64 || y + h > height as f64 {
            return Err(SystemError::invalid_geometry(format!(
                "Crop area exceeds the {width}x{height} source image."
            )));
        }

        Ok(PixelRect { x: x as u32, y: y as u32, width: w as u32, height: h as u32 })
    }

    pub fn crop(image: &DynamicImage, rect: PixelRect) -> DynamicImage {
        image.crop_imm(rect.x, rect.y, rect.width, rect.height)
    }

    pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buffer = Vec::with_capacity((rgb.width() * rgb.height()) as usize / 4);
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?;
        Ok(buffer)
    }
}

fn bound_message(qualifier: &str, width: Option<u32>, height: Option<u32>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => {
            format!("The image must be {qualifier} {w} pixels wide and {h} pixels tall.")
        }
        (Some(w), None) => format!("The image must be {qualifier} {w} pixels wide."),
        (None, Some(h)) => format!("The image must be {qualifier} {h} pixels tall."),
        (None, None) => "The image dimensions are out of range.".to_string(),
    }
}

/// Content type for stored bytes: sniffed image format first, then the
/// filename extension.
pub fn detect_content_type(filename: &str, bytes: &[u8]) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    mime_guess::from_path(filename).first_or_octet_stream().to_string()
}
