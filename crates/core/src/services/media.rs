//! Media processing service for uploaded report images.
//!
//! Uploads are checked against an extension allow-list, then normalized in
//! memory: large images are scaled down and everything decodable is
//! re-encoded. Anything the decoder cannot read (HEIC, corrupt files) is
//! stored as uploaded.

use std::io::Cursor;

use cozum_common::config::MediaSettings;
use cozum_common::{AppError, AppResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Extensions accepted for report media (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
    /// WebP format
    WebP,
    /// HEIC/HEIF format (stored as uploaded)
    Heic,
}

impl ImageFormat {
    /// Get MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Heic => "image/heic",
        }
    }

    /// Get file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Heic => "heic",
        }
    }

    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "heic" | "heif" => Some(Self::Heic),
            _ => None,
        }
    }

    /// Detect format from the extension of a file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        extension_of(name).and_then(Self::from_extension)
    }
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Result of normalizing one upload.
#[derive(Debug)]
pub struct ProcessedImage {
    /// Bytes to store
    pub data: Vec<u8>,
    /// File name, extension matching the stored encoding
    pub file_name: String,
    /// MIME type of `data`
    pub content_type: String,
    /// File size
    pub file_size: u64,
    /// Dimensions, when the image could be decoded
    pub dimensions: Option<ImageDimensions>,
    /// Whether `data` was re-encoded
    pub normalized: bool,
}

/// Media processing configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Maximum image dimension (width or height)
    pub max_dimension: u32,
    /// JPEG encoding quality
    pub jpeg_quality: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 85,
        }
    }
}

impl From<&MediaSettings> for MediaConfig {
    fn from(settings: &MediaSettings) -> Self {
        Self {
            max_dimension: settings.max_dimension,
            jpeg_quality: settings.jpeg_quality,
        }
    }
}

/// Media processing service.
#[derive(Clone)]
pub struct MediaService {
    config: MediaConfig,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub const fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Reject files whose extension is not on the allow-list.
    pub fn validate_extension(&self, file_name: &str) -> AppResult<ImageFormat> {
        ImageFormat::from_file_name(file_name).ok_or_else(|| {
            AppError::field(
                "media_files",
                format!(
                    "Unsupported file type: {file_name}. Allowed extensions: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ),
            )
        })
    }

    /// Normalize an upload on the blocking thread pool.
    pub async fn normalize_blocking(
        &self,
        file_name: String,
        data: Vec<u8>,
    ) -> AppResult<ProcessedImage> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.normalize(&file_name, data))
            .await
            .map_err(|e| AppError::Internal(format!("Image processing task failed: {e}")))
    }

    /// Downscale and re-encode an image.
    ///
    /// Never fails: when decoding or encoding does not work out, the
    /// original bytes come back unchanged.
    #[must_use]
    pub fn normalize(&self, file_name: &str, data: Vec<u8>) -> ProcessedImage {
        let declared = ImageFormat::from_file_name(file_name);

        let img = match image::load_from_memory(&data) {
            Ok(img) => img,
            Err(e) => {
                tracing::debug!(file_name, error = %e, "Image not decodable, storing as uploaded");
                return original(file_name, declared, data, None);
            }
        };

        let (width, height) = img.dimensions();
        let max = self.config.max_dimension;
        let img = if width > max || height > max {
            img.resize(max, max, FilterType::Lanczos3)
        } else {
            img
        };

        let target = match image::guess_format(&data) {
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            Ok(image::ImageFormat::WebP) => ImageFormat::WebP,
            _ => ImageFormat::Jpeg,
        };

        let encoded = match self.encode(&img, target) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::debug!(file_name, error = %e, "Image re-encode failed, storing as uploaded");
                let dimensions = ImageDimensions { width, height };
                return original(file_name, declared, data, Some(dimensions));
            }
        };

        let file_name = if declared == Some(target) {
            file_name.to_string()
        } else {
            with_extension(file_name, target.extension())
        };

        ProcessedImage {
            file_size: encoded.len() as u64,
            data: encoded,
            file_name,
            content_type: target.mime_type().to_string(),
            dimensions: Some(ImageDimensions {
                width: img.width(),
                height: img.height(),
            }),
            normalized: true,
        }
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> image::ImageResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());

        match format {
            ImageFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut out,
                    CompressionType::Best,
                    PngFilter::Adaptive,
                );
                img.write_with_encoder(encoder)?;
            }
            ImageFormat::WebP => {
                let encoder = WebPEncoder::new_lossless(&mut out);
                DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)?;
            }
            ImageFormat::Jpeg | ImageFormat::Heic => {
                let encoder = JpegEncoder::new_with_quality(&mut out, self.config.jpeg_quality);
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
            }
        }

        Ok(out.into_inner())
    }
}

fn original(
    file_name: &str,
    declared: Option<ImageFormat>,
    data: Vec<u8>,
    dimensions: Option<ImageDimensions>,
) -> ProcessedImage {
    ProcessedImage {
        file_size: data.len() as u64,
        data,
        file_name: file_name.to_string(),
        content_type: declared
            .map_or("application/octet-stream", |f| f.mime_type())
            .to_string(),
        dimensions,
        normalized: false,
    }
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn with_extension(name: &str, ext: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{ext}"),
        _ => format!("{name}.{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn encoded(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    fn service() -> MediaService {
        MediaService::new(MediaConfig::default())
    }

    #[test]
    fn test_validate_extension() {
        let service = service();
        assert_eq!(
            service.validate_extension("PHOTO.JPG").unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            service.validate_extension("IMG_0001.heif").unwrap(),
            ImageFormat::Heic
        );
        assert!(service.validate_extension("virus.exe").is_err());
        assert!(service.validate_extension("noextension").is_err());
        assert!(service.validate_extension(".jpg").is_err());
    }

    #[test]
    fn test_large_png_is_downscaled() {
        let data = encoded(1600, 800, image::ImageFormat::Png);
        let result = service().normalize("street.png", data);

        assert!(result.normalized);
        assert_eq!(result.file_name, "street.png");
        assert_eq!(result.content_type, "image/png");
        assert_eq!(
            result.dimensions,
            Some(ImageDimensions {
                width: 1024,
                height: 512
            })
        );

        let decoded = image::load_from_memory(&result.data).unwrap();
        assert!(decoded.width() <= 1024 && decoded.height() <= 1024);
    }

    #[test]
    fn test_small_jpeg_keeps_dimensions() {
        let data = encoded(500, 500, image::ImageFormat::Jpeg);
        let result = service().normalize("pothole.jpeg", data);

        assert_eq!(result.file_name, "pothole.jpeg");
        assert_eq!(result.content_type, "image/jpeg");
        assert_eq!(
            result.dimensions,
            Some(ImageDimensions {
                width: 500,
                height: 500
            })
        );
        assert_eq!(result.file_size, result.data.len() as u64);
    }

    #[test]
    fn test_mislabelled_file_is_renamed() {
        let data = encoded(64, 64, image::ImageFormat::Jpeg);
        let result = service().normalize("scan.png", data);

        assert_eq!(result.file_name, "scan.jpg");
        assert_eq!(result.content_type, "image/jpeg");
    }

    #[test]
    fn test_webp_stays_webp() {
        let data = encoded(32, 16, image::ImageFormat::WebP);
        let result = service().normalize("sign.webp", data);

        assert!(result.normalized);
        assert_eq!(result.file_name, "sign.webp");
        assert_eq!(result.content_type, "image/webp");
    }

    #[test]
    fn test_undecodable_bytes_are_kept() {
        let data = b"not really an image".to_vec();
        let result = service().normalize("IMG_0001.heic", data.clone());

        assert!(!result.normalized);
        assert_eq!(result.data, data);
        assert_eq!(result.file_name, "IMG_0001.heic");
        assert_eq!(result.content_type, "image/heic");
        assert!(result.dimensions.is_none());
    }

    #[tokio::test]
    async fn test_normalize_blocking() {
        let data = encoded(2048, 2048, image::ImageFormat::Png);
        let result = service()
            .normalize_blocking("big.png".to_string(), data)
            .await
            .unwrap();

        assert_eq!(
            result.dimensions,
            Some(ImageDimensions {
                width: 1024,
                height: 1024
            })
        );
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("a.b.png", "jpg"), "a.b.jpg");
        assert_eq!(with_extension("photo", "jpg"), "photo.jpg");
    }
}
