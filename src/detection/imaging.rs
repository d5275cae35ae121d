//! Upload validation and lightweight image inspection

use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::config::UploadConfig;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Below this size an image is likely too small to analyze
const MIN_USEFUL_SIZE: usize = 50_000;
/// Above this size an image should be compressed before upload
const MAX_COMFORTABLE_SIZE: usize = 5_000_000;

/// An uploaded image as received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image size ({size_mb}MB) exceeds maximum allowed size ({max_mb}MB)")]
    TooLarge { size_mb: i64, max_mb: i64 },

    #[error("Image type {content_type} is not supported. Allowed types: {allowed}")]
    UnsupportedType { content_type: String, allowed: String },
}

/// Check size and declared MIME type against the upload limits
pub fn validate_image(upload: &ImageUpload, config: &UploadConfig) -> Result<(), ImageError> {
    if upload.bytes.len() > config.max_file_size {
        return Err(ImageError::TooLarge {
            size_mb: (upload.bytes.len() as f64 / BYTES_PER_MB).round() as i64,
            max_mb: (config.max_file_size as f64 / BYTES_PER_MB).round() as i64,
        });
    }

    if !config.allowed_types.iter().any(|t| *t == upload.content_type) {
        return Err(ImageError::UnsupportedType {
            content_type: upload.content_type.clone(),
            allowed: config.allowed_types.join(", "),
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageMetadata {
    pub size: usize,
    pub format: ImageFormat,
    pub quality: ImageQuality,
}

/// Sniff the format from magic bytes and grade quality by size
pub fn image_metadata(bytes: &[u8]) -> ImageMetadata {
    let format = match bytes {
        [0xff, 0xd8, ..] => ImageFormat::Jpeg,
        [0x89, 0x50, ..] => ImageFormat::Png,
        [0x52, 0x49, ..] => ImageFormat::Webp,
        _ => ImageFormat::Unknown,
    };

    let size = bytes.len();
    let quality = if size < 100_000 {
        ImageQuality::Low
    } else if size > 1_000_000 {
        ImageQuality::High
    } else {
        ImageQuality::Medium
    };

    ImageMetadata { size, format, quality }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityAssessment {
    pub suitable: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn assess_quality(bytes: &[u8]) -> QualityAssessment {
    let metadata = image_metadata(bytes);
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if metadata.size < MIN_USEFUL_SIZE {
        issues.push("Image resolution may be too low for accurate detection".to_string());
        recommendations.push("Use a higher resolution image (at least 500x500 pixels)".to_string());
    }
    if metadata.size > MAX_COMFORTABLE_SIZE {
        issues.push("Image file size is very large".to_string());
        recommendations.push("Consider compressing the image to reduce file size".to_string());
    }
    if metadata.quality == ImageQuality::Low {
        issues.push("Image quality appears to be low".to_string());
        recommendations.push("Ensure good lighting and focus when taking the photo".to_string());
    }

    if issues.is_empty() {
        recommendations.push("Image appears suitable for disease detection".to_string());
    } else {
        recommendations.extend(
            [
                "Take a clear, well-lit photo of the affected plant part",
                "Ensure the diseased area is clearly visible",
                "Avoid blurry or dark images",
            ]
            .map(String::from),
        );
    }

    QualityAssessment {
        suitable: issues.is_empty(),
        issues,
        recommendations,
    }
}

/// Storage name: `<user>_<millis>_<6 random chars>.<ext>`
pub fn generate_filename(original_name: &str, user_id: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "jpg".to_string());

    format!("{user_id}_{millis}_{suffix}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            filename: "leaf.jpg".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_validate_rejects_size_and_type() {
        let config = UploadConfig::default();

        assert!(validate_image(&upload("image/jpeg", 1024), &config).is_ok());

        let err = validate_image(&upload("image/jpeg", 12 * 1024 * 1024), &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Image size (12MB) exceeds maximum allowed size (10MB)"
        );

        let err = validate_image(&upload("image/gif", 1024), &config).unwrap_err();
        assert!(err.to_string().starts_with("Image type image/gif is not supported"));
    }

    #[test]
    fn test_metadata_sniffs_magic_bytes() {
        let mut jpeg = vec![0u8; 200_000];
        jpeg[0] = 0xff;
        jpeg[1] = 0xd8;
        let meta = image_metadata(&jpeg);
        assert_eq!(meta.format, ImageFormat::Jpeg);
        assert_eq!(meta.quality, ImageQuality::Medium);

        assert_eq!(image_metadata(&[0x89, 0x50, 0x4e]).format, ImageFormat::Png);
        assert_eq!(image_metadata(b"RIFF").format, ImageFormat::Webp);
        assert_eq!(image_metadata(&[]).format, ImageFormat::Unknown);
        assert_eq!(image_metadata(&vec![0u8; 2_000_000]).quality, ImageQuality::High);
    }

    #[test]
    fn test_assessment_flags_small_images() {
        let small = assess_quality(&[0u8; 10_000]);
        assert!(!small.suitable);
        assert_eq!(small.issues.len(), 2);
        assert_eq!(small.recommendations.len(), 5);

        let fine = assess_quality(&vec![0u8; 300_000]);
        assert!(fine.suitable);
        assert_eq!(
            fine.recommendations,
            vec!["Image appears suitable for disease detection"]
        );
    }

    #[test]
    fn test_generated_filename_shape() {
        let name = generate_filename("Leaf.PNG", "user_42");
        assert!(name.starts_with("user_42_"));
        assert!(name.ends_with(".png"));
        let suffix = name.trim_end_matches(".png").rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 6);

        assert!(generate_filename("photo", "anonymous").ends_with(".jpg"));
    }
}
