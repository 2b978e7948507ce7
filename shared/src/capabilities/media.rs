//! Device media: camera, photo library and location.
//!
//! The shell owns the platform APIs. The core only sees the outcome of each
//! single-shot request through [`MediaAdapter`]. Turning a [`PhotoRef`] back
//! into bytes for upload goes through [`PhotoSource`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::model::{LocationFix, PhotoRef};
use crate::{AppError, ErrorKind, MAX_PHOTO_BYTES};

pub const DEFAULT_JPEG_QUALITY: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCapability {
    Camera,
    MediaLibrary,
    Location,
}

impl DeviceCapability {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::MediaLibrary => "media_library",
            Self::Location => "location",
        }
    }

    #[must_use]
    pub const fn permission_error_kind(self) -> ErrorKind {
        match self {
            Self::Camera => ErrorKind::CameraPermissionDenied,
            Self::MediaLibrary => ErrorKind::MediaLibraryPermissionDenied,
            Self::Location => ErrorKind::LocationPermissionDenied,
        }
    }

    const fn failure_kind(self) -> ErrorKind {
        match self {
            Self::Camera | Self::MediaLibrary => ErrorKind::Camera,
            Self::Location => ErrorKind::Location,
        }
    }
}

impl std::fmt::Display for DeviceCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a photo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Camera,
    Library,
}

impl MediaSource {
    #[must_use]
    pub const fn capability(self) -> DeviceCapability {
        match self {
            Self::Camera => DeviceCapability::Camera,
            Self::Library => DeviceCapability::MediaLibrary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Heic,
    WebP,
}

impl ImageFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heic => "image/heic",
            Self::WebP => "image/webp",
        }
    }

    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if &data[4..8] == b"ftyp" {
            let brand = &data[8..12];
            if brand == b"heic" || brand == b"heix" || brand == b"mif1" {
                return Some(Self::Heic);
            }
        }

        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "4:3")]
    Ratio4x3,
    #[serde(rename = "16:9")]
    Ratio16x9,
}

impl AspectRatio {
    #[must_use]
    pub const fn as_tuple(self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Ratio4x3 => (4, 3),
            Self::Ratio16x9 => (16, 9),
        }
    }
}

/// Options the shell applies to the capture and picker UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub aspect_ratio: AspectRatio,
    /// JPEG quality in percent.
    pub quality: u8,
    pub allows_editing: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Ratio4x3,
            quality: DEFAULT_JPEG_QUALITY,
            allows_editing: true,
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn without_editing(mut self) -> Self {
        self.allows_editing = false;
        self
    }

    #[must_use]
    pub fn validated(mut self) -> Self {
        self.quality = self.quality.clamp(1, 100);
        self
    }

    /// Quality as the 0.0..=1.0 factor most platform pickers expect.
    #[must_use]
    pub fn quality_factor(self) -> f32 {
        f32::from(self.quality) / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    Balanced,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhotoOutcome {
    Captured(PhotoRef),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationOutcome {
    Located(LocationFix),
    Cancelled,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaError {
    #[error("{0} permission denied")]
    PermissionDenied(DeviceCapability),

    #[error("{0} is not available on this device")]
    Unavailable(DeviceCapability),

    #[error("{capability} request failed: {message}")]
    Failed {
        capability: DeviceCapability,
        message: String,
    },

    #[error("photo file not found")]
    NotFound,

    #[error("photo too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("unsupported photo URI scheme '{scheme}'")]
    UnsupportedUri { scheme: String },

    #[error("failed to read photo: {message}")]
    Io { message: String },
}

impl MediaError {
    /// Errors that mean a stored photo reference can no longer be read.
    #[must_use]
    pub const fn is_photo_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::TooLarge { .. }
                | Self::UnsupportedFormat
                | Self::UnsupportedUri { .. }
                | Self::Io { .. }
        )
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        let kind = match &e {
            MediaError::PermissionDenied(capability) => capability.permission_error_kind(),
            MediaError::Unavailable(capability) | MediaError::Failed { capability, .. } => {
                capability.failure_kind()
            }
            MediaError::NotFound
            | MediaError::TooLarge { .. }
            | MediaError::UnsupportedFormat
            | MediaError::UnsupportedUri { .. }
            | MediaError::Io { .. } => ErrorKind::PhotoUnavailable,
        };
        AppError::new(kind, e.to_string())
    }
}

pub type PhotoResult = Result<PhotoOutcome, MediaError>;
pub type LocationResult = Result<LocationOutcome, MediaError>;

/// Single-shot device requests. Each call negotiates its own permission.
///
/// Implementations do not guard against overlapping calls; the state machine
/// never issues a second request while one is pending.
#[async_trait]
pub trait MediaAdapter: Send + Sync {
    async fn capture_photo(&self, config: CaptureConfig) -> PhotoResult;

    async fn select_photo_from_library(&self, config: CaptureConfig) -> PhotoResult;

    /// The address in a successful fix is best effort and may be empty.
    async fn acquire_current_location(&self, accuracy: LocationAccuracy) -> LocationResult;
}

#[derive(Clone, PartialEq, Eq)]
pub struct PhotoData {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl std::fmt::Debug for PhotoData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoData")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn load(&self, photo: &PhotoRef) -> Result<PhotoData, MediaError>;
}

/// Reads photos that the platform left on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsPhotoSource {
    max_bytes: usize,
}

impl Default for FsPhotoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FsPhotoSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_PHOTO_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes.max(1);
        self
    }

    fn resolve_path(uri: &str) -> Result<PathBuf, MediaError> {
        if !uri.contains("://") {
            return Ok(PathBuf::from(uri));
        }
        let parsed = url::Url::parse(uri).map_err(|e| MediaError::Io {
            message: e.to_string(),
        })?;
        if parsed.scheme() != "file" {
            return Err(MediaError::UnsupportedUri {
                scheme: parsed.scheme().to_string(),
            });
        }
        parsed.to_file_path().map_err(|()| MediaError::Io {
            message: "file URI does not map to a local path".to_string(),
        })
    }

    fn io_error(e: &std::io::Error) -> MediaError {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::NotFound
        } else {
            MediaError::Io {
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PhotoSource for FsPhotoSource {
    #[tracing::instrument(skip_all)]
    async fn load(&self, photo: &PhotoRef) -> Result<PhotoData, MediaError> {
        let path = Self::resolve_path(&photo.uri)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::io_error(&e))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.max_bytes {
            return Err(MediaError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| Self::io_error(&e))?;
        let format = ImageFormat::from_magic_bytes(&bytes).ok_or(MediaError::UnsupportedFormat)?;

        tracing::debug!(bytes = bytes.len(), mime_type = format.mime_type(), "photo loaded");

        Ok(PhotoData {
            bytes,
            mime_type: format.mime_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: [u8; 12] = [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];

    mod format_tests {
        use super::*;

        #[test]
        fn test_image_format_detection_jpeg() {
            assert_eq!(
                ImageFormat::from_magic_bytes(&JPEG_HEADER),
                Some(ImageFormat::Jpeg)
            );
        }

        #[test]
        fn test_image_format_detection_png() {
            let png_header = [
                0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
            ];
            assert_eq!(
                ImageFormat::from_magic_bytes(&png_header),
                Some(ImageFormat::Png)
            );
        }

        #[test]
        fn test_image_format_detection_heic() {
            let heic_header = *b"\x00\x00\x00\x18ftypheic";
            assert_eq!(
                ImageFormat::from_magic_bytes(&heic_header),
                Some(ImageFormat::Heic)
            );
        }

        #[test]
        fn test_image_format_detection_too_short() {
            assert_eq!(ImageFormat::from_magic_bytes(&[0xFF, 0xD8]), None);
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_capture_config_defaults() {
            let config = CaptureConfig::default();
            assert_eq!(config.aspect_ratio, AspectRatio::Ratio4x3);
            assert_eq!(config.quality, 70);
            assert!(config.allows_editing);
            assert!((config.quality_factor() - 0.7).abs() < f32::EPSILON);
        }

        #[test]
        fn test_capture_config_clamps_quality() {
            assert_eq!(CaptureConfig::default().with_quality(0).quality, 1);
            assert_eq!(CaptureConfig::default().with_quality(250).quality, 100);

            let config = CaptureConfig {
                quality: 180,
                ..CaptureConfig::default()
            };
            assert_eq!(config.validated().quality, 100);
        }

        #[test]
        fn test_aspect_ratio_serde() {
            let json = serde_json::to_string(&AspectRatio::Ratio16x9).unwrap();
            assert_eq!(json, "\"16:9\"");
            assert_eq!(AspectRatio::default().as_tuple(), (4, 3));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_permission_errors_map_per_capability() {
            let err: AppError = MediaError::PermissionDenied(DeviceCapability::Camera).into();
            assert_eq!(err.kind, ErrorKind::CameraPermissionDenied);

            let err: AppError = MediaError::PermissionDenied(DeviceCapability::MediaLibrary).into();
            assert_eq!(err.kind, ErrorKind::MediaLibraryPermissionDenied);

            let err: AppError = MediaError::PermissionDenied(DeviceCapability::Location).into();
            assert_eq!(err.kind, ErrorKind::LocationPermissionDenied);
        }

        #[test]
        fn test_unreadable_photo_maps_to_photo_unavailable() {
            let err: AppError = MediaError::NotFound.into();
            assert_eq!(err.kind, ErrorKind::PhotoUnavailable);
            assert!(MediaError::UnsupportedFormat.is_photo_unavailable());
            assert!(!MediaError::PermissionDenied(DeviceCapability::Camera).is_photo_unavailable());
        }
    }

    mod fs_source_tests {
        use super::*;
        use std::io::Write;

        fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(bytes).unwrap();
            file
        }

        #[tokio::test]
        async fn test_loads_plain_path() {
            let mut bytes = JPEG_HEADER.to_vec();
            bytes.extend_from_slice(&[0u8; 64]);
            let file = write_temp(&bytes);

            let photo = PhotoRef::new(file.path().to_string_lossy());
            let data = FsPhotoSource::new().load(&photo).await.unwrap();
            assert_eq!(data.mime_type, "image/jpeg");
            assert_eq!(data.bytes.len(), 76);
        }

        #[tokio::test]
        async fn test_loads_file_uri() {
            let file = write_temp(&JPEG_HEADER);
            let uri = url::Url::from_file_path(file.path()).unwrap();

            let data = FsPhotoSource::new()
                .load(&PhotoRef::new(uri.as_str()))
                .await
                .unwrap();
            assert_eq!(data.mime_type, "image/jpeg");
        }

        #[tokio::test]
        async fn test_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let photo = PhotoRef::new(dir.path().join("gone.jpg").to_string_lossy());
            assert_eq!(
                FsPhotoSource::new().load(&photo).await,
                Err(MediaError::NotFound)
            );
        }

        #[tokio::test]
        async fn test_rejects_oversized_file() {
            let file = write_temp(&[0u8; 128]);
            let photo = PhotoRef::new(file.path().to_string_lossy());
            let result = FsPhotoSource::new().with_max_bytes(64).load(&photo).await;
            assert_eq!(result, Err(MediaError::TooLarge { size: 128, max: 64 }));
        }

        #[tokio::test]
        async fn test_rejects_non_image() {
            let file = write_temp(b"definitely not an image");
            let photo = PhotoRef::new(file.path().to_string_lossy());
            assert_eq!(
                FsPhotoSource::new().load(&photo).await,
                Err(MediaError::UnsupportedFormat)
            );
        }

        #[tokio::test]
        async fn test_rejects_platform_content_uris() {
            let photo = PhotoRef::new("content://media/external/images/1");
            assert!(matches!(
                FsPhotoSource::new().load(&photo).await,
                Err(MediaError::UnsupportedUri { .. })
            ));
        }
    }
}
