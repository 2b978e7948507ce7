// lib.rs - VocalxLocal shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod auth;
pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod event;
pub mod gateway;
pub mod model;
pub mod runtime;
pub mod status;
pub mod telemetry;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use app::{ComplaintApp, Effect, Model, NavigationEvent, PendingOperation, ViewModel};
pub use catalog::{label_of, Category, PLACEHOLDER_LABEL};
pub use config::AppConfig;
pub use event::Event;
pub use gateway::{Confirmation, SubmissionError, SubmissionGateway};
pub use model::{
    ComplaintDraft, CoordinateError, Description, DraftId, LocationFix, MissingField, PhotoRef,
    SubmissionPayload, SubmissionState, TransitionError, ValidatedCoordinate,
};
pub use runtime::Runtime;
pub use status::{ComplaintStatus, StatusBoard, StatusFilter};
pub use telemetry::init_tracing;

pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Serialization,
    Deserialization,
    Configuration,
    Camera,
    CameraPermissionDenied,
    MediaLibraryPermissionDenied,
    Location,
    LocationPermissionDenied,
    PhotoUnavailable,
    SubmissionRejected,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Camera => "CAMERA_ERROR",
            Self::CameraPermissionDenied => "CAMERA_PERMISSION_DENIED",
            Self::MediaLibraryPermissionDenied => "MEDIA_LIBRARY_PERMISSION_DENIED",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::PhotoUnavailable => "PHOTO_UNAVAILABLE",
            Self::SubmissionRejected => "SUBMISSION_REJECTED",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::Conflict
            | Self::RateLimited
            | Self::Camera
            | Self::Location => ErrorSeverity::Transient,

            Self::Serialization
            | Self::Deserialization
            | Self::Configuration
            | Self::Internal
            | Self::InvalidState => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::CameraPermissionDenied
            | Self::MediaLibraryPermissionDenied
            | Self::LocationPermissionDenied
            | Self::PhotoUnavailable
            | Self::SubmissionRejected
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    /// Whether a fresh user action has a reasonable chance of succeeding.
    /// Nothing in the core retries on its own.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network
                | Self::Timeout
                | Self::RateLimited
                | Self::Conflict
                | Self::Camera
                | Self::Location
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Network error. Please check your connection and try again.".into()
            }
            ErrorKind::Timeout => {
                "The city server took too long to answer. Please try again.".into()
            }
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "Your account cannot file complaints.".into(),
            ErrorKind::Validation | ErrorKind::SubmissionRejected => self.message.clone(),
            ErrorKind::NotFound => "That complaint no longer exists.".into(),
            ErrorKind::Conflict => {
                "This complaint was already received. Please check your complaint list.".into()
            }
            ErrorKind::RateLimited => {
                "You are sending complaints too quickly. Wait a moment and retry.".into()
            }
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "The server answered with data the app cannot read.".into()
            }
            ErrorKind::Configuration => {
                "The app is not configured correctly. Please reinstall or contact support.".into()
            }
            ErrorKind::Camera => "The camera could not take a photo. Try again.".into(),
            ErrorKind::CameraPermissionDenied => {
                "Allow camera access in Settings to photograph the issue.".into()
            }
            ErrorKind::MediaLibraryPermissionDenied => {
                "Photo library access is required. Please enable it in Settings.".into()
            }
            ErrorKind::Location => {
                "Your location could not be determined. Check that GPS is on.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Allow location access in Settings to pin the issue.".into()
            }
            ErrorKind::PhotoUnavailable => {
                "The attached photo is no longer available. Please take or choose it again.".into()
            }
            ErrorKind::InvalidState => {
                "Something went wrong with this complaint. Reopen the form.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "Something went wrong. Try again later.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(ApiErrorResponse::message_from_body)
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Error body returned by the backend. Older endpoints use `error`, newer
/// ones `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorResponse {
    pub(crate) fn message_from_body(body: &[u8]) -> Option<String> {
        let parsed: Self = serde_json::from_slice(body).ok()?;
        parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| parsed.error.filter(|e| !e.trim().is_empty()))
    }
}
