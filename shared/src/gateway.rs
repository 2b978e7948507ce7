//! Delivery of a finished draft to the complaints backend.
//!
//! A gateway makes exactly one attempt per call. Retrying is a new user
//! action that goes back through validation first.

use async_trait::async_trait;
use base64::Engine as _;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::capabilities::{
    HttpClient, HttpError, HttpRequest, MediaError, PhotoData, PhotoSource, ValidatedUrl,
};
use crate::model::SubmissionPayload;
use crate::{ApiErrorResponse, AppError, ErrorKind, DEFAULT_SIMULATED_DELAY_MS, SUBMIT_TIMEOUT};

pub const COMPLAINTS_PATH: &str = "/api/complaints";
pub const DEFAULT_CONFIRMATION_MESSAGE: &str = "Your complaint has been submitted successfully.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub complaint_id: Option<String>,
    pub message: Option<String>,
}

impl Confirmation {
    #[must_use]
    pub fn message_or_default(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_CONFIRMATION_MESSAGE)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("submission timed out")]
    Timeout,

    #[error("not authorized to submit complaints")]
    Unauthorized,

    #[error("rejected by server with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("photo unavailable: {reason}")]
    PhotoUnavailable { reason: String },

    #[error("failed to encode submission: {message}")]
    Encoding { message: String },
}

impl SubmissionError {
    /// Text shown to the user while the draft sits in `Failed`.
    #[must_use]
    pub fn reason(&self) -> String {
        AppError::from(self.clone()).user_facing_message()
    }
}

impl From<SubmissionError> for AppError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Network { message } => {
                AppError::new(ErrorKind::Network, "network error").with_internal(message)
            }
            SubmissionError::Timeout => AppError::new(ErrorKind::Timeout, "submission timed out"),
            SubmissionError::Unauthorized => {
                AppError::new(ErrorKind::Authentication, "not authorized")
            }
            SubmissionError::Rejected { status, message } => {
                let mut err = AppError::from_http_status(status, None);
                if err.kind == ErrorKind::Validation || err.kind == ErrorKind::Unknown {
                    err.kind = ErrorKind::SubmissionRejected;
                    err.severity = ErrorKind::SubmissionRejected.default_severity();
                }
                if message.trim().is_empty() {
                    err.message = "The complaint could not be registered. Please try again.".into();
                } else {
                    err.message = message;
                }
                err
            }
            SubmissionError::PhotoUnavailable { reason } => {
                AppError::new(ErrorKind::PhotoUnavailable, "photo unavailable")
                    .with_internal(reason)
            }
            SubmissionError::Encoding { message } => {
                AppError::new(ErrorKind::Serialization, "encoding failed").with_internal(message)
            }
        }
    }
}

impl From<HttpError> for SubmissionError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout { .. } => Self::Timeout,
            HttpError::Connection { .. } | HttpError::Network { .. } => Self::Network {
                message: e.to_string(),
            },
            HttpError::InvalidResponse { .. } | HttpError::ResponseTooLarge { .. } => {
                Self::Network {
                    message: e.to_string(),
                }
            }
            HttpError::InvalidUrl { .. }
            | HttpError::InvalidHeader { .. }
            | HttpError::TooManyHeaders { .. }
            | HttpError::BodyTooLarge { .. }
            | HttpError::InvalidRequest { .. }
            | HttpError::Serialization { .. } => Self::Encoding {
                message: e.to_string(),
            },
        }
    }
}

impl From<MediaError> for SubmissionError {
    fn from(e: MediaError) -> Self {
        Self::PhotoUnavailable {
            reason: e.to_string(),
        }
    }
}

pub type SubmissionResult = Result<Confirmation, SubmissionError>;

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionResult;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComplaintRequest<'a> {
    category: &'a str,
    description: &'a str,
    latitude: f64,
    longitude: f64,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo: Option<PhotoUpload>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoUpload {
    mime_type: &'static str,
    data: String,
}

impl From<PhotoData> for PhotoUpload {
    fn from(photo: PhotoData) -> Self {
        Self {
            mime_type: photo.mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(&photo.bytes),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ComplaintResponse {
    #[serde(default, alias = "_id", alias = "complaintId")]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Posts complaints as JSON to `{server_url}/api/complaints`.
///
/// The draft id goes out as `Idempotency-Key` so a resubmitted draft is
/// recognisable server side.
pub struct HttpSubmissionGateway<C, P> {
    client: C,
    photos: P,
    endpoint: ValidatedUrl,
    token: Option<SecretString>,
    timeout: Duration,
}

impl<C: HttpClient, P: PhotoSource> HttpSubmissionGateway<C, P> {
    pub fn new(client: C, photos: P, server_url: &ValidatedUrl) -> Result<Self, HttpError> {
        Ok(Self {
            client,
            photos,
            endpoint: server_url.join(COMPLAINTS_PATH)?,
            token: None,
            timeout: SUBMIT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &ValidatedUrl {
        &self.endpoint
    }

    fn build_request(
        &self,
        payload: &SubmissionPayload,
        photo: Option<PhotoUpload>,
    ) -> Result<HttpRequest, HttpError> {
        let (latitude, longitude) = payload.coordinate.as_tuple();
        let body = ComplaintRequest {
            category: payload.category.code(),
            description: &payload.description,
            latitude,
            longitude,
            address: &payload.address,
            photo,
        };

        let mut request = HttpRequest::post(self.endpoint.clone())
            .with_timeout(self.timeout)?
            .with_header("Accept", "application/json")?
            .with_header("Idempotency-Key", payload.draft_id.as_str())?
            .with_json(&body)?;

        if let Some(token) = &self.token {
            request = request.with_bearer_token(token)?;
        }
        Ok(request)
    }
}

#[async_trait]
impl<C: HttpClient, P: PhotoSource> SubmissionGateway for HttpSubmissionGateway<C, P> {
    #[instrument(
        skip_all,
        fields(
            draft_id = %payload.draft_id,
            category = payload.category.code(),
            has_photo = payload.photo.is_some()
        )
    )]
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionResult {
        let photo = match &payload.photo {
            Some(photo_ref) => Some(PhotoUpload::from(self.photos.load(photo_ref).await?)),
            None => None,
        };

        let request = self.build_request(payload, photo)?;
        let response = self.client.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, "complaint request failed");
            SubmissionError::from(e)
        })?;

        match response.status() {
            200 | 201 => {
                let parsed = response.json::<ComplaintResponse>().unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "complaint response body not understood");
                    ComplaintResponse::default()
                });
                tracing::info!(status = response.status(), "complaint accepted");
                Ok(Confirmation {
                    complaint_id: parsed.id,
                    message: parsed.message,
                })
            }
            401 => Err(SubmissionError::Unauthorized),
            status => {
                tracing::warn!(status, "complaint rejected");
                Err(SubmissionError::Rejected {
                    status,
                    message: ApiErrorResponse::message_from_body(response.body())
                        .unwrap_or_default(),
                })
            }
        }
    }
}

/// Stand-in backend: waits, then accepts every complaint.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS))
    }
}

impl SimulatedGateway {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SubmissionGateway for SimulatedGateway {
    #[instrument(skip_all, fields(draft_id = %payload.draft_id, delay = ?self.delay))]
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionResult {
        tokio::time::sleep(self.delay).await;
        Ok(Confirmation {
            complaint_id: Some(payload.draft_id.to_string()),
            message: Some(DEFAULT_CONFIRMATION_MESSAGE.to_string()),
        })
    }
}
