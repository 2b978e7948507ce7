use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Category;
use crate::{AppError, ErrorKind, MAX_DESCRIPTION_CHARS};

/// Identifies one draft instance. Also sent as the idempotency key of its
/// submission, so a retried request cannot create a second complaint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(String);

impl DraftId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Don't store image bytes. Store a handle/URI.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub uri: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl PhotoRef {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
            width: None,
            height: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

// Local file paths can leak the device user name.
impl fmt::Debug for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoRef")
            .field("uri_len", &self.uri.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Location, e.to_string())
    }
}

/// Latitude and longitude in degrees, checked on construction and on
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct ValidatedCoordinate {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for ValidatedCoordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lon)
    }
}

impl ValidatedCoordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    #[must_use]
    pub const fn as_tuple(self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

impl TryFrom<(f64, f64)> for ValidatedCoordinate {
    type Error = CoordinateError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lat, lon)
    }
}

/// A location reading together with its reverse-geocoded address.
///
/// The address is empty when the geocoder had nothing for the coordinate.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: ValidatedCoordinate,
    pub address: String,
    pub accuracy_m: Option<f64>,
}

impl LocationFix {
    #[must_use]
    pub fn new(coordinate: ValidatedCoordinate, address: impl Into<String>) -> Self {
        Self {
            coordinate,
            address: address.into(),
            accuracy_m: None,
        }
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = accuracy_m.is_finite().then_some(accuracy_m);
        self
    }

    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

impl fmt::Debug for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationFix")
            .field("coordinate", &self.coordinate)
            .field("address_present", &self.has_address())
            .field("accuracy_m", &self.accuracy_m)
            .finish()
    }
}

/// Free-text description, never longer than [`MAX_DESCRIPTION_CHARS`]
/// characters.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Description(String);

impl From<String> for Description {
    fn from(text: String) -> Self {
        Self::clamped(text)
    }
}

impl From<Description> for String {
    fn from(description: Description) -> Self {
        description.0
    }
}

impl Description {
    #[must_use]
    pub fn clamped(text: impl Into<String>) -> Self {
        let mut text = text.into();
        truncate_chars(&mut text, MAX_DESCRIPTION_CHARS);
        Self(text)
    }

    /// Replaces the text, returning `true` when input had to be cut.
    pub fn replace(&mut self, text: impl Into<String>) -> bool {
        let mut text = text.into();
        let truncated = truncate_chars(&mut text, MAX_DESCRIPTION_CHARS);
        self.0 = text;
        truncated
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Description({} chars)", self.char_count())
    }
}

fn truncate_chars(text: &mut String, max_chars: usize) -> bool {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            text.truncate(byte_idx);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Category,
    Description,
    Location,
}

impl MissingField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Description => "description",
            Self::Location => "location",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Category => "Please select an issue type",
            Self::Description => "Please describe the issue",
            Self::Location => "Please add the location of the issue",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MissingField> for AppError {
    fn from(field: MissingField) -> Self {
        AppError::new(ErrorKind::Validation, field.message()).with_context("field", field.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed {
        reason: String,
    },
}

impl SubmissionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    /// Draft fields may only change in these states.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed { .. })
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Names of the states reachable from this one.
    #[must_use]
    pub fn valid_transitions(&self) -> Vec<&'static str> {
        match self {
            Self::Idle | Self::Failed { .. } => vec!["validating"],
            Self::Validating => vec!["idle", "submitting"],
            Self::Submitting => vec!["succeeded", "failed"],
            Self::Succeeded => vec![],
        }
    }

    #[must_use]
    pub fn can_transition_to(&self, to: &Self) -> bool {
        self.valid_transitions().contains(&to.name())
    }

    pub fn validate_transition(&self, to: &Self) -> Result<(), TransitionError> {
        if self.name() == to.name() {
            return Err(TransitionError::SameState { state: self.name() });
        }
        if self.is_terminal() {
            return Err(TransitionError::FromTerminalState { state: self.name() });
        }
        if !self.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                from: self.name(),
                to: to.name(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Submission is already {state}")]
    SameState { state: &'static str },
    #[error("Cannot leave terminal state: {state}")]
    FromTerminalState { state: &'static str },
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// The in-progress complaint owned by the submission screen.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintDraft {
    id: DraftId,
    photo: Option<PhotoRef>,
    category: Option<Category>,
    description: Description,
    location: Option<LocationFix>,
}

impl Default for ComplaintDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplaintDraft {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DraftId::generate(),
            photo: None,
            category: None,
            description: Description::default(),
            location: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &DraftId {
        &self.id
    }

    #[must_use]
    pub fn photo(&self) -> Option<&PhotoRef> {
        self.photo.as_ref()
    }

    #[must_use]
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    #[must_use]
    pub fn description(&self) -> &Description {
        &self.description
    }

    #[must_use]
    pub fn location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    pub fn set_photo(&mut self, photo: Option<PhotoRef>) {
        self.photo = photo;
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    /// Returns `true` when the text was cut to the length limit.
    pub fn set_description(&mut self, text: impl Into<String>) -> bool {
        self.description.replace(text)
    }

    pub fn set_location(&mut self, location: Option<LocationFix>) {
        self.location = location;
    }

    #[must_use]
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.photo.is_none()
            && self.category.is_none()
            && self.description.as_str().is_empty()
            && self.location.is_none()
    }

    /// Checks required fields in a fixed order and reports only the first
    /// one missing.
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.category.is_none() {
            return Err(MissingField::Category);
        }
        if self.description.is_blank() {
            return Err(MissingField::Description);
        }
        if self.location.is_none() {
            return Err(MissingField::Location);
        }
        Ok(())
    }

    pub fn to_payload(&self) -> Result<SubmissionPayload, MissingField> {
        let category = self.category.ok_or(MissingField::Category)?;
        if self.description.is_blank() {
            return Err(MissingField::Description);
        }
        let location = self.location.clone().ok_or(MissingField::Location)?;

        Ok(SubmissionPayload {
            draft_id: self.id.clone(),
            category,
            description: self.description.trimmed().to_string(),
            coordinate: location.coordinate,
            address: location.address,
            photo: self.photo.clone(),
        })
    }
}

// Redact debug output because this contains user-provided text.
impl fmt::Debug for ComplaintDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplaintDraft")
            .field("id", &self.id)
            .field("photo_present", &self.photo.is_some())
            .field("category", &self.category)
            .field("description", &self.description)
            .field("location", &self.location)
            .finish()
    }
}

/// Immutable snapshot of a validated draft, handed to the gateway.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub draft_id: DraftId,
    pub category: Category,
    pub description: String,
    pub coordinate: ValidatedCoordinate,
    pub address: String,
    pub photo: Option<PhotoRef>,
}

impl fmt::Debug for SubmissionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionPayload")
            .field("draft_id", &self.draft_id)
            .field("category", &self.category)
            .field("description_chars", &self.description.chars().count())
            .field("coordinate", &self.coordinate)
            .field("photo_present", &self.photo.is_some())
            .finish()
    }
}
