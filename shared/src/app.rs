//! The complaint submission screen as a pure reducer.
//!
//! `ComplaintApp::update` folds one [`Event`] into the [`Model`] and returns
//! the [`Effect`]s the shell has to perform. Device and network work never
//! happens here; its outcome comes back as another event.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::{
    CaptureConfig, DeviceCapability, LocationAccuracy, LocationOutcome, MediaError, MediaSource,
    PhotoOutcome,
};
use crate::catalog::{self, Category};
use crate::config::AppConfig;
use crate::event::Event;
use crate::gateway::{Confirmation, SubmissionError};
use crate::model::{ComplaintDraft, PermissionState, SubmissionPayload, SubmissionState};
use crate::{AppError, MAX_DESCRIPTION_CHARS};

pub const DESCRIPTION_CLAMPED_TOAST: &str = "Description is limited to 500 characters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum PendingOperation {
    Photo(MediaSource),
    Location,
    Submission,
}

impl PendingOperation {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Photo(MediaSource::Camera) => "camera",
            Self::Photo(MediaSource::Library) => "library",
            Self::Location => "location",
            Self::Submission => "submission",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub camera: PermissionState,
    pub media_library: PermissionState,
    pub location: PermissionState,
}

impl Permissions {
    #[must_use]
    pub const fn get(&self, capability: DeviceCapability) -> PermissionState {
        match capability {
            DeviceCapability::Camera => self.camera,
            DeviceCapability::MediaLibrary => self.media_library,
            DeviceCapability::Location => self.location,
        }
    }

    pub fn set(&mut self, capability: DeviceCapability, state: PermissionState) {
        match capability {
            DeviceCapability::Camera => self.camera = state,
            DeviceCapability::MediaLibrary => self.media_library = state,
            DeviceCapability::Location => self.location = state,
        }
    }
}

/// State of one submission screen session.
#[derive(Debug, Clone)]
pub struct Model {
    draft: ComplaintDraft,
    state: SubmissionState,
    pending: Option<PendingOperation>,
    awaiting_photo_confirmation: bool,
    permissions: Permissions,
    active_error: Option<AppError>,
    toast: Option<String>,
    last_confirmation: Option<Confirmation>,
    capture_config: CaptureConfig,
    location_accuracy: LocationAccuracy,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

impl Model {
    #[must_use]
    pub fn new(capture_config: CaptureConfig) -> Self {
        Self {
            draft: ComplaintDraft::new(),
            state: SubmissionState::Idle,
            pending: None,
            awaiting_photo_confirmation: false,
            permissions: Permissions::default(),
            active_error: None,
            toast: None,
            last_confirmation: None,
            capture_config: capture_config.validated(),
            location_accuracy: LocationAccuracy::High,
        }
    }

    #[must_use]
    pub fn with_location_accuracy(mut self, accuracy: LocationAccuracy) -> Self {
        self.location_accuracy = accuracy;
        self
    }

    /// Model whose device requests use the configured capture options.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.capture_config()).with_location_accuracy(config.location_accuracy())
    }

    #[must_use]
    pub fn draft(&self) -> &ComplaintDraft {
        &self.draft
    }

    #[must_use]
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingOperation> {
        self.pending
    }

    #[must_use]
    pub fn is_awaiting_photo_confirmation(&self) -> bool {
        self.awaiting_photo_confirmation
    }

    #[must_use]
    pub fn permission(&self, capability: DeviceCapability) -> PermissionState {
        self.permissions.get(capability)
    }

    #[must_use]
    pub fn active_error(&self) -> Option<&AppError> {
        self.active_error.as_ref()
    }

    #[must_use]
    pub fn toast(&self) -> Option<&str> {
        self.toast.as_deref()
    }

    #[must_use]
    pub fn last_confirmation(&self) -> Option<&Confirmation> {
        self.last_confirmation.as_ref()
    }

    /// Field edits are accepted only in `Idle` and `Failed`.
    #[must_use]
    pub fn accepts_edits(&self) -> bool {
        self.state.is_editable()
    }

    /// A new device request or submit may start.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.is_editable() && self.pending.is_none()
    }

    fn reset_session(&mut self) {
        self.draft = ComplaintDraft::new();
        self.state = SubmissionState::Idle;
        self.pending = None;
        self.awaiting_photo_confirmation = false;
        self.active_error = None;
        self.toast = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationEvent {
    /// The shell should leave the submission screen.
    SubmissionSucceeded,
}

/// Work the shell performs on behalf of the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Render,
    CapturePhoto(CaptureConfig),
    SelectPhoto(CaptureConfig),
    AcquireLocation(LocationAccuracy),
    /// Ask "continue without photo?" and answer with
    /// [`Event::ContinueWithoutPhoto`].
    ConfirmWithoutPhoto,
    Submit(Box<SubmissionPayload>),
    Navigate(NavigationEvent),
}

impl Effect {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::CapturePhoto(_) => "capture_photo",
            Self::SelectPhoto(_) => "select_photo",
            Self::AcquireLocation(_) => "acquire_location",
            Self::ConfirmWithoutPhoto => "confirm_without_photo",
            Self::Submit(_) => "submit",
            Self::Navigate(_) => "navigate",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryOption {
    pub code: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocationView {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub has_address: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorView {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for ErrorView {
    fn from(e: &AppError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.user_facing_message(),
            retryable: e.is_retryable(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub state: String,
    pub categories: Vec<CategoryOption>,
    pub category_label: String,
    pub description: String,
    pub description_chars: usize,
    pub description_limit: usize,
    pub photo_uri: Option<String>,
    pub location: Option<LocationView>,
    pub inputs_enabled: bool,
    pub can_submit: bool,
    pub is_submitting: bool,
    pub acquiring: Option<PendingOperation>,
    pub confirm_without_photo: bool,
    pub failure_reason: Option<String>,
    pub error: Option<ErrorView>,
    pub toast: Option<String>,
    pub permissions: Permissions,
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplaintApp;

impl ComplaintApp {
    pub fn update(&self, event: Event, model: &mut Model) -> Vec<Effect> {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            state = model.state.name(),
            "update"
        );

        if event.is_edit() && !model.accepts_edits() {
            return Self::ignore(&event, model, "draft is not editable");
        }

        match event {
            Event::DraftOpened | Event::DraftClosed => {
                if model.state == SubmissionState::Submitting {
                    return Self::ignore(&event, model, "submission in progress");
                }
                info!(event = event.name(), previous = model.state.name(), "draft reset");
                model.reset_session();
                vec![Effect::Render]
            }

            Event::CapturePhotoRequested => {
                Self::start_acquisition(model, PendingOperation::Photo(MediaSource::Camera))
            }
            Event::SelectPhotoRequested => {
                Self::start_acquisition(model, PendingOperation::Photo(MediaSource::Library))
            }
            Event::LocationRequested => Self::start_acquisition(model, PendingOperation::Location),

            Event::PhotoResolved(result) => {
                let Some(PendingOperation::Photo(source)) = model.pending else {
                    return Self::ignore(&Event::PhotoResolved(result), model, "stale photo result");
                };
                model.pending = None;
                match *result {
                    Ok(PhotoOutcome::Captured(photo)) => {
                        model.permissions.set(source.capability(), PermissionState::Granted);
                        model.draft.set_photo(Some(photo));
                        info!(source = ?source, "photo attached");
                    }
                    Ok(PhotoOutcome::Cancelled) => {
                        model.permissions.set(source.capability(), PermissionState::Granted);
                        debug!(source = ?source, "photo cancelled");
                    }
                    Err(e) => Self::record_media_error(model, e),
                }
                vec![Effect::Render]
            }

            Event::LocationResolved(result) => {
                if model.pending != Some(PendingOperation::Location) {
                    return Self::ignore(
                        &Event::LocationResolved(result),
                        model,
                        "stale location result",
                    );
                }
                model.pending = None;
                match *result {
                    Ok(LocationOutcome::Located(fix)) => {
                        model
                            .permissions
                            .set(DeviceCapability::Location, PermissionState::Granted);
                        info!(
                            has_address = fix.has_address(),
                            accuracy_m = ?fix.accuracy_m,
                            "location attached"
                        );
                        model.draft.set_location(Some(fix));
                    }
                    Ok(LocationOutcome::Cancelled) => debug!("location cancelled"),
                    Err(e) => Self::record_media_error(model, e),
                }
                vec![Effect::Render]
            }

            Event::ClearPhoto => {
                if matches!(model.pending, Some(PendingOperation::Photo(_))) {
                    return Self::ignore(&Event::ClearPhoto, model, "photo request pending");
                }
                model.draft.set_photo(None);
                vec![Effect::Render]
            }

            Event::CategorySelected(category) => {
                model.draft.set_category(category);
                vec![Effect::Render]
            }

            Event::DescriptionChanged { text } => {
                if model.draft.set_description(text) {
                    debug!(limit = MAX_DESCRIPTION_CHARS, "description clamped");
                    model.toast = Some(DESCRIPTION_CLAMPED_TOAST.to_string());
                }
                vec![Effect::Render]
            }

            Event::SubmitRequested => Self::submit_requested(model),

            Event::ContinueWithoutPhoto { confirmed } => {
                if !model.awaiting_photo_confirmation
                    || model.state != SubmissionState::Validating
                {
                    return Self::ignore(
                        &Event::ContinueWithoutPhoto { confirmed },
                        model,
                        "no confirmation requested",
                    );
                }
                model.awaiting_photo_confirmation = false;
                if confirmed {
                    Self::begin_submission(model)
                } else {
                    debug!("submission declined without photo");
                    Self::transition_or_report(model, SubmissionState::Idle)
                }
            }

            Event::SubmissionResolved(result) => {
                if model.pending != Some(PendingOperation::Submission)
                    || model.state != SubmissionState::Submitting
                {
                    return Self::ignore(
                        &Event::SubmissionResolved(result),
                        model,
                        "stale submission result",
                    );
                }
                model.pending = None;
                match *result {
                    Ok(confirmation) => Self::submission_succeeded(model, confirmation),
                    Err(e) => Self::submission_failed(model, e),
                }
            }

            Event::DismissError => {
                model.active_error = None;
                vec![Effect::Render]
            }

            Event::DismissToast => {
                model.toast = None;
                vec![Effect::Render]
            }
        }
    }

    #[must_use]
    pub fn view(&self, model: &Model) -> ViewModel {
        let draft = &model.draft;
        let selected = draft.category();

        ViewModel {
            state: model.state.name().to_string(),
            categories: Category::ALL
                .iter()
                .map(|c| CategoryOption {
                    code: c.code().to_string(),
                    label: c.label().to_string(),
                    selected: selected == Some(*c),
                })
                .collect(),
            category_label: catalog::label_of(selected.map(Category::code)).to_string(),
            description: draft.description().as_str().to_string(),
            description_chars: draft.description().char_count(),
            description_limit: MAX_DESCRIPTION_CHARS,
            photo_uri: draft.photo().map(|p| p.uri.clone()),
            location: draft.location().map(|fix| LocationView {
                latitude: fix.coordinate.lat(),
                longitude: fix.coordinate.lon(),
                address: fix.address.clone(),
                has_address: fix.has_address(),
            }),
            inputs_enabled: model.accepts_edits(),
            can_submit: model.is_ready(),
            is_submitting: model.state == SubmissionState::Submitting,
            acquiring: model
                .pending
                .filter(|p| *p != PendingOperation::Submission),
            confirm_without_photo: model.awaiting_photo_confirmation,
            failure_reason: model.state.failure_reason().map(str::to_string),
            error: model.active_error.as_ref().map(ErrorView::from),
            toast: model.toast.clone(),
            permissions: model.permissions,
            confirmation_message: match (&model.state, &model.last_confirmation) {
                (SubmissionState::Succeeded, Some(c)) => Some(c.message_or_default().to_string()),
                _ => None,
            },
        }
    }

    fn start_acquisition(model: &mut Model, operation: PendingOperation) -> Vec<Effect> {
        if let Some(pending) = model.pending {
            debug!(
                requested = operation.name(),
                pending = pending.name(),
                "acquisition ignored, another operation pending"
            );
            return vec![];
        }

        model.pending = Some(operation);
        model.active_error = None;
        debug!(operation = operation.name(), "acquisition started");

        let request = match operation {
            PendingOperation::Photo(MediaSource::Camera) => {
                Effect::CapturePhoto(model.capture_config)
            }
            PendingOperation::Photo(MediaSource::Library) => {
                Effect::SelectPhoto(model.capture_config)
            }
            PendingOperation::Location => Effect::AcquireLocation(model.location_accuracy),
            PendingOperation::Submission => return vec![],
        };
        vec![request, Effect::Render]
    }

    fn record_media_error(model: &mut Model, error: MediaError) {
        if let MediaError::PermissionDenied(capability) = &error {
            model.permissions.set(*capability, PermissionState::Denied);
        }
        warn!(error = %error, "media request failed");
        model.active_error = Some(AppError::from(error));
    }

    fn submit_requested(model: &mut Model) -> Vec<Effect> {
        if !model.state.is_editable() {
            return Self::ignore(&Event::SubmitRequested, model, "not in a submittable state");
        }
        if let Some(pending) = model.pending {
            debug!(pending = pending.name(), "submit ignored, acquisition pending");
            return vec![];
        }

        if let Err(e) = Self::transition(model, SubmissionState::Validating) {
            return Self::report_invalid_state(model, e.into());
        }
        model.active_error = None;

        if let Err(field) = model.draft.validate() {
            info!(field = field.as_str(), "draft rejected");
            model.active_error = Some(AppError::from(field));
            return Self::transition_or_report(model, SubmissionState::Idle);
        }

        if model.draft.has_photo() {
            Self::begin_submission(model)
        } else {
            model.awaiting_photo_confirmation = true;
            debug!("asking to continue without photo");
            vec![Effect::ConfirmWithoutPhoto, Effect::Render]
        }
    }

    fn begin_submission(model: &mut Model) -> Vec<Effect> {
        let payload = match model.draft.to_payload() {
            Ok(payload) => payload,
            Err(field) => {
                model.active_error = Some(AppError::from(field));
                return Self::transition_or_report(model, SubmissionState::Idle);
            }
        };

        if let Err(e) = Self::transition(model, SubmissionState::Submitting) {
            return Self::report_invalid_state(model, e.into());
        }
        model.pending = Some(PendingOperation::Submission);
        info!(
            draft_id = %payload.draft_id,
            category = payload.category.code(),
            has_photo = payload.photo.is_some(),
            "submitting complaint"
        );
        vec![Effect::Submit(Box::new(payload)), Effect::Render]
    }

    fn submission_succeeded(model: &mut Model, confirmation: Confirmation) -> Vec<Effect> {
        if let Err(e) = Self::transition(model, SubmissionState::Succeeded) {
            return Self::report_invalid_state(model, e.into());
        }
        info!(complaint_id = ?confirmation.complaint_id, "complaint registered");
        model.draft = ComplaintDraft::new();
        model.active_error = None;
        model.toast = Some(confirmation.message_or_default().to_string());
        model.last_confirmation = Some(confirmation);
        vec![
            Effect::Navigate(NavigationEvent::SubmissionSucceeded),
            Effect::Render,
        ]
    }

    fn submission_failed(model: &mut Model, error: SubmissionError) -> Vec<Effect> {
        warn!(error = %error, "complaint submission failed");
        let reason = error.reason();
        if let Err(e) = Self::transition(model, SubmissionState::Failed { reason }) {
            return Self::report_invalid_state(model, e.into());
        }
        model.active_error = Some(AppError::from(error));
        vec![Effect::Render]
    }

    fn transition(
        model: &mut Model,
        to: SubmissionState,
    ) -> Result<(), crate::model::TransitionError> {
        model.state.validate_transition(&to)?;
        info!(from = model.state.name(), to = to.name(), "submission state changed");
        model.state = to;
        Ok(())
    }

    fn transition_or_report(model: &mut Model, to: SubmissionState) -> Vec<Effect> {
        match Self::transition(model, to) {
            Ok(()) => vec![Effect::Render],
            Err(e) => Self::report_invalid_state(model, e.into()),
        }
    }

    fn report_invalid_state(model: &mut Model, error: AppError) -> Vec<Effect> {
        tracing::error!(error = %error, state = model.state.name(), "invalid state transition");
        model.active_error = Some(error);
        vec![Effect::Render]
    }

    fn ignore(event: &Event, model: &Model, reason: &'static str) -> Vec<Effect> {
        debug!(
            event = event.name(),
            state = model.state.name(),
            pending = model.pending.map(PendingOperation::name),
            reason,
            "event ignored"
        );
        vec![]
    }
}
