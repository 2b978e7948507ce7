use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{LocationResult, PhotoResult};
use crate::catalog::Category;
use crate::gateway::SubmissionResult;

// --- Event enum: no None variant, large variants boxed ---

#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub enum Event {
    // Session
    DraftOpened,
    DraftClosed,

    // Photo
    CapturePhotoRequested,
    SelectPhotoRequested,
    PhotoResolved(Box<PhotoResult>),
    ClearPhoto,

    // Location
    LocationRequested,
    LocationResolved(Box<LocationResult>),

    // Form input
    CategorySelected(Option<Category>),
    DescriptionChanged { text: String },

    // Submission
    SubmitRequested,
    ContinueWithoutPhoto { confirmed: bool },
    SubmissionResolved(Box<SubmissionResult>),

    // UI
    DismissError,
    DismissToast,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DraftOpened => "draft_opened",
            Self::DraftClosed => "draft_closed",
            Self::CapturePhotoRequested => "capture_photo_requested",
            Self::SelectPhotoRequested => "select_photo_requested",
            Self::PhotoResolved(_) => "photo_resolved",
            Self::ClearPhoto => "clear_photo",
            Self::LocationRequested => "location_requested",
            Self::LocationResolved(_) => "location_resolved",
            Self::CategorySelected(_) => "category_selected",
            Self::DescriptionChanged { .. } => "description_changed",
            Self::SubmitRequested => "submit_requested",
            Self::ContinueWithoutPhoto { .. } => "continue_without_photo",
            Self::SubmissionResolved(_) => "submission_resolved",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
        }
    }

    /// Resolutions come back from the shell; everything else is a tap or
    /// keystroke.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::PhotoResolved(_) | Self::LocationResolved(_) | Self::SubmissionResolved(_)
        )
    }

    /// Events that change draft fields.
    #[must_use]
    pub const fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::CapturePhotoRequested
                | Self::SelectPhotoRequested
                | Self::ClearPhoto
                | Self::LocationRequested
                | Self::CategorySelected(_)
                | Self::DescriptionChanged { .. }
        )
    }
}

// Description text is user content and stays out of logs.
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DescriptionChanged { text } => f
                .debug_struct("DescriptionChanged")
                .field("chars", &text.chars().count())
                .finish(),
            Self::CategorySelected(category) => {
                f.debug_tuple("CategorySelected").field(category).finish()
            }
            Self::ContinueWithoutPhoto { confirmed } => f
                .debug_struct("ContinueWithoutPhoto")
                .field("confirmed", confirmed)
                .finish(),
            Self::PhotoResolved(result) => f.debug_tuple("PhotoResolved").field(result).finish(),
            Self::LocationResolved(result) => {
                f.debug_tuple("LocationResolved").field(result).finish()
            }
            Self::SubmissionResolved(result) => {
                f.debug_tuple("SubmissionResolved").field(result).finish()
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{MediaError, PhotoOutcome};
    use crate::model::PhotoRef;

    #[test]
    fn test_resolutions_are_not_user_initiated() {
        let resolved = Event::PhotoResolved(Box::new(Ok(PhotoOutcome::Cancelled)));
        assert!(!resolved.is_user_initiated());
        assert!(Event::SubmitRequested.is_user_initiated());
        assert!(Event::ContinueWithoutPhoto { confirmed: false }.is_user_initiated());
    }

    #[test]
    fn test_edit_events() {
        assert!(Event::DescriptionChanged { text: "x".into() }.is_edit());
        assert!(Event::CategorySelected(None).is_edit());
        assert!(!Event::SubmitRequested.is_edit());
        assert!(!Event::DismissError.is_edit());
    }

    #[test]
    fn test_debug_hides_description_text() {
        let event = Event::DescriptionChanged {
            text: "flat 4B, next to my landlord".into(),
        };
        let debug = format!("{event:?}");
        assert!(!debug.contains("landlord"));
        assert!(debug.contains("chars"));
    }

    #[test]
    fn test_debug_hides_photo_uri() {
        let event = Event::PhotoResolved(Box::new(Ok(PhotoOutcome::Captured(PhotoRef::new(
            "file:///Users/alice/photo.jpg",
        )))));
        assert!(!format!("{event:?}").contains("alice"));

        let event = Event::PhotoResolved(Box::new(Err(MediaError::NotFound)));
        assert!(format!("{event:?}").contains("NotFound"));
    }

    #[test]
    fn test_names_are_snake_case() {
        assert_eq!(Event::SubmitRequested.name(), "submit_requested");
        assert_eq!(Event::DraftClosed.name(), "draft_closed");
        assert_eq!(format!("{:?}", Event::DismissToast), "dismiss_toast");
    }

    #[test]
    fn test_shell_cannot_smuggle_invalid_coordinates() {
        let json = r#"{"LocationResolved":{"Ok":{"Located":{
            "coordinate":{"lat":500.0,"lon":-999.0},"address":"","accuracy_m":null}}}}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());

        let json = r#"{"LocationResolved":{"Ok":{"Located":{
            "coordinate":{"lat":12.34,"lon":56.78},"address":"Gate 2","accuracy_m":5.0}}}}"#;
        assert!(matches!(
            serde_json::from_str::<Event>(json),
            Ok(Event::LocationResolved(_))
        ));
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(size <= 32, "Event enum is {size} bytes, box more variants");
    }
}
