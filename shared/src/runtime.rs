//! Reference async shell.
//!
//! Drives [`ComplaintApp`] by executing each effect against injected
//! collaborators and feeding the outcome back as the next event. Every device
//! or network call is a suspension point; nothing runs in parallel.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

use crate::app::{ComplaintApp, Effect, Model, NavigationEvent, ViewModel};
use crate::capabilities::MediaAdapter;
use crate::event::Event;
use crate::gateway::SubmissionGateway;

/// Answers the "continue without photo?" prompt.
#[async_trait]
pub trait PhotoConfirmer: Send + Sync {
    async fn confirm_without_photo(&self) -> bool;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, event: NavigationEvent);
}

pub struct Runtime {
    app: ComplaintApp,
    model: Model,
    media: Arc<dyn MediaAdapter>,
    gateway: Arc<dyn SubmissionGateway>,
    confirmer: Arc<dyn PhotoConfirmer>,
    navigator: Arc<dyn Navigator>,
    views: watch::Sender<ViewModel>,
}

impl Runtime {
    pub fn new(
        model: Model,
        media: Arc<dyn MediaAdapter>,
        gateway: Arc<dyn SubmissionGateway>,
        confirmer: Arc<dyn PhotoConfirmer>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let app = ComplaintApp;
        let (views, _) = watch::channel(app.view(&model));
        Self {
            app,
            model,
            media,
            gateway,
            confirmer,
            navigator,
            views,
        }
    }

    /// Receives every rendered view, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.views.subscribe()
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    /// Processes `event` and every follow-up event its effects produce.
    /// Returns once the core has nothing left to ask of the shell.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let effects = self.app.update(event, &mut self.model);

            // Render first so the shell shows "acquiring"/"submitting" before
            // the call suspends.
            let (immediate, deferred): (Vec<Effect>, Vec<Effect>) = effects
                .into_iter()
                .partition(|e| matches!(e, Effect::Render | Effect::Navigate(_)));

            for effect in immediate {
                self.run_immediate(effect);
            }
            for effect in deferred {
                if let Some(next) = self.run_deferred(effect).await {
                    queue.push_back(next);
                }
            }
        }
    }

    fn run_immediate(&self, effect: Effect) {
        match effect {
            Effect::Render => {
                self.views.send_replace(self.app.view(&self.model));
            }
            Effect::Navigate(target) => {
                tracing::info!(destination = ?target, "navigating");
                self.navigator.navigate(target);
            }
            other => tracing::error!(effect = other.name(), "not an immediate effect"),
        }
    }

    async fn run_deferred(&self, effect: Effect) -> Option<Event> {
        tracing::debug!(effect = effect.name(), "executing effect");
        match effect {
            Effect::CapturePhoto(config) => {
                let result = self.media.capture_photo(config).await;
                Some(Event::PhotoResolved(Box::new(result)))
            }
            Effect::SelectPhoto(config) => {
                let result = self.media.select_photo_from_library(config).await;
                Some(Event::PhotoResolved(Box::new(result)))
            }
            Effect::AcquireLocation(accuracy) => {
                let result = self.media.acquire_current_location(accuracy).await;
                Some(Event::LocationResolved(Box::new(result)))
            }
            Effect::ConfirmWithoutPhoto => {
                let confirmed = self.confirmer.confirm_without_photo().await;
                Some(Event::ContinueWithoutPhoto { confirmed })
            }
            Effect::Submit(payload) => {
                let result = self.gateway.submit(&payload).await;
                Some(Event::SubmissionResolved(Box::new(result)))
            }
            Effect::Render | Effect::Navigate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        CaptureConfig, LocationAccuracy, LocationOutcome, LocationResult, PhotoOutcome,
        PhotoResult,
    };
    use crate::catalog::Category;
    use crate::gateway::{Confirmation, SubmissionResult};
    use crate::model::{LocationFix, SubmissionPayload, SubmissionState, ValidatedCoordinate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubMedia;

    #[async_trait]
    impl MediaAdapter for StubMedia {
        async fn capture_photo(&self, _config: CaptureConfig) -> PhotoResult {
            Ok(PhotoOutcome::Cancelled)
        }

        async fn select_photo_from_library(&self, _config: CaptureConfig) -> PhotoResult {
            Ok(PhotoOutcome::Cancelled)
        }

        async fn acquire_current_location(&self, _accuracy: LocationAccuracy) -> LocationResult {
            Ok(LocationOutcome::Located(LocationFix::new(
                ValidatedCoordinate::new(12.34, 56.78).unwrap(),
                "",
            )))
        }
    }

    #[derive(Default)]
    struct CountingGateway(AtomicUsize);

    #[async_trait]
    impl SubmissionGateway for CountingGateway {
        async fn submit(&self, _payload: &SubmissionPayload) -> SubmissionResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Confirmation::default())
        }
    }

    struct Always(bool);

    #[async_trait]
    impl PhotoConfirmer for Always {
        async fn confirm_without_photo(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<NavigationEvent>>);

    impl Navigator for Recorder {
        fn navigate(&self, event: NavigationEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn runtime(confirm: bool) -> (Runtime, Arc<CountingGateway>, Arc<Recorder>) {
        let gateway = Arc::new(CountingGateway::default());
        let navigator = Arc::new(Recorder::default());
        let runtime = Runtime::new(
            Model::default(),
            Arc::new(StubMedia),
            gateway.clone(),
            Arc::new(Always(confirm)),
            navigator.clone(),
        );
        (runtime, gateway, navigator)
    }

    async fn fill(runtime: &mut Runtime) {
        runtime
            .dispatch(Event::CategorySelected(Some(Category::Drainage)))
            .await;
        runtime
            .dispatch(Event::DescriptionChanged {
                text: "Blocked drain".into(),
            })
            .await;
        runtime.dispatch(Event::LocationRequested).await;
    }

    #[tokio::test]
    async fn test_location_round_trip_publishes_view() {
        let (mut runtime, _, _) = runtime(true);
        let views = runtime.subscribe();

        runtime.dispatch(Event::LocationRequested).await;

        assert!(runtime.model().draft().location().is_some());
        assert_eq!(runtime.model().pending(), None);
        let view = views.borrow().clone();
        assert!(view.location.is_some());
        assert_eq!(view, runtime.view());
    }

    #[tokio::test]
    async fn test_confirmed_submission_navigates() {
        let (mut runtime, gateway, navigator) = runtime(true);
        fill(&mut runtime).await;

        runtime.dispatch(Event::SubmitRequested).await;

        assert_eq!(runtime.model().state(), &SubmissionState::Succeeded);
        assert_eq!(gateway.0.load(Ordering::SeqCst), 1);
        assert_eq!(
            *navigator.0.lock().unwrap(),
            vec![NavigationEvent::SubmissionSucceeded]
        );
    }

    #[tokio::test]
    async fn test_declined_submission_never_reaches_gateway() {
        let (mut runtime, gateway, navigator) = runtime(false);
        fill(&mut runtime).await;

        runtime.dispatch(Event::SubmitRequested).await;

        assert_eq!(runtime.model().state(), &SubmissionState::Idle);
        assert_eq!(gateway.0.load(Ordering::SeqCst), 0);
        assert!(navigator.0.lock().unwrap().is_empty());
        assert!(runtime.model().draft().validate().is_ok());
    }
}
