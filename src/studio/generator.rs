//! The image generator: form edits, batch dispatch, downloads.

use crate::error::{Error, Result, ValidationError};
use crate::image::providers::RunwareFactory;
use crate::image::{AspectRatio, GeneratedImage, ProviderFactory};
use crate::studio::download::{save_image, HttpFetcher, ImageFetcher};
use crate::studio::form::{KeySource, Submission, UiState};
use crate::studio::notify::{Notification, Notifier, TracingNotifier, GENERATED_MESSAGE};
use crate::studio::render::{render, View};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Number of images requested per submission.
pub const BATCH_SIZE: usize = 3;

/// Builder for [`ImageGenerator`].
pub struct ImageGeneratorBuilder {
    key_source: KeySource,
    factory: Option<Arc<dyn ProviderFactory>>,
    notifier: Option<Arc<dyn Notifier>>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
}

impl ImageGeneratorBuilder {
    /// Creates a builder for the key-input variant with default collaborators.
    pub fn new() -> Self {
        Self {
            key_source: KeySource::Input,
            factory: None,
            notifier: None,
            fetcher: None,
        }
    }

    /// Sets where the API key comes from.
    pub fn key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    /// Sets how providers are built. Defaults to [`RunwareFactory`].
    pub fn factory(mut self, factory: impl ProviderFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Sets where notifications go. Defaults to [`TracingNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets how images are downloaded. Defaults to [`HttpFetcher`].
    pub fn fetcher(mut self, fetcher: impl ImageFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Builds the generator.
    pub fn build(self) -> ImageGenerator {
        ImageGenerator {
            state: Arc::new(RwLock::new(UiState::new(self.key_source))),
            factory: self
                .factory
                .unwrap_or_else(|| Arc::new(RunwareFactory::new())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            fetcher: self.fetcher.unwrap_or_else(|| Arc::new(HttpFetcher::new())),
        }
    }
}

impl Default for ImageGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the UI state and runs generation batches against a provider.
///
/// Cloning is cheap and every clone shares the same state, so one clone can
/// observe [`view`](Self::view) while another awaits [`generate`](Self::generate).
#[derive(Clone)]
pub struct ImageGenerator {
    state: Arc<RwLock<UiState>>,
    factory: Arc<dyn ProviderFactory>,
    notifier: Arc<dyn Notifier>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ImageGenerator {
    /// Creates a new `ImageGeneratorBuilder`.
    pub fn builder() -> ImageGeneratorBuilder {
        ImageGeneratorBuilder::new()
    }

    /// Replaces the prompt text.
    pub async fn set_prompt(&self, prompt: impl Into<String>) {
        self.state.write().await.form.prompt = prompt.into();
    }

    /// Replaces the API key text.
    pub async fn set_api_key(&self, api_key: impl Into<String>) {
        self.state.write().await.form.api_key = api_key.into();
    }

    /// Selects a preset, or clears the selection.
    pub async fn select_aspect_ratio(&self, ratio: Option<AspectRatio>) {
        self.state.write().await.form.aspect_ratio = ratio;
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> UiState {
        self.state.read().await.clone()
    }

    /// Derives the view for the current state.
    pub async fn view(&self) -> View {
        render(&*self.state.read().await)
    }

    /// Validates the form and runs one batch of [`BATCH_SIZE`] concurrent requests.
    ///
    /// On success the displayed images are replaced with the batch, in request
    /// order. On any failure they are left as they were and a single error
    /// notification is emitted. Returns `GenerationInProgress` without notifying
    /// when a batch is already running.
    pub async fn generate(&self) -> Result<Vec<GeneratedImage>> {
        let submission = match self.begin().await {
            Ok(submission) => submission,
            Err(ValidationError::GenerationInProgress) => {
                return Err(ValidationError::GenerationInProgress.into());
            }
            Err(e) => {
                let err = Error::from(e);
                self.notifier
                    .notify(Notification::error(err.notification_message()));
                return Err(err);
            }
        };
        let busy = BusyGuard::new(self.state.clone());

        let start = Instant::now();
        tracing::info!(
            aspect_ratio = %submission.aspect_ratio,
            batch_size = BATCH_SIZE,
            "dispatching generation batch"
        );
        let outcome = self.run_batch(&submission).await;

        let mut state = self.state.write().await;
        state.is_generating = false;
        busy.disarm();
        match outcome {
            Ok(images) => {
                state.images = images.clone();
                if state.form.key_source == KeySource::Input {
                    state.show_api_key_input = false;
                }
                drop(state);
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation batch finished"
                );
                self.notifier.notify(Notification::success(GENERATED_MESSAGE));
                Ok(images)
            }
            Err(e) => {
                drop(state);
                tracing::error!(error = %e, "generation batch failed");
                self.notifier
                    .notify(Notification::error(e.notification_message()));
                Err(e)
            }
        }
    }

    /// Saves the image at `index` into `dir` as `generated-image-<index+1>.webp`.
    pub async fn download(&self, index: usize, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let url = self
            .state
            .read()
            .await
            .images
            .get(index)
            .map(|image| image.image_url.clone());

        let result = match url {
            Some(url) => save_image(self.fetcher.as_ref(), &url, index, dir.as_ref()).await,
            None => Err(Error::download(
                index,
                Error::InvalidRequest(format!("no image at position {}", index + 1)),
            )),
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, index, "download failed");
            self.notifier
                .notify(Notification::error(e.notification_message()));
        }
        result
    }

    async fn begin(&self) -> std::result::Result<Submission, ValidationError> {
        let mut state = self.state.write().await;
        if state.is_generating {
            return Err(ValidationError::GenerationInProgress);
        }
        let submission = state.form.validate()?;
        state.is_generating = true;
        Ok(submission)
    }

    async fn run_batch(&self, submission: &Submission) -> Result<Vec<GeneratedImage>> {
        let provider = self.factory.connect(submission.api_key.as_deref())?;
        let request = submission.request();
        try_join_all((0..BATCH_SIZE).map(|_| provider.generate(&request))).await
    }
}

/// Clears the busy flag if a batch future is dropped before it finishes.
struct BusyGuard {
    state: Option<Arc<RwLock<UiState>>>,
}

impl BusyGuard {
    fn new(state: Arc<RwLock<UiState>>) -> Self {
        Self { state: Some(state) }
    }

    fn disarm(mut self) {
        self.state = None;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        tracing::warn!("generation batch dropped before completion");
        if let Ok(mut guard) = state.try_write() {
            guard.is_generating = false;
            return;
        }
        // A reader holds the lock; reset once it is released.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    state.write().await.is_generating = false;
                });
            }
            Err(_) => tracing::error!("no runtime to reset busy flag after dropped batch"),
        }
    }
}
