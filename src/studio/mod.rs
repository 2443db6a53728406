//! The prompt-to-images widget, independent of any UI toolkit.
//!
//! A front end forwards edits to [`ImageGenerator`], calls
//! [`ImageGenerator::generate`] on submit, and draws the [`View`] it derives.

pub mod download;
mod form;
mod generator;
mod notify;
mod render;

pub use download::{download_file_name, save_image, HttpFetcher, ImageFetcher};
pub use form::{FormState, KeySource, Submission, UiState};
pub use generator::{ImageGenerator, ImageGeneratorBuilder, BATCH_SIZE};
pub use notify::{
    Notification, NotificationLevel, Notifier, TracingNotifier, GENERATED_MESSAGE,
};
pub use render::{render, SubmitButton, Tile, View, SUBTITLE, TITLE};
