#![warn(missing_docs)]
//! RunViz - prompt-to-image batches on Runware.
//!
//! This crate holds the state and behavior of a small image-generation widget:
//! a prompt form, a batch of three concurrent generation requests, the grid of
//! placeholder or result tiles, and downloading each result to disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use runviz::{AspectRatio, ImageGenerator};
//!
//! #[tokio::main]
//! async fn main() -> runviz::Result<()> {
//!     let generator = ImageGenerator::builder().build();
//!     generator.set_api_key("your-runware-key").await;
//!     generator.set_prompt("A lighthouse in a storm").await;
//!     generator.select_aspect_ratio(Some(AspectRatio::Landscape)).await;
//!
//!     let images = generator.generate().await?;
//!     for index in 0..images.len() {
//!         generator.download(index, ".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Providers
//!
//! Generation goes through the [`ImageProvider`] trait. [`RunwareProvider`] is
//! the built-in implementation; any other provider can be plugged in with a
//! [`ProviderFactory`].

mod error;
pub mod image;
pub mod studio;

// Re-export error types at crate root
pub use error::{
    Error, ErrorKind, Result, ValidationError, DOWNLOAD_FAILED_MESSAGE,
    GENERATION_FAILED_MESSAGE,
};

pub use image::providers::{RunwareFactory, RunwareModel, RunwareProvider, RunwareProviderBuilder};
pub use image::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    ImageProvider, ProviderFactory,
};
pub use studio::{
    ImageGenerator, ImageGeneratorBuilder, KeySource, Notification, NotificationLevel, Notifier,
    Tile, UiState, View, BATCH_SIZE,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::providers::RunwareProvider;
    pub use crate::image::{AspectRatio, GeneratedImage, GenerationRequest, ImageProvider};
    pub use crate::studio::{ImageGenerator, KeySource, Notifier, View};
}
