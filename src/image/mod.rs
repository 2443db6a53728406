//! Image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::{ImageProvider, ProviderFactory};
pub use types::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    DEFAULT_DIMENSION,
};
