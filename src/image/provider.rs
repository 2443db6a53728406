//! Image provider trait and provider construction.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates one image from the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}

/// Builds a provider bound to an API key.
///
/// `api_key` is `None` when the key comes from configuration rather than user input.
pub trait ProviderFactory: Send + Sync {
    /// Creates a provider for one generation batch.
    fn connect(&self, api_key: Option<&str>) -> Result<Arc<dyn ImageProvider>>;
}

impl<F> ProviderFactory for F
where
    F: Fn(Option<&str>) -> Result<Arc<dyn ImageProvider>> + Send + Sync,
{
    fn connect(&self, api_key: Option<&str>) -> Result<Arc<dyn ImageProvider>> {
        self(api_key)
    }
}
