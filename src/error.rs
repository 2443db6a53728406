//! Error types for prompt-to-image generation.

use std::time::Duration;

/// Message shown when any part of a generation batch fails.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate images. Please check your API key and try again.";

/// Message shown when saving an image fails.
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Failed to download image. Please try again.";

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Local, pre-flight form problems. Nothing is dispatched when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Prompt is empty or whitespace-only.
    #[error("Please enter a prompt")]
    MissingPrompt,

    /// The API key field is shown and is empty or whitespace-only.
    #[error("Please enter your Runware API key")]
    MissingApiKey,

    /// A batch is already in flight.
    #[error("Image generation already in progress")]
    GenerationInProgress,
}

/// Broad error category, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local form validation failed.
    Validation,
    /// The provider call or the batch join failed.
    Generation,
    /// Fetching or saving an image failed.
    Download,
}

/// Errors that can occur while generating or downloading images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Form validation failed before dispatch.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Account has no remaining credits.
    #[error("billing error: {0}")]
    Billing(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered with something we could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Downloading the image at `position` (0-based) failed.
    #[error("download of image {} failed: {source}", .position + 1)]
    Download {
        position: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an error raised while downloading the image at `position`.
    pub fn download(position: usize, source: Error) -> Self {
        Self::Download {
            position,
            source: Box::new(source),
        }
    }

    /// Returns the category this error is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Download { .. } => ErrorKind::Download,
            _ => ErrorKind::Generation,
        }
    }

    /// Returns the text shown to the user for this error.
    ///
    /// Every provider and transport failure maps to the same generic message.
    pub fn notification_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Download { .. } => DOWNLOAD_FAILED_MESSAGE.to_string(),
            _ => GENERATION_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Trims an API error body and caps its length so it is safe to log.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    format!("{truncated}...")
}
