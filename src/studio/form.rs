//! Form state and pre-flight validation.

use crate::error::ValidationError;
use crate::image::{AspectRatio, GeneratedImage, GenerationRequest};
use serde::{Deserialize, Serialize};

/// Where the API key for a batch comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// Typed by the user into a password field; required before submit.
    #[default]
    Input,
    /// Resolved from configuration; no field is shown.
    Configured,
}

/// User-editable form fields.
#[derive(Clone, Default, PartialEq)]
pub struct FormState {
    /// Prompt text, as typed.
    pub prompt: String,
    /// API key text, as typed.
    pub api_key: String,
    /// Selected preset; 1:1 is used when unset.
    pub aspect_ratio: Option<AspectRatio>,
    /// Where the API key comes from.
    pub key_source: KeySource,
}

impl std::fmt::Debug for FormState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormState")
            .field("prompt", &self.prompt)
            .field("api_key", &redact(&self.api_key))
            .field("aspect_ratio", &self.aspect_ratio)
            .field("key_source", &self.key_source)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl FormState {
    /// Creates an empty form.
    pub fn new(key_source: KeySource) -> Self {
        Self {
            key_source,
            ..Self::default()
        }
    }

    /// Returns whether the submit control is enabled.
    pub fn can_submit(&self, is_generating: bool) -> bool {
        !is_generating && self.validate().is_ok()
    }

    /// Checks required fields and returns a trimmed submission.
    pub fn validate(&self) -> Result<Submission, ValidationError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::MissingPrompt);
        }

        let api_key = match self.key_source {
            KeySource::Input => {
                let key = self.api_key.trim();
                if key.is_empty() {
                    return Err(ValidationError::MissingApiKey);
                }
                Some(key.to_string())
            }
            KeySource::Configured => None,
        };

        Ok(Submission {
            prompt: prompt.to_string(),
            api_key,
            aspect_ratio: self.aspect_ratio.unwrap_or_default(),
        })
    }
}

/// A validated form, ready to dispatch.
#[derive(Clone, PartialEq, Eq)]
pub struct Submission {
    /// Trimmed prompt.
    pub prompt: String,
    /// Trimmed key when it came from user input.
    pub api_key: Option<String>,
    /// Preset used for the batch.
    pub aspect_ratio: AspectRatio,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission")
            .field("prompt", &self.prompt)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .field("aspect_ratio", &self.aspect_ratio)
            .finish()
    }
}

impl Submission {
    /// Builds the payload shared by every request in the batch.
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::new(self.prompt.clone()).with_aspect_ratio(self.aspect_ratio)
    }
}

/// Everything the renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    /// Form fields.
    pub form: FormState,
    /// True only while a batch is in flight.
    pub is_generating: bool,
    /// Results of the last successful batch; empty or exactly one batch.
    pub images: Vec<GeneratedImage>,
    /// Whether the API key field is shown.
    pub show_api_key_input: bool,
}

impl UiState {
    /// Creates the initial state.
    pub fn new(key_source: KeySource) -> Self {
        Self {
            form: FormState::new(key_source),
            is_generating: false,
            images: Vec::new(),
            show_api_key_input: key_source == KeySource::Input,
        }
    }

    /// Returns whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.form.can_submit(self.is_generating)
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(KeySource::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(prompt: &str, key: &str) -> FormState {
        FormState {
            prompt: prompt.into(),
            api_key: key.into(),
            ..FormState::new(KeySource::Input)
        }
    }

    #[test]
    fn test_whitespace_prompt_is_missing() {
        assert_eq!(
            filled("   \t", "rw-key").validate(),
            Err(ValidationError::MissingPrompt)
        );
        assert_eq!(filled("", "rw-key").validate(), Err(ValidationError::MissingPrompt));
    }

    #[test]
    fn test_prompt_checked_before_key() {
        assert_eq!(filled("", "").validate(), Err(ValidationError::MissingPrompt));
    }

    #[test]
    fn test_blank_key_is_missing() {
        assert_eq!(
            filled("A harbor at night", "  ").validate(),
            Err(ValidationError::MissingApiKey)
        );
    }

    #[test]
    fn test_configured_key_skips_key_check() {
        let form = FormState {
            prompt: "A harbor at night".into(),
            ..FormState::new(KeySource::Configured)
        };
        let submission = form.validate().unwrap();
        assert_eq!(submission.api_key, None);
    }

    #[test]
    fn test_submission_is_trimmed() {
        let submission = filled("  A harbor at night ", " rw-key ").validate().unwrap();
        assert_eq!(submission.prompt, "A harbor at night");
        assert_eq!(submission.api_key.as_deref(), Some("rw-key"));
        assert_eq!(submission.aspect_ratio, AspectRatio::Square);
    }

    #[test]
    fn test_submission_request_uses_preset() {
        let mut form = filled("A harbor at night", "rw-key");
        form.aspect_ratio = Some(AspectRatio::Portrait);
        let request = form.validate().unwrap().request();
        assert_eq!((request.width, request.height), (576, 1024));
    }

    #[test]
    fn test_can_submit() {
        let form = filled("A harbor at night", "rw-key");
        assert!(form.can_submit(false));
        assert!(!form.can_submit(true));
        assert!(!filled(" ", "rw-key").can_submit(false));
        assert!(!filled("A harbor", "").can_submit(false));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let form = filled("A harbor at night", "rw-secret-key");
        let state = UiState {
            form: form.clone(),
            ..UiState::new(KeySource::Input)
        };
        let submission = form.validate().unwrap();

        for text in [
            format!("{form:?}"),
            format!("{state:?}"),
            format!("{submission:?}"),
        ] {
            assert!(!text.contains("rw-secret-key"), "{text}");
            assert!(text.contains("<redacted>"), "{text}");
        }
        assert!(format!("{form:?}").contains("A harbor at night"));
    }

    #[test]
    fn test_initial_state() {
        let state = UiState::new(KeySource::Input);
        assert!(state.show_api_key_input);
        assert!(state.images.is_empty());
        assert!(!state.is_generating);

        assert!(!UiState::new(KeySource::Configured).show_api_key_input);
    }
}
