//! Runware image generation provider.

use crate::error::{parse_retry_after, sanitize_error_message, Error, Result};
use crate::image::provider::{ImageProvider, ProviderFactory};
use crate::image::types::{GeneratedImage, GenerationMetadata, GenerationRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Runware REST endpoint.
pub const API_URL: &str = "https://api.runware.ai/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "RUNWARE_API_KEY";

const SCHEDULER: &str = "FlowMatchEulerDiscreteScheduler";
const CFG_SCALE: f32 = 1.0;
const STRENGTH: f32 = 0.8;
const STEPS: u32 = 4;

/// Runware model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunwareModel {
    /// FLUX.1 [schnell], fast few-step model.
    #[default]
    FluxSchnell,
    /// FLUX.1 [dev].
    FluxDev,
}

impl RunwareModel {
    /// Returns the AIR identifier Runware expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FluxSchnell => "runware:100@1",
            Self::FluxDev => "runware:101@1",
        }
    }
}

/// Builder for RunwareProvider.
#[derive(Debug, Clone, Default)]
pub struct RunwareProviderBuilder {
    api_key: Option<String>,
    model: RunwareModel,
    base_url: Option<String>,
}

impl RunwareProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `RUNWARE_API_KEY` at runtime, then at build time.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model variant.
    pub fn model(mut self, model: RunwareModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<RunwareProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .or_else(|| option_env!("RUNWARE_API_KEY").map(str::to_string))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Auth(format!("{API_KEY_ENV} not set and no API key provided"))
            })?;

        Ok(RunwareProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url: self.base_url.unwrap_or_else(|| API_URL.to_string()),
        })
    }
}

/// Runware image generation provider.
pub struct RunwareProvider {
    client: reqwest::Client,
    api_key: String,
    model: RunwareModel,
    base_url: String,
}

impl RunwareProvider {
    /// Creates a new `RunwareProviderBuilder`.
    pub fn builder() -> RunwareProviderBuilder {
        RunwareProviderBuilder::new()
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> Error {
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return Error::RateLimited { retry_after };
        }
        if let Ok(body) = serde_json::from_str::<RunwareResponse>(text) {
            if let Some(api_error) = body.errors.into_iter().next() {
                return api_error.into_error(status);
            }
        }
        let text = sanitize_error_message(text);
        match status {
            401 | 403 => Error::Auth(text),
            _ => Error::Api {
                status,
                message: text,
            },
        }
    }

    fn extract_result(&self, response: RunwareResponse, task_uuid: Uuid) -> Result<GeneratedImage> {
        if let Some(api_error) = response.errors.into_iter().next() {
            return Err(api_error.into_error(200));
        }

        let result = response
            .data
            .into_iter()
            .find(|item| item.task_uuid == Some(task_uuid))
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("no result for task {task_uuid}"))
            })?;

        let image_url = result.image_url.ok_or_else(|| {
            Error::UnexpectedResponse("Runware result contained no imageURL".into())
        })?;

        Ok(GeneratedImage {
            image_url,
            image_uuid: result.image_uuid,
            task_uuid: Some(task_uuid),
            metadata: GenerationMetadata {
                model: None,
                seed: result.seed,
                duration_ms: None,
                cost: result.cost,
                nsfw_content: result.nsfw_content.unwrap_or(false),
            },
        })
    }
}

#[async_trait]
impl ImageProvider for RunwareProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();
        let task = ImageInferenceTask::from_generation_request(request, &self.model);
        let task_uuid = task.task_uuid;

        tracing::debug!(%task_uuid, width = task.width, height = task.height, "sending imageInference task");

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&[&task])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let body: RunwareResponse = response.json().await?;
        let mut image = self.extract_result(body, task_uuid)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        image.metadata.model = Some(task.model);
        image.metadata.duration_ms = Some(duration_ms);

        tracing::debug!(%task_uuid, duration_ms, "imageInference task finished");
        Ok(image)
    }

    fn name(&self) -> &str {
        "Runware"
    }
}

/// Connects a [`RunwareProvider`] per batch, using the submitted key when there is one.
#[derive(Debug, Clone, Default)]
pub struct RunwareFactory {
    model: RunwareModel,
    base_url: Option<String>,
}

impl RunwareFactory {
    /// Creates a factory for the default model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model variant used by every provider this factory builds.
    pub fn model(mut self, model: RunwareModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl ProviderFactory for RunwareFactory {
    fn connect(&self, api_key: Option<&str>) -> Result<Arc<dyn ImageProvider>> {
        let mut builder = RunwareProvider::builder().model(self.model);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        Ok(Arc::new(builder.build()?))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageInferenceTask {
    task_type: &'static str,
    #[serde(rename = "taskUUID")]
    task_uuid: Uuid,
    positive_prompt: String,
    width: u32,
    height: u32,
    model: String,
    number_results: u32,
    output_format: &'static str,
    output_type: &'static str,
    #[serde(rename = "CFGScale")]
    cfg_scale: f32,
    scheduler: &'static str,
    strength: f32,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl ImageInferenceTask {
    fn from_generation_request(req: &GenerationRequest, model: &RunwareModel) -> Self {
        Self {
            task_type: "imageInference",
            task_uuid: Uuid::new_v4(),
            positive_prompt: req.prompt.clone(),
            width: req.width,
            height: req.height,
            model: req
                .model
                .clone()
                .unwrap_or_else(|| model.as_str().to_string()),
            number_results: 1,
            output_format: req.format.runware_name(),
            output_type: "URL",
            cfg_scale: CFG_SCALE,
            scheduler: SCHEDULER,
            strength: STRENGTH,
            steps: STEPS,
            seed: req.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunwareResponse {
    #[serde(default)]
    data: Vec<ImageInferenceResult>,
    #[serde(default)]
    errors: Vec<RunwareApiError>,
}

#[derive(Debug, Deserialize)]
struct ImageInferenceResult {
    #[serde(rename = "taskUUID", default)]
    task_uuid: Option<Uuid>,
    #[serde(rename = "imageUUID", default)]
    image_uuid: Option<Uuid>,
    #[serde(rename = "imageURL", default)]
    image_url: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(rename = "NSFWContent", default)]
    nsfw_content: Option<bool>,
    #[serde(default)]
    cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RunwareApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl RunwareApiError {
    fn into_error(self, status: u16) -> Error {
        let message = sanitize_error_message(&self.message);
        let code = self.code.to_lowercase();
        if code.contains("apikey") || code.contains("unauthorized") {
            Error::Auth(message)
        } else if code.contains("credits") {
            Error::Billing(message)
        } else if code.contains("ratelimit") {
            Error::RateLimited { retry_after: None }
        } else if code.contains("nsfw") || code.contains("safety") {
            Error::ContentBlocked(message)
        } else if code.starts_with("invalid") || code.starts_with("missing") {
            Error::InvalidRequest(message)
        } else {
            Error::Api { status, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::AspectRatio;

    fn provider() -> RunwareProvider {
        RunwareProviderBuilder::new().api_key("rw-test").build().unwrap()
    }

    #[test]
    fn test_model_as_str() {
        assert_eq!(RunwareModel::FluxSchnell.as_str(), "runware:100@1");
        assert_eq!(RunwareModel::FluxDev.as_str(), "runware:101@1");
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = RunwareProviderBuilder::new().api_key("rw-test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_builder_rejects_blank_key() {
        let provider = RunwareProviderBuilder::new().api_key("   ").build();
        assert!(matches!(provider, Err(Error::Auth(_))));
    }

    #[test]
    fn test_factory_binds_submitted_key() {
        let factory = RunwareFactory::new().model(RunwareModel::FluxDev);
        let provider = factory.connect(Some("rw-user-key")).unwrap();
        assert_eq!(provider.name(), "Runware");
    }

    #[test]
    fn test_task_construction() {
        let req = GenerationRequest::new("A fox").with_aspect_ratio(AspectRatio::Landscape);
        let task = ImageInferenceTask::from_generation_request(&req, &RunwareModel::FluxSchnell);

        assert_eq!(task.positive_prompt, "A fox");
        assert_eq!((task.width, task.height), (1024, 576));
        assert_eq!(task.model, "runware:100@1");
        assert_eq!(task.number_results, 1);
        assert_eq!(task.output_format, "WEBP");
    }

    #[test]
    fn test_task_uses_request_model_override() {
        let req = GenerationRequest::new("A fox").with_model("civitai:4384@128713");
        let task = ImageInferenceTask::from_generation_request(&req, &RunwareModel::FluxSchnell);
        assert_eq!(task.model, "civitai:4384@128713");
    }

    #[test]
    fn test_task_serialization() {
        let req = GenerationRequest::new("A fox");
        let task = ImageInferenceTask::from_generation_request(&req, &RunwareModel::FluxSchnell);
        let json = serde_json::to_value([&task]).unwrap();
        let task_json = &json[0];

        assert_eq!(task_json["taskType"], "imageInference");
        assert_eq!(task_json["positivePrompt"], "A fox");
        assert_eq!(task_json["numberResults"], 1);
        assert_eq!(task_json["outputFormat"], "WEBP");
        assert_eq!(task_json["CFGScale"], 1.0);
        assert_eq!(task_json["scheduler"], "FlowMatchEulerDiscreteScheduler");
        assert!(task_json["taskUUID"].is_string());
        assert!(task_json.get("seed").is_none());
    }

    #[test]
    fn test_extract_result_matches_task_uuid() {
        let task_uuid = Uuid::new_v4();
        let other = Uuid::new_v4();
        let json = format!(
            r#"{{"data": [
                {{"taskType": "imageInference", "taskUUID": "{other}", "imageURL": "https://im.runware.ai/other.webp"}},
                {{"taskType": "imageInference", "taskUUID": "{task_uuid}", "imageURL": "https://im.runware.ai/mine.webp", "seed": 42, "NSFWContent": false, "cost": 0.0013}}
            ]}}"#
        );
        let response: RunwareResponse = serde_json::from_str(&json).unwrap();
        let image = provider().extract_result(response, task_uuid).unwrap();

        assert_eq!(image.image_url, "https://im.runware.ai/mine.webp");
        assert_eq!(image.task_uuid, Some(task_uuid));
        assert_eq!(image.metadata.seed, Some(42));
        assert_eq!(image.metadata.cost, Some(0.0013));
    }

    #[test]
    fn test_extract_result_missing_task() {
        let response: RunwareResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        let result = provider().extract_result(response, Uuid::new_v4());
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_extract_result_reports_api_errors() {
        let json = r#"{"errors": [{"code": "invalidApiKey", "message": "Invalid API key"}]}"#;
        let response: RunwareResponse = serde_json::from_str(json).unwrap();
        let result = provider().extract_result(response, Uuid::new_v4());
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_parse_error_statuses() {
        let p = provider();
        let headers = reqwest::header::HeaderMap::new();

        assert!(matches!(
            p.parse_error(429, "", &headers),
            Error::RateLimited { .. }
        ));
        assert!(matches!(
            p.parse_error(401, "unauthorized", &headers),
            Error::Auth(_)
        ));
        assert!(matches!(
            p.parse_error(
                400,
                r#"{"errors": [{"code": "insufficientCredits", "message": "Top up"}]}"#,
                &headers
            ),
            Error::Billing(_)
        ));
        assert!(matches!(
            p.parse_error(500, "boom", &headers),
            Error::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_api_error_code_mapping() {
        let err = |code: &str| RunwareApiError {
            code: code.into(),
            message: "m".into(),
        };
        assert!(matches!(err("invalidPositivePrompt").into_error(400), Error::InvalidRequest(_)));
        assert!(matches!(err("missingApiKey").into_error(400), Error::Auth(_)));
        assert!(matches!(err("rateLimitExceeded").into_error(400), Error::RateLimited { .. }));
        assert!(matches!(err("somethingElse").into_error(400), Error::Api { status: 400, .. }));
    }
}
