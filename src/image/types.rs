//! Core types for image generation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Width and height used when no aspect ratio is chosen.
pub const DEFAULT_DIMENSION: u32 = 1024;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// WebP format (modern, efficient).
    #[default]
    WebP,
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Returns the value Runware expects in `outputFormat`.
    pub fn runware_name(&self) -> &'static str {
        match self {
            Self::WebP => "WEBP",
            Self::Png => "PNG",
            Self::Jpeg => "JPG",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Preset aspect ratios, each with fixed pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1, 1024x1024.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9, 1024x576.
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16, 576x1024.
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3, 1024x768.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4, 768x1024.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Every preset, in display order.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::Standard,
        Self::StandardPortrait,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }

    /// Returns `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Landscape => (1024, 576),
            Self::Portrait => (576, 1024),
            Self::Standard => (1024, 768),
            Self::StandardPortrait => (768, 1024),
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| format!("unknown aspect ratio '{s}' (expected 1:1, 16:9, 9:16, 4:3 or 3:4)"))
    }
}

/// A request to generate one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Provider model identifier; the provider default is used when unset.
    pub model: Option<String>,
    /// Seed for deterministic generation.
    pub seed: Option<u64>,
    /// Desired output format.
    pub format: ImageFormat,
}

impl GenerationRequest {
    /// Creates a 1024x1024 request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            model: None,
            seed: None,
            format: ImageFormat::default(),
        }
    }

    /// Sets the dimensions directly.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the dimensions from a preset.
    pub fn with_aspect_ratio(self, ratio: AspectRatio) -> Self {
        let (width, height) = ratio.dimensions();
        self.with_size(width, height)
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the seed for deterministic generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the desired output format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Seed the provider used.
    pub seed: Option<u64>,
    /// Round-trip duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Cost reported by the provider, in USD.
    pub cost: Option<f64>,
    /// Whether the provider flagged the output as NSFW.
    pub nsfw_content: bool,
}

/// A generated image, addressed by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Fetchable URL of the image.
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Provider-side image identifier.
    #[serde(rename = "imageUUID", default, skip_serializing_if = "Option::is_none")]
    pub image_uuid: Option<Uuid>,
    /// Identifier of the task that produced the image.
    #[serde(rename = "taskUUID", default, skip_serializing_if = "Option::is_none")]
    pub task_uuid: Option<Uuid>,
    /// Generation metadata.
    #[serde(default)]
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates an image with only a URL.
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            image_uuid: None,
            task_uuid: None,
            metadata: GenerationMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_dimensions() {
        assert_eq!(AspectRatio::Square.dimensions(), (1024, 1024));
        assert_eq!(AspectRatio::Landscape.dimensions(), (1024, 576));
        assert_eq!(AspectRatio::Portrait.dimensions(), (576, 1024));
        assert_eq!(AspectRatio::Standard.dimensions(), (1024, 768));
        assert_eq!(AspectRatio::StandardPortrait.dimensions(), (768, 1024));
    }

    #[test]
    fn test_aspect_ratio_from_str() {
        assert_eq!("16:9".parse::<AspectRatio>(), Ok(AspectRatio::Landscape));
        assert_eq!(" 3:4 ".parse::<AspectRatio>(), Ok(AspectRatio::StandardPortrait));
        assert!("21:9".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_ratio_serde_uses_literal() {
        let json = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(json, "\"9:16\"");
    }

    #[test]
    fn test_request_defaults_to_square() {
        let req = GenerationRequest::new("A lighthouse");
        assert_eq!((req.width, req.height), (1024, 1024));
        assert_eq!(req.format, ImageFormat::WebP);
        assert!(req.model.is_none());
    }

    #[test]
    fn test_request_with_aspect_ratio() {
        let req = GenerationRequest::new("A lighthouse").with_aspect_ratio(AspectRatio::Landscape);
        assert_eq!(req.width, 1024);
        assert_eq!(req.height, 576);
    }

    #[test]
    fn test_format_from_magic_bytes() {
        let webp = *b"RIFF\x00\x00\x00\x00WEBP";
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(ImageFormat::from_magic_bytes(&webp), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(&png), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_generated_image_deserializes_runware_names() {
        let json = r#"{
            "imageURL": "https://im.runware.ai/image/ii/a.webp",
            "imageUUID": "3b3a7a2e-1c1e-4f39-9d0e-0c5b6f1d2a10"
        }"#;
        let image: GeneratedImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.image_url, "https://im.runware.ai/image/ii/a.webp");
        assert!(image.image_uuid.is_some());
        assert!(image.task_uuid.is_none());
    }
}
