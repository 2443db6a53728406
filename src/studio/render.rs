//! Deriving what to draw from the UI state.

use crate::studio::download::download_file_name;
use crate::studio::form::UiState;
use crate::studio::generator::BATCH_SIZE;
use serde::Serialize;
use std::fmt;

/// Page heading.
pub const TITLE: &str = "AI Image Generator";

/// Line under the heading.
pub const SUBTITLE: &str = "Enter a prompt to generate unique AI-powered images";

/// One cell of the result grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Tile {
    /// Pulsing stand-in shown while a batch is in flight.
    Placeholder {
        /// 0-based grid position.
        index: usize,
    },
    /// A generated image with a download control.
    Image {
        /// 0-based grid position.
        index: usize,
        /// Image URL; load lazily.
        url: String,
        /// Alternative text.
        alt: String,
        /// File name used when downloading.
        download_name: String,
    },
}

/// The submit control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitButton {
    /// "Generate", or "Generating..." while busy.
    pub label: &'static str,
    /// Whether the control accepts clicks.
    pub enabled: bool,
}

/// Everything a front end draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    /// Heading.
    pub title: &'static str,
    /// Line under the heading.
    pub subtitle: &'static str,
    /// Whether the password field for the API key is shown.
    pub show_api_key_input: bool,
    /// Submit control.
    pub submit: SubmitButton,
    /// Result grid.
    pub tiles: Vec<Tile>,
}

/// Derives the view for `state`.
pub fn render(state: &UiState) -> View {
    let tiles = if state.is_generating {
        (0..BATCH_SIZE)
            .map(|index| Tile::Placeholder { index })
            .collect()
    } else {
        state
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| Tile::Image {
                index,
                url: image.image_url.clone(),
                alt: format!("Generated image {}", index + 1),
                download_name: download_file_name(index),
            })
            .collect()
    };

    View {
        title: TITLE,
        subtitle: SUBTITLE,
        show_api_key_input: state.show_api_key_input,
        submit: SubmitButton {
            label: if state.is_generating {
                "Generating..."
            } else {
                "Generate"
            },
            enabled: state.can_submit(),
        },
        tiles,
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.subtitle)?;
        writeln!(f)?;
        let marker = if self.submit.enabled { ' ' } else { '-' };
        writeln!(f, "[{marker}{}{marker}]", self.submit.label)?;
        for tile in &self.tiles {
            match tile {
                Tile::Placeholder { index } => writeln!(f, "  {}. ░░░░░░░░", index + 1)?,
                Tile::Image {
                    index,
                    url,
                    download_name,
                    ..
                } => writeln!(f, "  {}. {url}  ({download_name})", index + 1)?,
            }
        }
        Ok(())
    }
}
