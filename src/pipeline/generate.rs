//! Wallpaper generation stage.
//!
//! Assembles the image prompt from the style brief, calls the image
//! provider and post-processes the result to the configured target
//! resolution before saving it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clients::PollinationsClient;
use crate::pipeline::rank::Selection;
use crate::scheduler::JobContext;
use crate::util::image::process_wallpaper;

const PROMPT_SUFFIX: &str = "dark background, minimalistic design, elegant, high quality";
const MAX_FILE_STEM_CHARS: usize = 50;
const MAX_PROMPT_COLORS: usize = 3;
const MAX_PROMPT_ELEMENTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct WallpaperArtifact {
    pub file_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "generated wallpaper is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    ResolutionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

#[async_trait]
pub trait GenerateStage: Send + Sync {
    async fn generate(&self, job: &JobContext, selection: &Selection)
    -> Result<WallpaperArtifact>;
}

pub struct ImageGenerateStage {
    client: Arc<PollinationsClient>,
    wallpaper_dir: PathBuf,
    width: u32,
    height: u32,
}

impl ImageGenerateStage {
    pub fn new(
        client: Arc<PollinationsClient>,
        wallpaper_dir: impl Into<PathBuf>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            client,
            wallpaper_dir: wallpaper_dir.into(),
            width,
            height,
        }
    }

    fn output_path(&self, theme_name: &str) -> PathBuf {
        let stem = sanitize_file_stem(theme_name);
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.wallpaper_dir.join(format!("{stem}_{timestamp}.png"))
    }
}

#[async_trait]
impl GenerateStage for ImageGenerateStage {
    async fn generate(
        &self,
        job: &JobContext,
        selection: &Selection,
    ) -> Result<WallpaperArtifact> {
        let prompt = build_prompt(selection);
        debug!(job_id = %job.job_id, %prompt, "requesting wallpaper image");

        let bytes = self
            .client
            .generate(&prompt, self.width, self.height)
            .await?;

        let path = self.output_path(&selection.selected.theme.name);
        let (width, height) = {
            let target = (self.width, self.height);
            let path = path.clone();
            tokio::task::spawn_blocking(move || {
                process_wallpaper(&bytes, target.0, target.1, &path)
            })
            .await
            .context("wallpaper post-processing task panicked")??
        };

        if (width, height) != (self.width, self.height) {
            return Err(GenerateError::ResolutionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            }
            .into());
        }

        info!(job_id = %job.job_id, path = %path.display(), "wallpaper saved");

        Ok(WallpaperArtifact {
            file_path: path,
            width,
            height,
        })
    }
}

/// Assemble the image prompt from the brief. The theme name is always
/// present and the dark-style suffix always closes the prompt.
#[must_use]
pub fn build_prompt(selection: &Selection) -> String {
    let theme = &selection.selected.theme;
    let brief = &selection.brief;

    let mut parts = Vec::new();
    if brief.prompt.is_empty() {
        parts.push(format!(
            "Minimalistic dark-themed wallpaper featuring {}",
            theme.name
        ));
    } else {
        parts.push(brief.prompt.clone());
        if !brief
            .prompt
            .to_lowercase()
            .contains(&theme.name.to_lowercase())
        {
            parts.push(format!("featuring {}", theme.name));
        }
    }

    if !brief.color_palette.is_empty() {
        let colors: Vec<&str> = brief
            .color_palette
            .iter()
            .take(MAX_PROMPT_COLORS)
            .map(String::as_str)
            .collect();
        parts.push(format!("color palette {}", colors.join(" ")));
    }

    if !brief.key_elements.is_empty() {
        let elements: Vec<&str> = brief
            .key_elements
            .iter()
            .take(MAX_PROMPT_ELEMENTS)
            .map(String::as_str)
            .collect();
        parts.push(format!("with {}", elements.join(", ")));
    }

    if let Some(style) = &brief.style_description {
        parts.push(style.clone());
    }

    parts.push(PROMPT_SUFFIX.to_string());
    parts.join(", ")
}

/// Reduce a theme name to a filesystem-safe stem.
#[must_use]
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .take(MAX_FILE_STEM_CHARS)
        .collect();
    let stem = stem.trim().replace(' ', "_");
    if stem.is_empty() {
        "wallpaper".to_string()
    } else {
        stem
    }
}
