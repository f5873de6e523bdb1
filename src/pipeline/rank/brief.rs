//! Style brief generation for the selected theme.
//!
//! The brief feeds the image prompt. LLM enrichment is best-effort;
//! the deterministic fallback always produces a usable brief.

use serde::Serialize;
use tracing::warn;

use crate::clients::LlmClient;
use crate::pipeline::discover::Theme;
use crate::util::json::extract_object;

/// Default palette used when no colors are suggested.
pub const DEFAULT_DARK_PALETTE: [&str; 3] = ["#1a1a1a", "#2d2d2d", "#4a4a4a"];

#[derive(Debug, Clone, Serialize)]
pub struct StyleBrief {
    pub prompt: String,
    pub color_palette: Vec<String>,
    pub key_elements: Vec<String>,
    pub style_description: Option<String>,
}

/// Produce a brief for `theme`. Never fails: LLM errors fall back to
/// the deterministic brief.
pub async fn generate(llm: Option<&LlmClient>, theme: &Theme) -> StyleBrief {
    if let Some(llm) = llm {
        match enrich(llm, theme).await {
            Ok(brief) => return brief,
            Err(error) => {
                warn!(theme = %theme.name, error = %error, "style brief enrichment failed, using fallback");
            }
        }
    }

    fallback(theme)
}

async fn enrich(llm: &LlmClient, theme: &Theme) -> anyhow::Result<StyleBrief> {
    let prompt = format!(
        "Design a dark, minimalistic desktop wallpaper concept for the \
         theme \"{name}\".\nTheme description: {description}\n\
         Respond with a JSON object only, with keys:\n\
         prompt (one-sentence image prompt), color_palette (array of hex \
         strings, dark tones), key_elements (array of short strings), \
         style_description (one sentence).",
        name = theme.name,
        description = theme.description,
    );

    let response = llm.generate_text(&prompt).await?;
    let Some(parsed) = extract_object(&response) else {
        anyhow::bail!("brief response carried no JSON object");
    };

    let mut brief = fallback(theme);
    if let Some(image_prompt) = parsed["prompt"].as_str() {
        if !image_prompt.is_empty() {
            brief.prompt = image_prompt.to_string();
        }
    }
    let palette = string_array(&parsed["color_palette"]);
    if !palette.is_empty() {
        brief.color_palette = palette;
    }
    brief.key_elements = string_array(&parsed["key_elements"]);
    if let Some(description) = parsed["style_description"]
        .as_str()
        .filter(|s| !s.is_empty())
    {
        brief.style_description = Some(description.to_string());
    }

    Ok(brief)
}

/// Deterministic brief: the theme's own description (or name) plus the
/// default dark palette.
#[must_use]
pub fn fallback(theme: &Theme) -> StyleBrief {
    let prompt = if theme.description.is_empty() {
        theme.name.clone()
    } else {
        theme.description.clone()
    };

    StyleBrief {
        style_description: Some(prompt.clone()),
        prompt,
        color_palette: DEFAULT_DARK_PALETTE.iter().map(ToString::to_string).collect(),
        key_elements: Vec::new(),
    }
}

fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
