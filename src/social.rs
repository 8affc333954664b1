//! Social post compositor: fixed templates rendered with the chosen
//! direction's assets. Copy resolution per field is a priority chain:
//! locked brief copy, then the direction's field, then an on-the-fly
//! generation from the brief. Layout constraints live in the prompt; they
//! are not enforced pixel-wise.

use crate::assets::DirectionAssets;
use crate::brief::Brief;
use crate::direction::BrandDirection;
use crate::model::{AspectRatio, ImageLadder, ImagePrompt, ImageRef, TextModel};
use crate::runner::progress::{CancelFlag, ItemStatus, PhaseState, ProgressSink};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyField {
    Tagline,
    Slogan,
    Announcement,
}

pub struct SocialTemplate {
    pub file_name: &'static str,
    pub label: &'static str,
    pub aspect: AspectRatio,
    pub copy_field: CopyField,
    pub layout: &'static str,
}

pub const TEMPLATES: &[SocialTemplate] = &[
    SocialTemplate {
        file_name: "ig_post.png",
        label: "Instagram post",
        aspect: AspectRatio::Square,
        copy_field: CopyField::Tagline,
        layout: "logo small top center, tagline centered as the hero text, \
                 brand primary color or pattern as background, generous safe-area padding",
    },
    SocialTemplate {
        file_name: "ig_story.png",
        label: "Instagram story",
        aspect: AspectRatio::Tall,
        copy_field: CopyField::Announcement,
        layout: "vertical composition, logo upper third, announcement copy \
                 mid-frame, bottom third kept clear for platform UI",
    },
    SocialTemplate {
        file_name: "fb_post.png",
        label: "Facebook post",
        aspect: AspectRatio::Wide,
        copy_field: CopyField::Tagline,
        layout: "wide layout, tagline left-aligned on the brand color field, \
                 logo bottom-right corner at small scale",
    },
    SocialTemplate {
        file_name: "x_post.png",
        label: "X post",
        aspect: AspectRatio::Wide,
        copy_field: CopyField::Announcement,
        layout: "announcement copy as large legible text, small logo top \
                 center, minimal decoration, strong contrast",
    },
    SocialTemplate {
        file_name: "linkedin_post.png",
        label: "LinkedIn post",
        aspect: AspectRatio::Wide,
        copy_field: CopyField::Slogan,
        layout: "ad slogan as bold hero text filling most of the frame, logo \
                 small bottom-right, bold graphic background from the brand palette",
    },
];

fn locked_value(brief: &Brief, field: CopyField) -> Option<String> {
    let copy = brief.locked()?;
    match field {
        CopyField::Tagline => copy.tagline.clone(),
        CopyField::Slogan => copy.slogan.clone(),
        CopyField::Announcement => copy.announcement.clone(),
    }
}

fn direction_value(direction: &BrandDirection, field: CopyField) -> String {
    match field {
        CopyField::Tagline => direction.tagline.clone(),
        CopyField::Slogan => direction.ad_slogan.clone(),
        CopyField::Announcement => direction.announcement_copy.clone(),
    }
}

pub struct SocialCompositor {
    ladder: Arc<ImageLadder>,
    text: Arc<dyn TextModel>,
}

impl SocialCompositor {
    pub fn new(ladder: Arc<ImageLadder>, text: Arc<dyn TextModel>) -> Self {
        Self { ladder, text }
    }

    /// Resolve the copy for one field through the priority chain.
    pub async fn resolve_copy(
        &self,
        brief: &Brief,
        direction: &BrandDirection,
        field: CopyField,
    ) -> String {
        if let Some(locked) = locked_value(brief, field) {
            return locked;
        }
        let from_direction = direction_value(direction, field);
        if !from_direction.trim().is_empty() {
            return from_direction;
        }

        // Last resort: generate the single field from the full brief.
        let (label, guidance) = match field {
            CopyField::Tagline => ("tagline", "5-10 words, memorable, on-brand"),
            CopyField::Slogan => ("ad slogan", "3-6 words, bold, imperative or evocative"),
            CopyField::Announcement => (
                "announcement copy",
                "10-18 words, reads like an exciting brand announcement",
            ),
        };
        let schema = json!({
            "type": "object",
            "properties": {"copy": {"type": "string"}},
            "required": ["copy"]
        });
        let prompt = format!(
            "{}\n\nWrite the brand's {label} ({guidance}). Return JSON with a \
             single `copy` field.",
            brief.to_prompt_block()
        );
        match self.text.generate_json(None, &prompt, &schema).await {
            Ok(value) => value
                .get("copy")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            Err(err) => {
                tracing::warn!(field = label, error = %err, "copy fallback generation failed");
                String::new()
            }
        }
    }

    fn build_prompt(
        template: &SocialTemplate,
        direction: &BrandDirection,
        brand_name: &str,
        copy: &str,
    ) -> String {
        let primary = direction.primary_hex().unwrap_or("#333333");
        let secondary = direction
            .colors
            .get(1)
            .map(|c| c.hex.as_str())
            .unwrap_or(primary);
        format!(
            "Design a {} social media post for the brand below.\n\n\
             Brand name: {brand_name}\n\
             Direction: {}\n\
             Primary color: {primary}\n\
             Secondary color: {secondary}\n\
             Graphic style: {}\n\
             Copy (render exactly, no paraphrasing): {copy:?}\n\n\
             Layout: {}\n\n\
             Constraints: keep all text inside a safe-area margin, never crop \
             the logo, strong contrast between copy and background, \
             production-ready social quality, no watermarks, no extra copy.",
            template.label, direction.direction_name, direction.graphic_style, template.layout,
        )
    }

    /// Generate every template for the chosen direction into
    /// `<out_dir>/social/`. Individual failures are logged and skipped.
    pub async fn generate_posts(
        &self,
        brief: &Brief,
        direction: &BrandDirection,
        assets: &DirectionAssets,
        out_dir: &Path,
        sink: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Vec<PathBuf> {
        let social_dir = out_dir.join("social");
        if let Err(err) = tokio::fs::create_dir_all(&social_dir).await {
            tracing::warn!(error = %err, "social output dir unavailable");
            return Vec::new();
        }

        let mut posts = Vec::new();
        for template in TEMPLATES {
            if cancel.is_cancelled() {
                break;
            }
            sink.item(
                PhaseState::ComposingSocial,
                template.file_name,
                ItemStatus::Started,
                None,
            );
            let copy = self.resolve_copy(brief, direction, template.copy_field).await;
            let mut image_prompt = ImagePrompt::new(
                Self::build_prompt(template, direction, &brief.brand_name, &copy),
                template.aspect,
            );
            if let Some(logo) = assets.logo_transparent.as_ref().or(assets.logo.as_ref()) {
                image_prompt.attachments.push(ImageRef {
                    label: "Brand logo — place exactly as the layout specifies, unaltered:"
                        .to_string(),
                    path: logo.clone(),
                });
            }
            if let Some(pattern) = &assets.pattern {
                image_prompt.attachments.push(ImageRef {
                    label: "Brand pattern — may be used as a background texture:".to_string(),
                    path: pattern.clone(),
                });
            }

            match self.ladder.generate("social", &image_prompt).await {
                Ok(bytes) => {
                    let path = social_dir.join(template.file_name);
                    match tokio::fs::write(&path, bytes).await {
                        Ok(()) => {
                            sink.item(
                                PhaseState::ComposingSocial,
                                template.file_name,
                                ItemStatus::Done,
                                None,
                            );
                            posts.push(path);
                        }
                        Err(err) => {
                            tracing::warn!(post = template.file_name, error = %err, "write failed");
                            sink.item(
                                PhaseState::ComposingSocial,
                                template.file_name,
                                ItemStatus::Failed,
                                Some(err.to_string()),
                            );
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(post = template.file_name, error = %err, "social post failed");
                    sink.item(
                        PhaseState::ComposingSocial,
                        template.file_name,
                        ItemStatus::Failed,
                        Some(err.to_string()),
                    );
                }
            }
        }
        posts
    }
}
