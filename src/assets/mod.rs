//! Asset generation: Phase-1 logos (per-direction fan-out) and the Phase-2
//! kit (pattern, background, palette, shades, logo variants) for the chosen
//! direction. Every step is isolated: a failed asset is recorded and left
//! null, never fatal to the phase.

pub mod glyph;
pub mod logo;
pub mod palette;
pub mod shades;
pub mod variants;

use crate::brief::Brief;
use crate::direction::BrandDirection;
use crate::model::{AspectRatio, ImageLadder, ImagePrompt, ImageRef, TextModel};
use crate::prompt;
use crate::references::{ReferenceIndex, ReferenceKind, Styleguide};
use crate::runner::progress::{CancelFlag, ItemStatus, PhaseState, ProgressSink};
use crate::styledna::{StyleDna, StyleDnaExtractor};
use crate::util::option_dir_name;
use palette::EnrichedSwatch;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Generated artifact paths for one direction. Fields are present-or-null;
/// a null records a degraded step, not a phase failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectionAssets {
    pub option_number: u8,
    pub logo: Option<PathBuf>,
    pub logo_white: Option<PathBuf>,
    pub logo_black: Option<PathBuf>,
    pub logo_transparent: Option<PathBuf>,
    pub pattern: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub palette_png: Option<PathBuf>,
    pub shades_png: Option<PathBuf>,
    pub enriched_colors: Vec<EnrichedSwatch>,
}

/// Shared stage dependencies, cheap to clone into fan-out tasks.
#[derive(Clone)]
pub struct AssetContext {
    pub ladder: Arc<ImageLadder>,
    pub text: Arc<dyn TextModel>,
    pub references: Arc<ReferenceIndex>,
    pub dna: Arc<StyleDnaExtractor>,
}

impl AssetContext {
    /// Style-DNA for the first user style reference, if any. The extractor's
    /// content-hash cache makes this free for every caller after the first.
    pub async fn style_dna(&self, brief: &Brief) -> Option<StyleDna> {
        let first = brief.style_ref_images.first()?;
        self.dna.extract(first).await
    }
}

pub fn direction_dir(output_dir: &Path, direction: &BrandDirection) -> PathBuf {
    output_dir.join(option_dir_name(direction.option_number, &direction.direction_name))
}

/// Compose the full image prompt for a logo or pattern: the spec-derived
/// keyword stack, the matched styleguide excerpt, and the kind's technical
/// requirements block.
fn compose_image_prompt(kind: ReferenceKind, base: &str, guide: Option<&Styleguide>) -> String {
    let mut out = base.to_string();
    if let Some(guide) = guide {
        let label = match kind {
            ReferenceKind::Logo => "logo",
            ReferenceKind::Pattern => "pattern",
        };
        out.push_str(&format!(
            "\n\n## STYLE GUIDE — apply these rules to this {label}:\n{}\n## END STYLE GUIDE",
            guide.prompt_excerpt()
        ));
    }
    match kind {
        ReferenceKind::Logo => {
            out.push_str("\n\nSquare format, crisp vector edges, white background.");
        }
        ReferenceKind::Pattern => {
            out.push_str(
                "\n\nTechnical requirements:\n\
                 - Seamless tileable pattern, all 4 edges align perfectly when tiled\n\
                 - Consistent density and spacing throughout the tile\n\
                 - Absolutely no text, words, or letters anywhere in the image\n\
                 - Square tile format, professional surface/textile design quality",
            );
        }
    }
    out
}

/// Attachment stack for a multimodal generation call, in signal-priority
/// order: user style refs first, then client moodboard, then library
/// references.
fn build_attachments(
    brief: &Brief,
    dna: Option<&StyleDna>,
    library_refs: &[PathBuf],
    include_style_refs: bool,
) -> Vec<ImageRef> {
    let mut attachments = Vec::new();

    if include_style_refs {
        for (i, path) in brief.style_ref_images.iter().take(2).enumerate() {
            let label = match dna {
                Some(dna) => format!(
                    "CRITICAL STYLE REFERENCE {} — your output must look like it was \
                     created by the same designer with the same tools. {} \
                     The concept is different; the craftsmanship must be indistinguishable.",
                    i + 1,
                    dna.to_constraints()
                ),
                None => format!(
                    "CRITICAL STYLE REFERENCE {} — match the stroke weight, fill \
                     technique, illustration medium, and overall craftsmanship exactly.",
                    i + 1
                ),
            };
            attachments.push(ImageRef {
                label,
                path: path.clone(),
            });
        }
    }

    let style_set: std::collections::HashSet<&PathBuf> = brief.style_ref_images.iter().collect();
    for (i, path) in brief
        .moodboard_images
        .iter()
        .filter(|p| !style_set.contains(p))
        .take(8)
        .enumerate()
    {
        attachments.push(ImageRef {
            label: format!(
                "CLIENT MOODBOARD #{} — study its aesthetic, color mood, and visual \
                 language; your output should feel like it belongs in the same world.",
                i + 1
            ),
            path: path.clone(),
        });
    }

    for (i, path) in library_refs.iter().enumerate() {
        attachments.push(ImageRef {
            label: format!(
                "LIBRARY REFERENCE #{} — study its craft and production quality. \
                 Do not copy; use as a quality benchmark only.",
                i + 1
            ),
            path: path.clone(),
        });
    }
    attachments
}

// ─── Phase 2: full kit for the chosen direction ──────────────────────────────

pub struct AssetGenerator {
    ctx: AssetContext,
}

impl AssetGenerator {
    pub fn new(ctx: AssetContext) -> Self {
        Self { ctx }
    }

    /// Generate the Phase-2 asset kit. Sequential isolated sub-steps; any
    /// step may degrade to null without failing the phase.
    pub async fn generate_full(
        &self,
        brief: &Brief,
        direction: &BrandDirection,
        tags: &[String],
        output_dir: &Path,
        sink: &ProgressSink,
        cancel: &CancelFlag,
    ) -> crate::error::Result<DirectionAssets> {
        let asset_dir = direction_dir(output_dir, direction);
        tokio::fs::create_dir_all(&asset_dir).await?;

        let mut assets = DirectionAssets {
            option_number: direction.option_number,
            ..DirectionAssets::default()
        };
        let dna = self.ctx.style_dna(brief).await;

        // The base logo normally exists from Phase 1; regenerate if the
        // caller points at a fresh directory.
        cancel.checkpoint()?;
        let logo_path = asset_dir.join("logo.png");
        if logo_path.is_file() {
            assets.logo = Some(logo_path.clone());
        } else {
            assets.logo = self
                .generate_logo_image(brief, direction, tags, dna.as_ref(), &logo_path)
                .await;
        }
        self.report(sink, "logo", assets.logo.is_some());

        cancel.checkpoint()?;
        assets.pattern = self
            .generate_pattern_image(brief, direction, tags, &asset_dir)
            .await;
        self.report(sink, "pattern", assets.pattern.is_some());

        cancel.checkpoint()?;
        assets.background = self.generate_background_image(direction, &asset_dir).await;
        self.report(sink, "background", assets.background.is_some());

        cancel.checkpoint()?;
        assets.enriched_colors =
            palette::enrich(self.ctx.text.as_ref(), &direction.colors).await;
        let palette_path = asset_dir.join("palette.png");
        match palette::render_palette_png(&assets.enriched_colors, &palette_path) {
            Ok(()) => assets.palette_png = Some(palette_path),
            Err(err) => tracing::warn!(error = %err, "palette render failed"),
        }
        self.report(sink, "palette", assets.palette_png.is_some());

        cancel.checkpoint()?;
        let scales = shades::palette_shades(&assets.enriched_colors);
        let shades_path = asset_dir.join("shades.png");
        match shades::render_shades_png(&scales, &shades_path) {
            Ok(()) => assets.shades_png = Some(shades_path),
            Err(err) => tracing::warn!(error = %err, "shade render failed"),
        }
        self.report(sink, "shades", assets.shades_png.is_some());

        cancel.checkpoint()?;
        if let Some(logo) = &assets.logo {
            match variants::derive(logo, &asset_dir, variants::DEFAULT_WHITE_THRESHOLD) {
                Ok(derived) => {
                    assets.logo_transparent = Some(derived.transparent);
                    assets.logo_white = Some(derived.white);
                    assets.logo_black = Some(derived.black);
                }
                Err(err) => tracing::warn!(error = %err, "variant derivation failed"),
            }
        }
        self.report(sink, "logo_variants", assets.logo_white.is_some());

        Ok(assets)
    }

    fn report(&self, sink: &ProgressSink, item: &str, ok: bool) {
        sink.item(
            PhaseState::GeneratingAssets,
            item,
            if ok { ItemStatus::Done } else { ItemStatus::Failed },
            None,
        );
    }

    async fn generate_logo_image(
        &self,
        brief: &Brief,
        direction: &BrandDirection,
        tags: &[String],
        dna: Option<&StyleDna>,
        save_path: &Path,
    ) -> Option<PathBuf> {
        let refs = self
            .ctx
            .references
            .lookup_references(tags, ReferenceKind::Logo, 2);
        let guide = self.ctx.references.lookup_styleguide(tags, ReferenceKind::Logo);
        let base = prompt::logo_prompt(&direction.logo_spec, &brief.brand_name, dna);
        let mut image_prompt = ImagePrompt::new(
            compose_image_prompt(ReferenceKind::Logo, &base, guide),
            AspectRatio::Square,
        );
        image_prompt.attachments = build_attachments(brief, dna, &refs, true);
        self.run_image("logo", &image_prompt, save_path).await
    }

    async fn generate_pattern_image(
        &self,
        brief: &Brief,
        direction: &BrandDirection,
        tags: &[String],
        asset_dir: &Path,
    ) -> Option<PathBuf> {
        let refs = self
            .ctx
            .references
            .lookup_references(tags, ReferenceKind::Pattern, 2);
        let guide = self
            .ctx
            .references
            .lookup_styleguide(tags, ReferenceKind::Pattern);
        let base = prompt::pattern_prompt(&direction.pattern_spec);
        let mut image_prompt = ImagePrompt::new(
            compose_image_prompt(ReferenceKind::Pattern, &base, guide),
            AspectRatio::Square,
        );
        image_prompt.attachments = build_attachments(brief, None, &refs, false);
        self.run_image("pattern", &image_prompt, &asset_dir.join("pattern.png"))
            .await
    }

    async fn generate_background_image(
        &self,
        direction: &BrandDirection,
        asset_dir: &Path,
    ) -> Option<PathBuf> {
        let image_prompt = ImagePrompt::new(
            prompt::background_prompt(&direction.background_spec),
            AspectRatio::Wide,
        );
        self.run_image("background", &image_prompt, &asset_dir.join("background.png"))
            .await
    }

    async fn run_image(
        &self,
        stage: &str,
        image_prompt: &ImagePrompt,
        save_path: &Path,
    ) -> Option<PathBuf> {
        match self.ctx.ladder.generate(stage, image_prompt).await {
            Ok(bytes) => match tokio::fs::write(save_path, bytes).await {
                Ok(()) => Some(save_path.to_path_buf()),
                Err(err) => {
                    tracing::warn!(stage, error = %err, "asset write failed");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(stage, error = %err, "asset generation degraded to null");
                None
            }
        }
    }
}

// Re-exported for the runner's per-direction status map.
pub use logo::{generate_logos, DirectionStatus};

/// Tags for one direction with the brief keywords as the last-resort value.
pub(crate) fn tags_for(
    tags: &HashMap<u8, Vec<String>>,
    option_number: u8,
    brief: &Brief,
) -> Vec<String> {
    tags.get(&option_number)
        .cloned()
        .unwrap_or_else(|| brief.keywords.clone())
}
