//! Mockup compositing. Placement zones are pre-extracted during reference
//! library construction and stored in `mockups/metadata.json`; at runtime
//! the model reconstructs each product photograph with the brand applied;
//! this is prompt-driven image editing, not a pixel composite.

use crate::assets::DirectionAssets;
use crate::direction::BrandDirection;
use crate::model::{AspectRatio, ImageLadder, ImagePrompt, ImageRef};
use crate::runner::progress::{CancelFlag, ItemStatus, PhaseState, ProgressSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Darkness {
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupZone {
    pub kind: String,
    pub description: String,
}

/// Per-mockup metadata record, produced at library build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupMeta {
    pub name: String,
    /// Filename of the unbranded original photograph, relative to the
    /// mockup directory.
    pub original: String,
    pub darkness: Darkness,
    #[serde(default)]
    pub zones: Vec<MockupZone>,
    pub scene: String,
    pub logo_placement: String,
    pub logo_color: String,
    pub logo_size: String,
    pub material: String,
    pub style: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MockupStatus {
    pub name: String,
    pub status: ItemStatus,
    pub detail: Option<String>,
    pub path: Option<PathBuf>,
}

pub fn load_metadata(mockups_dir: &Path) -> Vec<MockupMeta> {
    let path = mockups_dir.join("metadata.json");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<Vec<MockupMeta>>(&raw) {
            Ok(metas) => metas,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "mockup metadata malformed");
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "mockup metadata unavailable");
            Vec::new()
        }
    }
}

/// Pick the logo variant for a mockup: white ink for the dark-background
/// set, transparent (falling back to the base logo) otherwise.
pub fn select_logo_variant<'a>(
    meta: &MockupMeta,
    assets: &'a DirectionAssets,
) -> Option<&'a PathBuf> {
    match meta.darkness {
        Darkness::Dark => assets.logo_white.as_ref().or(assets.logo.as_ref()),
        Darkness::Light => assets
            .logo_transparent
            .as_ref()
            .or(assets.logo.as_ref()),
    }
}

/// Prompt for the reconstruction call: scene spec merged with live brand
/// data, zone descriptions spelled out for the model.
pub fn build_mockup_prompt(
    meta: &MockupMeta,
    direction: &BrandDirection,
    brand_name: &str,
) -> String {
    let primary = direction.primary_hex().unwrap_or("#333333");
    let palette = direction
        .colors
        .iter()
        .take(3)
        .map(|c| c.hex.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut zones = String::new();
    for zone in &meta.zones {
        zones.push_str(&format!("  - {}: {}\n", zone.kind, zone.description));
    }
    if zones.is_empty() {
        zones.push_str("  - logo: centered on the product face\n");
    }

    format!(
        "You are a professional brand identity mockup renderer. Reconstruct \
         the attached product photograph with this brand identity applied.\n\n\
         Brand name: {brand_name}\n\
         Primary color: {primary}\n\
         Color palette: {palette}\n\
         Brand direction: {}\n\n\
         Mockup scene: {}\n\
         Placement zones:\n{zones}\
         Logo placement: {}\n\
         Logo color: {}\n\
         Logo size: {}\n\
         Material / rendering: {}\n\
         Visual style: {}\n\n\
         Rules:\n\
         - Apply the brand only inside the placement zones.\n\
         - Keep all other areas identical: surroundings, shadows, materials, \
         lighting, perspective, and scene composition must not change.\n\
         - Render the logo naturally on the material (screen-print on fabric, \
         etched on acrylic, printed on card stock).\n\
         - Output a single photorealistic image with the same dimensions and \
         crop as the reference.",
        direction.direction_name,
        meta.scene,
        meta.logo_placement,
        meta.logo_color,
        meta.logo_size,
        meta.material,
        meta.style,
    )
}

pub struct MockupCompositor {
    ladder: Arc<ImageLadder>,
    concurrency: usize,
    item_timeout: Duration,
}

impl MockupCompositor {
    pub fn new(ladder: Arc<ImageLadder>, concurrency: usize, item_timeout: Duration) -> Self {
        Self {
            ladder,
            concurrency,
            item_timeout,
        }
    }

    /// Composite the chosen direction onto every available mockup.
    /// Per-mockup failures and skips are recorded in the returned statuses;
    /// nothing here is fatal to the phase.
    pub async fn composite_all(
        &self,
        metas: &[MockupMeta],
        mockups_dir: &Path,
        direction: &BrandDirection,
        brand_name: &str,
        assets: &DirectionAssets,
        out_dir: &Path,
        sink: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Vec<MockupStatus> {
        if metas.is_empty() {
            return Vec::new();
        }
        if let Err(err) = tokio::fs::create_dir_all(out_dir).await {
            tracing::warn!(error = %err, "mockup output dir unavailable");
            return Vec::new();
        }

        let pool = self.concurrency.min(metas.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(pool));
        let mut set: JoinSet<MockupStatus> = JoinSet::new();

        for meta in metas.iter().cloned() {
            let permit_source = Arc::clone(&semaphore);
            let ladder = Arc::clone(&self.ladder);
            let item_timeout = self.item_timeout;
            let original_path = mockups_dir.join(&meta.original);
            let out_path = out_dir.join(format!("{}_composite.png", meta.name));
            let prompt_text = build_mockup_prompt(&meta, direction, brand_name);
            let logo = select_logo_variant(&meta, assets).cloned();
            let sink = sink.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                let _permit = match permit_source.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return MockupStatus {
                            name: meta.name,
                            status: ItemStatus::Failed,
                            detail: Some("worker pool closed".to_string()),
                            path: None,
                        }
                    }
                };
                if cancel.is_cancelled() {
                    return MockupStatus {
                        name: meta.name,
                        status: ItemStatus::Skipped,
                        detail: Some("cancelled".to_string()),
                        path: None,
                    };
                }
                if !original_path.is_file() {
                    tracing::warn!(mockup = meta.name.as_str(), "original photo missing, skipping");
                    return MockupStatus {
                        name: meta.name,
                        status: ItemStatus::Skipped,
                        detail: Some(format!("original missing: {}", original_path.display())),
                        path: None,
                    };
                }
                sink.item(
                    PhaseState::CompositingMockups,
                    &meta.name,
                    ItemStatus::Started,
                    None,
                );

                let mut image_prompt = ImagePrompt::new(prompt_text, AspectRatio::Square);
                image_prompt.attachments.push(ImageRef {
                    label: "Reference product photograph (unbranded):".to_string(),
                    path: original_path,
                });
                if let Some(logo) = logo {
                    image_prompt.attachments.push(ImageRef {
                        label: "Brand logo mark — integrate into the placement zones, \
                                rendered naturally on the material:"
                            .to_string(),
                        path: logo,
                    });
                }

                let result = tokio::time::timeout(
                    item_timeout,
                    ladder.generate("mockup", &image_prompt),
                )
                .await;
                match result {
                    Ok(Ok(bytes)) => match tokio::fs::write(&out_path, bytes).await {
                        Ok(()) => MockupStatus {
                            name: meta.name,
                            status: ItemStatus::Done,
                            detail: None,
                            path: Some(out_path),
                        },
                        Err(err) => MockupStatus {
                            name: meta.name,
                            status: ItemStatus::Failed,
                            detail: Some(err.to_string()),
                            path: None,
                        },
                    },
                    Ok(Err(err)) => MockupStatus {
                        name: meta.name,
                        status: ItemStatus::Failed,
                        detail: Some(err.to_string()),
                        path: None,
                    },
                    Err(_) => MockupStatus {
                        name: meta.name,
                        status: ItemStatus::Failed,
                        detail: Some("item timeout exceeded".to_string()),
                        path: None,
                    },
                }
            });
        }

        let mut statuses = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(status) => {
                    sink.item(
                        PhaseState::CompositingMockups,
                        &status.name,
                        status.status,
                        status.detail.clone(),
                    );
                    statuses.push(status);
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "mockup worker panicked");
                }
            }
        }
        // Collate by name so callers never depend on completion order.
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}
