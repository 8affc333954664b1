//! Phase-1 logo generation: the four directions fan out behind a bounded
//! semaphore, each producing `option_<N>_<slug>/logo.png`. One direction
//! failing never blocks the other three; the caller receives a
//! per-direction status map alongside the assets.

use super::{
    build_attachments, compose_image_prompt, direction_dir, tags_for, AssetContext,
    DirectionAssets,
};
use crate::brief::Brief;
use crate::direction::BrandDirectionsOutput;
use crate::model::{AspectRatio, ImagePrompt};
use crate::prompt;
use crate::references::ReferenceKind;
use crate::runner::progress::{CancelFlag, ItemStatus, PhaseState, ProgressSink};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Serialize)]
pub struct DirectionStatus {
    pub status: ItemStatus,
    pub error: Option<String>,
}

impl DirectionStatus {
    pub fn ok() -> Self {
        Self {
            status: ItemStatus::Done,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Generate logos for every direction concurrently (bounded by
/// `concurrency`). Results are collated by option number; completion order
/// is not meaningful and not preserved.
pub async fn generate_logos(
    ctx: &AssetContext,
    brief: &Brief,
    directions: &BrandDirectionsOutput,
    tags: &HashMap<u8, Vec<String>>,
    output_dir: &Path,
    concurrency: usize,
    sink: &ProgressSink,
    cancel: &CancelFlag,
) -> (HashMap<u8, DirectionAssets>, HashMap<u8, DirectionStatus>) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set: JoinSet<(u8, Result<DirectionAssets, String>)> = JoinSet::new();

    // Shared Style-DNA extraction happens once up front; the per-direction
    // tasks receive the result instead of racing the cache.
    let dna = ctx.style_dna(brief).await;

    for direction in &directions.directions {
        let permit_source = Arc::clone(&semaphore);
        let ctx = ctx.clone();
        let brief = brief.clone();
        let direction = direction.clone();
        let effective_tags = tags_for(tags, direction.option_number, &brief);
        let dna = dna.clone();
        let asset_dir = direction_dir(output_dir, &direction);
        let sink = sink.clone();
        let cancel = cancel.clone();

        set.spawn(async move {
            let option = direction.option_number;
            let _permit = match permit_source.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (option, Err("worker pool closed".to_string())),
            };
            if cancel.is_cancelled() {
                return (option, Err("cancelled".to_string()));
            }
            sink.item(
                PhaseState::GeneratingLogos,
                &format!("option_{option}"),
                ItemStatus::Started,
                Some(direction.direction_name.clone()),
            );

            let result = async {
                tokio::fs::create_dir_all(&asset_dir)
                    .await
                    .map_err(|e| e.to_string())?;
                let refs = ctx
                    .references
                    .lookup_references(&effective_tags, ReferenceKind::Logo, 2);
                let guide = ctx
                    .references
                    .lookup_styleguide(&effective_tags, ReferenceKind::Logo);
                let base = prompt::logo_prompt(&direction.logo_spec, &brief.brand_name, dna.as_ref());
                let mut image_prompt = ImagePrompt::new(
                    compose_image_prompt(ReferenceKind::Logo, &base, guide),
                    AspectRatio::Square,
                );
                image_prompt.attachments = build_attachments(&brief, dna.as_ref(), &refs, true);

                let bytes = ctx
                    .ladder
                    .generate("logo", &image_prompt)
                    .await
                    .map_err(|e| e.to_string())?;
                let logo_path = asset_dir.join("logo.png");
                tokio::fs::write(&logo_path, bytes)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>(DirectionAssets {
                    option_number: option,
                    logo: Some(logo_path),
                    ..DirectionAssets::default()
                })
            }
            .await;
            (option, result)
        });
    }

    let mut assets = HashMap::new();
    let mut statuses = HashMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((option, Ok(direction_assets))) => {
                sink.item(
                    PhaseState::GeneratingLogos,
                    &format!("option_{option}"),
                    ItemStatus::Done,
                    None,
                );
                assets.insert(option, direction_assets);
                statuses.insert(option, DirectionStatus::ok());
            }
            Ok((option, Err(error))) => {
                tracing::warn!(option, error = error.as_str(), "logo generation failed");
                sink.item(
                    PhaseState::GeneratingLogos,
                    &format!("option_{option}"),
                    ItemStatus::Failed,
                    Some(error.clone()),
                );
                statuses.insert(option, DirectionStatus::failed(error));
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "logo worker panicked");
            }
        }
    }
    (assets, statuses)
}
