//! The pipeline runner: one entry point per phase, a state machine with
//! explicit terminal states, progress events at every stage boundary and
//! parallel item, and cooperative cancellation that always leaves partial
//! files on disk.

pub mod progress;

use crate::assets::{
    AssetContext, AssetGenerator, DirectionAssets, DirectionStatus, generate_logos,
};
use crate::brief::Brief;
use crate::config::PipelineConfig;
use crate::direction::BrandDirectionsOutput;
use crate::director::Director;
use crate::error::PipelineError;
use crate::mockup::{load_metadata, MockupCompositor, MockupStatus};
use crate::model::{
    gemini::GeminiClient, ImageLadder, ImageModel, TextModel, VisionModel,
};
use crate::references::ReferenceIndex;
use crate::research::{ResearchStage, ResearchSummary};
use crate::social::SocialCompositor;
use crate::styledna::StyleDnaExtractor;
use crate::tags::TagResolver;
use crate::util::run_output_dir;
use progress::{CancelFlag, PhaseState, ProgressFn, ProgressSink};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ─── Phase results ───────────────────────────────────────────────────────────

fn new_run_id() -> String {
    format!("run_{}", uuid::Uuid::new_v4().simple())
}

#[derive(Debug, Serialize)]
pub struct LogosPhaseResult {
    pub run_id: String,
    pub success: bool,
    pub state: PhaseState,
    pub output_dir: PathBuf,
    pub directions: Option<BrandDirectionsOutput>,
    pub assets_by_option: HashMap<u8, DirectionAssets>,
    pub per_direction_status: HashMap<u8, DirectionStatus>,
    pub directions_json: Option<PathBuf>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct AssetsPhaseResult {
    pub run_id: String,
    pub success: bool,
    pub state: PhaseState,
    pub output_dir: PathBuf,
    pub assets: Option<DirectionAssets>,
    pub mockups: Vec<PathBuf>,
    pub mockup_status: Vec<MockupStatus>,
    pub social_posts: Vec<PathBuf>,
    /// Produced by an external compositor stage when present; never
    /// populated by this engine.
    pub stylescape: Option<PathBuf>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

// ─── Runner ──────────────────────────────────────────────────────────────────

pub struct PipelineRunner {
    config: PipelineConfig,
    ctx: AssetContext,
}

impl PipelineRunner {
    /// Build a runner over explicit model implementations. Loads the
    /// reference library eagerly so malformed styleguides fail here, not in
    /// the middle of a run.
    pub fn new(
        config: PipelineConfig,
        text: Arc<dyn TextModel>,
        vision: Arc<dyn VisionModel>,
        image_models: Vec<Arc<dyn ImageModel>>,
    ) -> crate::error::Result<Self> {
        let references = Arc::new(ReferenceIndex::load(
            &config.references_dir,
            &config.styles_dir,
        )?);
        let dna_cache = config.output_root.join(".cache").join("styledna");
        let ctx = AssetContext {
            ladder: Arc::new(ImageLadder::new(image_models)),
            text,
            references,
            dna: Arc::new(StyleDnaExtractor::new(vision, dna_cache)),
        };
        Ok(Self { config, ctx })
    }

    /// Convenience constructor wiring the configured Gemini endpoints.
    pub fn from_config(config: PipelineConfig) -> crate::error::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no API key configured"))?;
        let client = GeminiClient::new(config.text_endpoint.clone(), api_key);
        let text: Arc<dyn TextModel> = Arc::new(client.text_model(config.text_model.clone()));
        let vision: Arc<dyn VisionModel> =
            Arc::new(client.vision_model(config.vision_model.clone()));
        let image_models: Vec<Arc<dyn ImageModel>> = config
            .image_models
            .iter()
            .map(|m| Arc::new(client.image_model(m.clone())) as Arc<dyn ImageModel>)
            .collect();
        Self::new(config, text, vision, image_models)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ── Phase 1 ──────────────────────────────────────────────────────────

    /// Run the logos phase: research ∥ prompt assembly → director → tags →
    /// per-direction logo fan-out.
    pub async fn run_logos_phase(
        &self,
        brief: &Brief,
        on_progress: Option<Arc<ProgressFn>>,
        cancel: &CancelFlag,
    ) -> LogosPhaseResult {
        let sink = ProgressSink::new(on_progress);
        let output_dir = run_output_dir(&self.config.output_root);
        self.logos_phase_inner(brief, None, None, None, &output_dir, &sink, cancel)
            .await
    }

    /// Phase-1 refinement: regenerate directions against feedback, then
    /// regenerate logos for the affected options. No mockups or Phase-2
    /// assets are produced until the user selects a direction.
    pub async fn refine_logos_phase(
        &self,
        brief: &Brief,
        previous: &BrandDirectionsOutput,
        feedback: &str,
        only_options: Option<&[u8]>,
        on_progress: Option<Arc<ProgressFn>>,
        cancel: &CancelFlag,
    ) -> LogosPhaseResult {
        let sink = ProgressSink::new(on_progress);
        let output_dir = run_output_dir(&self.config.output_root);
        self.logos_phase_inner(
            brief,
            Some(previous),
            Some(feedback),
            only_options,
            &output_dir,
            &sink,
            cancel,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn logos_phase_inner(
        &self,
        brief: &Brief,
        previous: Option<&BrandDirectionsOutput>,
        feedback: Option<&str>,
        only_options: Option<&[u8]>,
        output_dir: &Path,
        sink: &ProgressSink,
        cancel: &CancelFlag,
    ) -> LogosPhaseResult {
        let run_id = new_run_id();
        let fail = |state: PhaseState, error: String, sink: &ProgressSink| {
            sink.terminal(state, Some(error.clone()));
            LogosPhaseResult {
                run_id: run_id.clone(),
                success: false,
                state,
                output_dir: output_dir.to_path_buf(),
                directions: None,
                assets_by_option: HashMap::new(),
                per_direction_status: HashMap::new(),
                directions_json: None,
                error: Some(error),
                elapsed_ms: sink.elapsed_ms(),
            }
        };

        if let Err(err) = brief.validate() {
            return fail(PhaseState::Failed, PipelineError::from(err).to_string(), sink);
        }
        if let Err(err) = tokio::fs::create_dir_all(output_dir).await {
            return fail(PhaseState::Failed, err.to_string(), sink);
        }

        // ── Research runs while the Director prompt is assembled ─────────
        sink.stage(PhaseState::Researching);
        let research_handle = {
            let stage = ResearchStage::new(
                Arc::clone(&self.ctx.text),
                self.config.research_timeout(),
            );
            let brief = brief.clone();
            tokio::spawn(async move { stage.run(&brief).await })
        };
        // Prompt assembly happens inside the Director; the join point below
        // is the (research OR timeout) barrier.
        let research: ResearchSummary = research_handle.await.unwrap_or_default();

        if cancel.is_cancelled() {
            return fail(PhaseState::Cancelled, "cancelled".to_string(), sink);
        }

        // ── Director ─────────────────────────────────────────────────────
        sink.stage(PhaseState::Directing);
        let director = Director::new(Arc::clone(&self.ctx.text));
        let directions = match (previous, feedback) {
            (Some(previous), Some(feedback)) => {
                director
                    .refine(
                        brief,
                        previous,
                        feedback,
                        only_options,
                        &research,
                        &brief.style_ref_images,
                    )
                    .await
            }
            _ => {
                director
                    .generate(brief, &research, &brief.style_ref_images)
                    .await
            }
        };
        let directions = match directions {
            Ok(directions) => directions,
            Err(err @ PipelineError::Cancelled) => {
                return fail(PhaseState::Cancelled, err.to_string(), sink)
            }
            Err(err) => return fail(PhaseState::Failed, err.to_string(), sink),
        };

        let directions_json = output_dir.join("directions.json");
        if let Err(err) = tokio::fs::write(
            &directions_json,
            serde_json::to_vec_pretty(&directions).unwrap_or_default(),
        )
        .await
        {
            return fail(PhaseState::Failed, err.to_string(), sink);
        }

        if cancel.is_cancelled() {
            return fail(PhaseState::Cancelled, "cancelled".to_string(), sink);
        }

        // ── Tags ─────────────────────────────────────────────────────────
        sink.stage(PhaseState::Tagging);
        let resolver = TagResolver::new(Arc::clone(&self.ctx.text));
        let tags = resolver.resolve(brief, &directions).await;

        if cancel.is_cancelled() {
            return fail(PhaseState::Cancelled, "cancelled".to_string(), sink);
        }

        // ── Logos ────────────────────────────────────────────────────────
        sink.stage(PhaseState::GeneratingLogos);
        let scope: BrandDirectionsOutput = match only_options {
            Some(options) => BrandDirectionsOutput {
                directions: directions
                    .directions
                    .iter()
                    .filter(|d| options.contains(&d.option_number))
                    .cloned()
                    .collect(),
            },
            None => directions.clone(),
        };
        let (assets_by_option, per_direction_status) = generate_logos(
            &self.ctx,
            brief,
            &scope,
            &tags,
            output_dir,
            self.config.max_logo_concurrency,
            sink,
            cancel,
        )
        .await;

        if cancel.is_cancelled() {
            let mut result = fail(PhaseState::Cancelled, "cancelled".to_string(), sink);
            result.directions = Some(directions);
            result.assets_by_option = assets_by_option;
            result.per_direction_status = per_direction_status;
            result.directions_json = Some(directions_json);
            return result;
        }

        let attempted = scope.directions.len();
        let succeeded = assets_by_option.len();
        let state = if succeeded == 0 {
            PhaseState::Failed
        } else if succeeded < attempted {
            PhaseState::DonePartial
        } else {
            PhaseState::Done
        };
        let error = if succeeded == 0 {
            Some("logo generation failed for every direction".to_string())
        } else {
            None
        };
        sink.terminal(state, error.clone());

        LogosPhaseResult {
            run_id: run_id.clone(),
            success: succeeded > 0,
            state,
            output_dir: output_dir.to_path_buf(),
            directions: Some(directions),
            assets_by_option,
            per_direction_status,
            directions_json: Some(directions_json),
            error,
            elapsed_ms: sink.elapsed_ms(),
        }
    }

    // ── Phase 2 ──────────────────────────────────────────────────────────

    /// Run the assets phase for one chosen direction inside an existing
    /// Phase-1 run directory.
    pub async fn run_assets_phase(
        &self,
        chosen_option: u8,
        output_dir: &Path,
        brief: &Brief,
        on_progress: Option<Arc<ProgressFn>>,
        cancel: &CancelFlag,
    ) -> AssetsPhaseResult {
        let sink = ProgressSink::new(on_progress);
        let run_id = new_run_id();
        let fail = |state: PhaseState, error: String, sink: &ProgressSink| {
            sink.terminal(state, Some(error.clone()));
            AssetsPhaseResult {
                run_id: run_id.clone(),
                success: false,
                state,
                output_dir: output_dir.to_path_buf(),
                assets: None,
                mockups: Vec::new(),
                mockup_status: Vec::new(),
                social_posts: Vec::new(),
                stylescape: None,
                error: Some(error),
                elapsed_ms: sink.elapsed_ms(),
            }
        };

        if let Err(err) = brief.validate() {
            return fail(PhaseState::Failed, PipelineError::from(err).to_string(), &sink);
        }
        let directions = match self.load_directions(output_dir).await {
            Ok(directions) => directions,
            Err(err) => return fail(PhaseState::Failed, err.to_string(), &sink),
        };
        let Some(direction) = directions.by_option(chosen_option).cloned() else {
            return fail(
                PhaseState::Failed,
                format!("option {chosen_option} not present in directions.json"),
                &sink,
            );
        };

        // ── Asset kit ────────────────────────────────────────────────────
        sink.stage(PhaseState::GeneratingAssets);
        let resolver = TagResolver::new(Arc::clone(&self.ctx.text));
        let tags = resolver.resolve(brief, &directions).await;
        let direction_tags = tags.get(&chosen_option).cloned().unwrap_or_default();

        let generator = AssetGenerator::new(self.ctx.clone());
        let assets = match generator
            .generate_full(brief, &direction, &direction_tags, output_dir, &sink, cancel)
            .await
        {
            Ok(assets) => assets,
            Err(PipelineError::Cancelled) => {
                return fail(PhaseState::Cancelled, "cancelled".to_string(), &sink)
            }
            Err(err) => return fail(PhaseState::Failed, err.to_string(), &sink),
        };

        // ── Mockups ──────────────────────────────────────────────────────
        sink.stage(PhaseState::CompositingMockups);
        let asset_dir = crate::assets::direction_dir(output_dir, &direction);
        let metas = load_metadata(&self.config.mockups_dir);
        let compositor = MockupCompositor::new(
            Arc::clone(&self.ctx.ladder),
            self.config.max_mockup_concurrency,
            self.config.mockup_item_timeout(),
        );
        let mockup_status = compositor
            .composite_all(
                &metas,
                &self.config.mockups_dir,
                &direction,
                &brief.brand_name,
                &assets,
                &asset_dir.join("mockups"),
                &sink,
                cancel,
            )
            .await;
        let mockups: Vec<PathBuf> = mockup_status
            .iter()
            .filter_map(|s| s.path.clone())
            .collect();

        if cancel.is_cancelled() {
            sink.terminal(PhaseState::Cancelled, None);
            return AssetsPhaseResult {
                run_id: run_id.clone(),
                success: false,
                state: PhaseState::Cancelled,
                output_dir: output_dir.to_path_buf(),
                assets: Some(assets),
                mockups,
                mockup_status,
                social_posts: Vec::new(),
                stylescape: None,
                error: Some("cancelled".to_string()),
                elapsed_ms: sink.elapsed_ms(),
            };
        }

        // ── Social posts ─────────────────────────────────────────────────
        sink.stage(PhaseState::ComposingSocial);
        let social = SocialCompositor::new(
            Arc::clone(&self.ctx.ladder),
            Arc::clone(&self.ctx.text),
        );
        let social_posts = social
            .generate_posts(brief, &direction, &assets, &asset_dir, &sink, cancel)
            .await;

        if cancel.is_cancelled() {
            sink.terminal(PhaseState::Cancelled, None);
            return AssetsPhaseResult {
                run_id: run_id.clone(),
                success: false,
                state: PhaseState::Cancelled,
                output_dir: output_dir.to_path_buf(),
                assets: Some(assets),
                mockups,
                mockup_status,
                social_posts,
                stylescape: None,
                error: Some("cancelled".to_string()),
                elapsed_ms: sink.elapsed_ms(),
            };
        }

        let degraded = assets.pattern.is_none()
            || assets.palette_png.is_none()
            || assets.shades_png.is_none()
            || mockup_status
                .iter()
                .any(|s| s.status == progress::ItemStatus::Failed);
        let state = if degraded {
            PhaseState::DonePartial
        } else {
            PhaseState::Done
        };
        sink.terminal(state, None);

        AssetsPhaseResult {
            run_id,
            success: true,
            state,
            output_dir: output_dir.to_path_buf(),
            assets: Some(assets),
            mockups,
            mockup_status,
            social_posts,
            stylescape: None,
            error: None,
            elapsed_ms: sink.elapsed_ms(),
        }
    }

    async fn load_directions(
        &self,
        output_dir: &Path,
    ) -> anyhow::Result<BrandDirectionsOutput> {
        let raw = tokio::fs::read(output_dir.join("directions.json")).await?;
        let directions: BrandDirectionsOutput = serde_json::from_slice(&raw)?;
        directions
            .validate()
            .map_err(|reason| anyhow::anyhow!("directions.json invalid: {reason}"))?;
        Ok(directions)
    }
}
