//! Shared mock models for the pipeline integration tests. The mocks route
//! on the JSON schema each stage supplies, record every prompt they see,
//! and return canned payloads so the full two-phase flow runs offline.

use async_trait::async_trait;
use brandforge::model::{ImageModel, ImagePrompt, ImageRef, TextModel, VisionModel};
use brandforge::runner::progress::CancelFlag;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Direction fixtures ──────────────────────────────────────────────────────

pub fn direction_value(
    option_number: u8,
    option_type: &str,
    name: &str,
    primary_hex: &str,
    logo_type: &str,
    form: &str,
    metaphor: &str,
) -> Value {
    json!({
        "option_number": option_number,
        "option_type": option_type,
        "direction_name": name,
        "rationale": format!("{name} balances recognition and surprise for this market."),
        "colors": [
            {"hex": primary_hex, "role": "primary", "name": "Primary"},
            {"hex": "#1B1B1F", "role": "neutral-dark", "name": "Ink"},
            {"hex": "#F4F2EC", "role": "neutral-light", "name": "Bone"},
            {"hex": "#C8742B", "role": "accent", "name": "Ember"}
        ],
        "typography_primary": "Geometric sans with tight tracking",
        "typography_secondary": "Humanist sans for body copy",
        "graphic_style": "Flat, restrained, modular shapes with generous whitespace.",
        "logo_spec": {
            "logo_type": logo_type,
            "form": form,
            "composition": "centered, generous padding, white background",
            "color_hex": primary_hex,
            "fill_style": "solid_fill",
            "stroke_weight": "medium",
            "typography_treatment": if logo_type == "logotype" {
                "condensed geometric sans, all-caps, extra-bold"
            } else {
                "N/A"
            },
            "render_style": "clean flat vector",
            "metaphor": metaphor,
            "avoid": ["gradient", "drop shadow"]
        },
        "pattern_spec": {
            "motif": "offset diamond lattice",
            "density_scale": "tight lattice with even gutters",
            "primary_color_hex": primary_hex,
            "secondary_color_hex": "none",
            "background_color_hex": "#F4F2EC",
            "opacity_notes": "solid",
            "render_style": "flat vector seamless tile",
            "mood": "precise, calm",
            "avoid": ["text", "logos"]
        },
        "background_spec": {
            "scene_type": "abstract_field",
            "description": "soft layered color field with a slow diagonal drift",
            "primary_color_hex": primary_hex,
            "accent_color_hex": "none",
            "lighting": "diffuse, directionless",
            "composition": "wide 16:9, no focal subject",
            "texture": "smooth digital",
            "mood": "quiet confidence",
            "avoid": ["text", "logos"]
        },
        "tagline": format!("Tagline for {name}."),
        "ad_slogan": format!("Move with {name}."),
        "announcement_copy": format!("{name} is here. Something new starts today.")
    })
}

/// Four valid, divergent directions.
pub fn directions_value() -> Value {
    json!({
        "directions": [
            direction_value(1, "Market-Aligned", "Harbor Signal", "#2255DD", "symbol",
                "two concentric arcs open at the lower left", "signal emerging from stillness"),
            direction_value(2, "Designer-Led", "Quiet Meridian", "#1E9E3C", "logotype",
                "brand name in condensed sans, perfectly even baseline", "typographic confidence"),
            direction_value(3, "Hybrid", "Foundry Line", "#D62718", "lettermark",
                "uppercase initial with a split counter", "craft meeting precision"),
            direction_value(4, "Wild-Card", "Night Terrain", "#5B2A86", "abstract_mark",
                "interrupted contour lines forming an open field", "the map nobody drew")
        ]
    })
}

// ─── Text model ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TextCalls {
    pub research: AtomicUsize,
    pub director: AtomicUsize,
    pub tags: AtomicUsize,
    pub palette: AtomicUsize,
    pub copy: AtomicUsize,
}

pub struct MockText {
    pub directions: Value,
    /// Returned instead of `directions` when the prompt carries a
    /// refinement request.
    pub refined: Option<Value>,
    pub research_delay: Duration,
    pub calls: TextCalls,
    pub director_prompts: Mutex<Vec<String>>,
}

impl MockText {
    pub fn new(directions: Value) -> Self {
        Self {
            directions,
            refined: None,
            research_delay: Duration::from_millis(0),
            calls: TextCalls::default(),
            director_prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextModel for MockText {
    fn name(&self) -> &str {
        "mock-text"
    }

    async fn generate_text(&self, _system: Option<&str>, _user: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn generate_json(
        &self,
        _system: Option<&str>,
        user: &str,
        schema: &Value,
    ) -> anyhow::Result<Value> {
        let properties = schema.get("properties").cloned().unwrap_or(json!({}));
        if properties.get("positioning").is_some() {
            self.calls.research.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.research_delay).await;
            return Ok(json!({
                "positioning": "category leaders compete on reliability claims",
                "design_language": "deep blues, geometric sans, dense data imagery",
                "common_tropes": "arrows, globes, network meshes"
            }));
        }
        if properties.get("directions").is_some() {
            self.calls.director.fetch_add(1, Ordering::SeqCst);
            self.director_prompts.lock().unwrap().push(user.to_string());
            if user.contains("## REFINEMENT REQUEST") {
                if let Some(refined) = &self.refined {
                    return Ok(refined.clone());
                }
            }
            return Ok(self.directions.clone());
        }
        if properties.get("colors").is_some() {
            self.calls.palette.fetch_add(1, Ordering::SeqCst);
            return Ok(json!({"colors": []}));
        }
        if properties.get("copy").is_some() {
            self.calls.copy.fetch_add(1, Ordering::SeqCst);
            return Ok(json!({"copy": "Generated fallback copy."}));
        }
        // Tag schema: numeric keys in `required`.
        self.calls.tags.fetch_add(1, Ordering::SeqCst);
        let mut out = serde_json::Map::new();
        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for key in required {
                if let Some(key) = key.as_str() {
                    out.insert(
                        key.to_string(),
                        json!(["minimal", "geometric", "confident", "modern", "premium", "bold"]),
                    );
                }
            }
        }
        Ok(Value::Object(out))
    }
}

// ─── Vision model ────────────────────────────────────────────────────────────

pub struct MockVision {
    pub calls: AtomicUsize,
}

impl MockVision {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VisionModel for MockVision {
    fn name(&self) -> &str {
        "mock-vision"
    }

    async fn analyze_json(
        &self,
        _prompt: &str,
        _images: &[ImageRef],
        _schema: &Value,
    ) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "stroke_weight": "medium",
            "corner_treatment": "sharp",
            "shape_vocabulary": "geometric",
            "rendering_medium": "clean-digital-vector",
            "complexity": 2,
            "fill_style": "solid-fill",
            "not_present": ["gradients", "drop shadows"]
        }))
    }
}

// ─── Image model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedImageCall {
    pub text: String,
    pub attachments: Vec<PathBuf>,
}

pub struct MockImage {
    /// Calls whose prompt contains this marker fail non-transiently.
    pub fail_marker: Option<String>,
    pub png: Vec<u8>,
    pub recorded: Arc<Mutex<Vec<RecordedImageCall>>>,
    /// Cancel the flag after N successful mockup-reconstruction calls.
    pub cancel_after_mockups: Option<(CancelFlag, usize)>,
    mockup_calls: AtomicUsize,
}

/// A small but realistic PNG (well over 100 bytes once encoded).
pub fn sample_png() -> Vec<u8> {
    let mut img = image::RgbaImage::new(64, 64);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgba([(x * 4) as u8, (y * 4) as u8, 200, 255]);
    }
    let mut buf = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buf),
        image::ImageFormat::Png,
    )
    .unwrap();
    buf
}

impl MockImage {
    pub fn new() -> Self {
        Self {
            fail_marker: None,
            png: sample_png(),
            recorded: Arc::new(Mutex::new(Vec::new())),
            cancel_after_mockups: None,
            mockup_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::new()
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedImageCall> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageModel for MockImage {
    fn name(&self) -> &str {
        "mock-image"
    }

    async fn generate_image(&self, prompt: &ImagePrompt) -> anyhow::Result<Vec<u8>> {
        self.recorded.lock().unwrap().push(RecordedImageCall {
            text: prompt.text.clone(),
            attachments: prompt.attachments.iter().map(|a| a.path.clone()).collect(),
        });
        if let Some(marker) = &self.fail_marker {
            if prompt.text.contains(marker.as_str()) {
                anyhow::bail!("400 Bad Request");
            }
        }
        if prompt.text.contains("mockup renderer") {
            let done = self.mockup_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((cancel, after)) = &self.cancel_after_mockups {
                if done >= *after {
                    cancel.cancel();
                }
            }
        }
        Ok(self.png.clone())
    }
}

// ─── Environment helpers ─────────────────────────────────────────────────────

/// Write a mockup library with one dark and one light mockup, plus their
/// original photos.
pub fn write_mockup_library(root: &std::path::Path) -> PathBuf {
    let dir = root.join("mockups");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("tote_bag_processed.jpg"), sample_png()).unwrap();
    std::fs::write(dir.join("name_card_processed.jpg"), sample_png()).unwrap();
    let metadata = json!([
        {
            "name": "tote_bag_processed",
            "original": "tote_bag_processed.jpg",
            "darkness": "dark",
            "zones": [{"kind": "logo", "description": "front panel, centered"}],
            "scene": "natural canvas tote bag, logo screen-printed on the front panel",
            "logo_placement": "centered on the bag face",
            "logo_color": "white on dark fabric",
            "logo_size": "large, 75% of the zone",
            "material": "screen-print on canvas",
            "style": "eco merchandise, photorealistic"
        },
        {
            "name": "name_card_processed",
            "original": "name_card_processed.jpg",
            "darkness": "light",
            "zones": [{"kind": "logo", "description": "front face of business card, rotated 3 degrees"}],
            "scene": "luxury two-sided business card on a desk",
            "logo_placement": "centered on the white face",
            "logo_color": "dark on white",
            "logo_size": "40% of the face",
            "material": "letterpress on thick stock",
            "style": "premium print, photorealistic"
        }
    ]);
    std::fs::write(
        dir.join("metadata.json"),
        serde_json::to_vec_pretty(&metadata).unwrap(),
    )
    .unwrap();
    dir
}
