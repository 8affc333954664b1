//! Style-DNA: concrete visual attributes extracted once per user-supplied
//! reference image and cached on disk by content hash, so the four
//! directions in a run share a single vision call per image. Extraction
//! failures degrade to "no DNA"; the pipeline never aborts over a
//! reference image.

use crate::model::{ImageRef, VisionModel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DnaStrokeWeight {
    Hairline,
    Thin,
    Medium,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerTreatment {
    Sharp,
    Rounded,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeVocabulary {
    Geometric,
    Organic,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderingMedium {
    CleanDigitalVector,
    Textured,
    HandDrawn,
    Photographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DnaFillStyle {
    SolidFill,
    OutlineOnly,
    Gradient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDna {
    pub stroke_weight: DnaStrokeWeight,
    pub corner_treatment: CornerTreatment,
    pub shape_vocabulary: ShapeVocabulary,
    pub rendering_medium: RenderingMedium,
    /// 1 = single simple shape, 5 = complex multi-element illustration.
    pub complexity: u8,
    pub fill_style: DnaFillStyle,
    /// Attributes explicitly absent from the reference.
    #[serde(default)]
    pub not_present: Vec<String>,
}

impl StyleDna {
    /// Render the hard-constraint clause injected into downstream prompts.
    pub fn to_constraints(&self) -> String {
        let stroke = match self.stroke_weight {
            DnaStrokeWeight::Hairline => "hairline",
            DnaStrokeWeight::Thin => "thin",
            DnaStrokeWeight::Medium => "medium",
            DnaStrokeWeight::Bold => "bold",
        };
        let corners = match self.corner_treatment {
            CornerTreatment::Sharp => "sharp",
            CornerTreatment::Rounded => "rounded",
            CornerTreatment::Mixed => "mixed",
        };
        let shapes = match self.shape_vocabulary {
            ShapeVocabulary::Geometric => "geometric",
            ShapeVocabulary::Organic => "organic",
            ShapeVocabulary::Hybrid => "hybrid",
        };
        let medium = match self.rendering_medium {
            RenderingMedium::CleanDigitalVector => "clean digital vector",
            RenderingMedium::Textured => "textured",
            RenderingMedium::HandDrawn => "hand drawn",
            RenderingMedium::Photographic => "photographic",
        };
        let fill = match self.fill_style {
            DnaFillStyle::SolidFill => "solid fill",
            DnaFillStyle::OutlineOnly => "outline only",
            DnaFillStyle::Gradient => "gradient fill",
        };
        let complexity = match self.complexity {
            1 => "ultra-minimal single shape",
            2 => "simple mark",
            3 => "moderate detail",
            4 => "detailed composition",
            _ => "complex multi-element illustration",
        };
        let mut out = format!(
            "MUST MATCH: {stroke} stroke weight, {corners} corners, {shapes} shapes, \
             {medium} rendering, {fill}, {complexity}"
        );
        for absent in self.not_present.iter().take(8) {
            out.push_str(&format!(", no {absent}"));
        }
        out
    }

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "stroke_weight": {"type": "string", "enum": ["hairline", "thin", "medium", "bold"]},
                "corner_treatment": {"type": "string", "enum": ["sharp", "rounded", "mixed"]},
                "shape_vocabulary": {"type": "string", "enum": ["geometric", "organic", "hybrid"]},
                "rendering_medium": {"type": "string", "enum": [
                    "clean-digital-vector", "textured", "hand-drawn", "photographic"
                ]},
                "complexity": {"type": "integer", "minimum": 1, "maximum": 5},
                "fill_style": {"type": "string", "enum": ["solid-fill", "outline-only", "gradient"]},
                "not_present": {"type": "array", "items": {"type": "string"}}
            },
            "required": [
                "stroke_weight", "corner_treatment", "shape_vocabulary",
                "rendering_medium", "complexity", "fill_style", "not_present"
            ]
        })
    }
}

const EXTRACT_PROMPT: &str = "\
Analyze this logo/brand-mark reference image. Extract ONLY the technical \
visual rendering attributes: stroke weight, corner treatment, shape \
vocabulary, rendering medium, complexity (1 = single simple shape, 5 = \
complex multi-element illustration), fill style, and a list of attributes \
explicitly NOT present (e.g. gradients, shadows, 3D effects, textures). \
Return JSON matching the schema exactly.";

/// Extractor with an on-disk cache keyed by the sha256 of the image bytes.
/// Content hashing keeps cache entries from leaking across brands or runs
/// with unrelated files at the same path.
pub struct StyleDnaExtractor {
    vision: Arc<dyn VisionModel>,
    cache_dir: PathBuf,
}

impl StyleDnaExtractor {
    pub fn new(vision: Arc<dyn VisionModel>, cache_dir: PathBuf) -> Self {
        Self { vision, cache_dir }
    }

    /// Extract the DNA for one reference image, consulting the cache first.
    /// Any failure degrades to `None`.
    pub async fn extract(&self, image_path: &Path) -> Option<StyleDna> {
        let bytes = match tokio::fs::read(image_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %image_path.display(), error = %err, "style ref unreadable");
                return None;
            }
        };
        let digest = Sha256::digest(&bytes);
        let cache_path = self.cache_dir.join(format!("{digest:x}.json"));

        if let Ok(cached) = tokio::fs::read(&cache_path).await {
            if let Ok(dna) = serde_json::from_slice::<StyleDna>(&cached) {
                tracing::debug!(path = %image_path.display(), "style DNA cache hit");
                return Some(dna);
            }
        }

        let value = match self
            .vision
            .analyze_json(
                EXTRACT_PROMPT,
                &[ImageRef {
                    label: String::new(),
                    path: image_path.to_path_buf(),
                }],
                &StyleDna::schema(),
            )
            .await
        {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(path = %image_path.display(), error = %err, "style DNA extraction failed");
                return None;
            }
        };

        let dna: StyleDna = match serde_json::from_value(value) {
            Ok(dna) => dna,
            Err(err) => {
                tracing::warn!(error = %err, "style DNA output did not match schema");
                return None;
            }
        };

        if tokio::fs::create_dir_all(&self.cache_dir).await.is_ok() {
            if let Ok(encoded) = serde_json::to_vec_pretty(&dna) {
                let _ = tokio::fs::write(&cache_path, encoded).await;
            }
        }
        tracing::info!(
            path = %image_path.display(),
            stroke = ?dna.stroke_weight,
            shapes = ?dna.shape_vocabulary,
            "style DNA extracted"
        );
        Some(dna)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingVision {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VisionModel for CountingVision {
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

    struct FailingVision;

    #[async_trait]
    impl VisionModel for FailingVision {
        fn name(&self) -> &str {
            "failing-vision"
        }

        async fn analyze_json(
            &self,
            _prompt: &str,
            _images: &[ImageRef],
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            anyhow::bail!("vision backend down")
        }
    }

    #[tokio::test]
    async fn second_extraction_hits_cache_without_vision_call() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("ref.png");
        std::fs::write(&image, b"fake-image-bytes").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = StyleDnaExtractor::new(
            Arc::new(CountingVision {
                calls: Arc::clone(&calls),
            }),
            tmp.path().join("cache"),
        );

        let first = extractor.extract(&image).await.unwrap();
        let second = extractor.extract(&image).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Cached record is byte-stable on disk.
        let digest = Sha256::digest(b"fake-image-bytes");
        let cached = std::fs::read(tmp.path().join("cache").join(format!("{digest:x}.json"))).unwrap();
        let reread: StyleDna = serde_json::from_slice(&cached).unwrap();
        assert_eq!(reread, first);
    }

    #[tokio::test]
    async fn extraction_failure_degrades_to_none() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("ref.png");
        std::fs::write(&image, b"bytes").unwrap();
        let extractor =
            StyleDnaExtractor::new(Arc::new(FailingVision), tmp.path().join("cache"));
        assert!(extractor.extract(&image).await.is_none());
    }

    #[tokio::test]
    async fn missing_image_degrades_to_none() {
        let tmp = tempfile::tempdir().unwrap();
        let extractor = StyleDnaExtractor::new(
            Arc::new(CountingVision {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            tmp.path().join("cache"),
        );
        assert!(extractor.extract(&tmp.path().join("missing.png")).await.is_none());
    }

    #[test]
    fn constraints_mention_every_attribute() {
        let dna = StyleDna {
            stroke_weight: DnaStrokeWeight::Medium,
            corner_treatment: CornerTreatment::Sharp,
            shape_vocabulary: ShapeVocabulary::Geometric,
            rendering_medium: RenderingMedium::CleanDigitalVector,
            complexity: 2,
            fill_style: DnaFillStyle::SolidFill,
            not_present: vec!["gradients".to_string()],
        };
        let text = dna.to_constraints();
        assert!(text.starts_with("MUST MATCH:"));
        assert!(text.contains("medium stroke weight"));
        assert!(text.contains("sharp corners"));
        assert!(text.contains("geometric shapes"));
        assert!(text.contains("no gradients"));
    }
}
