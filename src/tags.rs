//! Taxonomy-tag resolution. One batched structured call covers all four
//! directions; a batch failure degrades to four parallel per-direction
//! calls; an individual failure falls back to keywords derived from the
//! direction itself merged with the brief keywords.

use crate::brief::Brief;
use crate::color;
use crate::direction::{BrandDirection, BrandDirectionsOutput};
use crate::model::TextModel;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const INDUSTRY_TAGS: &[&str] = &[
    "tech", "saas", "fintech", "crypto", "web3", "healthcare", "ecommerce", "education",
    "real-estate", "food", "beverage", "fashion", "automotive", "media", "consulting",
    "startup", "enterprise", "creative", "nonprofit", "gaming",
];

pub const STYLE_TAGS: &[&str] = &[
    "geometric", "organic", "monoline", "filled", "minimal", "detailed", "flat", "gradient",
    "sharp", "rounded", "retro", "modern", "classic", "brutalist", "elegant", "playful",
];

pub const MOOD_TAGS: &[&str] = &[
    "confident", "calm", "bold", "serious", "premium", "accessible", "warm", "cold", "edgy",
    "trustworthy", "innovative", "powerful", "friendly", "mysterious", "dynamic", "futuristic",
];

pub const TECHNIQUE_TAGS: &[&str] = &[
    "negative space", "grid construction", "symmetry", "asymmetry", "modularity",
];

fn taxonomy_block() -> String {
    format!(
        "Industries: {}\nVisual styles: {}\nMoods: {}\nTechniques: {}",
        INDUSTRY_TAGS.join(", "),
        STYLE_TAGS.join(", "),
        MOOD_TAGS.join(", "),
        TECHNIQUE_TAGS.join(", ")
    )
}

fn in_taxonomy(tag: &str) -> bool {
    INDUSTRY_TAGS.contains(&tag)
        || STYLE_TAGS.contains(&tag)
        || MOOD_TAGS.contains(&tag)
        || TECHNIQUE_TAGS.contains(&tag)
}

/// Dedup while preserving first-seen order, clamped to 12 entries.
fn dedup_clamp(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .take(12)
        .collect()
}

/// Deterministic fallback: style-ish words mined from the direction record
/// merged with the brief keywords. Used when every model path is down.
pub fn fallback_tags(direction: &BrandDirection, brief: &Brief) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let haystack = format!(
        "{} {} {}",
        direction.graphic_style, direction.typography_primary, direction.rationale
    )
    .to_ascii_lowercase();
    for candidate in STYLE_TAGS.iter().chain(MOOD_TAGS).chain(TECHNIQUE_TAGS) {
        if haystack.contains(candidate) {
            tags.push((*candidate).to_string());
        }
    }
    if let Some(family) = direction
        .primary_hex()
        .and_then(color::parse_hex)
        .map(color::hue_family)
    {
        tags.push(family.name().to_string());
    }
    tags.extend(brief.keywords.iter().cloned());
    dedup_clamp(tags)
}

fn direction_context(direction: &BrandDirection) -> String {
    let colors = direction
        .colors
        .iter()
        .take(3)
        .map(|c| format!("{} ({:?})", c.hex, c.role))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Direction {}: {}\n  Rationale: {:.200}\n  Graphic style: {:.150}\n  Typography: {}\n  Colors: {}",
        direction.option_number,
        direction.direction_name,
        direction.rationale,
        direction.graphic_style,
        direction.typography_primary,
        colors
    )
}

fn tags_schema(option_numbers: &[u8]) -> Value {
    let mut properties = serde_json::Map::new();
    for n in option_numbers {
        properties.insert(
            n.to_string(),
            json!({"type": "array", "minItems": 6, "maxItems": 12, "items": {"type": "string"}}),
        );
    }
    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": option_numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>()
    })
}

pub struct TagResolver {
    text: Arc<dyn TextModel>,
}

impl TagResolver {
    pub fn new(text: Arc<dyn TextModel>) -> Self {
        Self { text }
    }

    /// Resolve tags for all four directions. Never fails; every degradation
    /// path lands on `fallback_tags`.
    pub async fn resolve(
        &self,
        brief: &Brief,
        output: &BrandDirectionsOutput,
    ) -> HashMap<u8, Vec<String>> {
        match self.resolve_batched(brief, output).await {
            Some(map) => map,
            None => {
                tracing::warn!("batched tag extraction failed, issuing per-direction calls");
                self.resolve_each(brief, output).await
            }
        }
    }

    async fn resolve_batched(
        &self,
        brief: &Brief,
        output: &BrandDirectionsOutput,
    ) -> Option<HashMap<u8, Vec<String>>> {
        let numbers: Vec<u8> = output.directions.iter().map(|d| d.option_number).collect();
        let blocks = output
            .directions
            .iter()
            .map(direction_context)
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Brand: {}\nKeywords: {}\n\n{}\n\nFor EACH direction above, extract 6-12 lowercase \
             tags describing its visual identity, drawn only from these taxonomies:\n{}\n\n\
             Return a JSON object keyed by direction number.",
            brief.brand_name,
            brief.keyword_line(),
            blocks,
            taxonomy_block()
        );

        let value = self
            .text
            .generate_json(None, &prompt, &tags_schema(&numbers))
            .await
            .ok()?;
        let parsed: HashMap<String, Vec<String>> = serde_json::from_value(value).ok()?;

        let mut map = HashMap::new();
        for direction in &output.directions {
            let tags = parsed
                .get(&direction.option_number.to_string())
                .map(|raw| self.sanitize(raw, brief))
                .unwrap_or_default();
            if tags.len() < 3 {
                return None;
            }
            map.insert(direction.option_number, tags);
        }
        tracing::info!(
            total = map.values().map(Vec::len).sum::<usize>(),
            "batch tags resolved in one call"
        );
        Some(map)
    }

    async fn resolve_each(
        &self,
        brief: &Brief,
        output: &BrandDirectionsOutput,
    ) -> HashMap<u8, Vec<String>> {
        let futures = output.directions.iter().map(|direction| async {
            let tags = self.resolve_one(brief, direction).await;
            (direction.option_number, tags)
        });
        futures_util::future::join_all(futures).await.into_iter().collect()
    }

    async fn resolve_one(&self, brief: &Brief, direction: &BrandDirection) -> Vec<String> {
        let numbers = [direction.option_number];
        let prompt = format!(
            "Brand: {}\nKeywords: {}\n\n{}\n\nExtract 6-12 lowercase tags describing this \
             direction's visual identity, drawn only from these taxonomies:\n{}\n\n\
             Return a JSON object keyed by the direction number.",
            brief.brand_name,
            brief.keyword_line(),
            direction_context(direction),
            taxonomy_block()
        );
        let result = self
            .text
            .generate_json(None, &prompt, &tags_schema(&numbers))
            .await
            .ok()
            .and_then(|value| {
                serde_json::from_value::<HashMap<String, Vec<String>>>(value).ok()
            })
            .and_then(|m| m.get(&direction.option_number.to_string()).cloned());

        match result {
            Some(raw) => {
                let tags = self.sanitize(&raw, brief);
                if tags.len() >= 3 {
                    tags
                } else {
                    fallback_tags(direction, brief)
                }
            }
            None => {
                tracing::warn!(
                    option = direction.option_number,
                    "per-direction tag call failed, using keyword fallback"
                );
                fallback_tags(direction, brief)
            }
        }
    }

    /// Keep taxonomy members and brief keywords, drop hallucinated tokens,
    /// and merge the brief keywords so reference lookup always has the
    /// user's own vocabulary available.
    fn sanitize(&self, raw: &[String], brief: &Brief) -> Vec<String> {
        let mut tags: Vec<String> = raw
            .iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| in_taxonomy(t) || brief.keywords.iter().any(|k| k.eq_ignore_ascii_case(t)))
            .collect();
        tags.extend(brief.keywords.iter().cloned());
        dedup_clamp(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::test_fixtures;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BatchText {
        calls: Arc<AtomicUsize>,
        fail_batch: bool,
    }

    #[async_trait]
    impl TextModel for BatchText {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate_text(&self, _s: Option<&str>, _u: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _s: Option<&str>,
            user: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let batched = user.contains("Direction 1:") && user.contains("Direction 4:");
            if batched && self.fail_batch {
                anyhow::bail!("503 batch unavailable");
            }
            let tags = json!(["minimal", "geometric", "confident", "modern", "premium", "bold"]);
            if batched {
                Ok(json!({"1": tags, "2": tags, "3": tags, "4": tags}))
            } else {
                // Per-direction prompt carries a single direction block.
                for n in 1..=4u8 {
                    if user.contains(&format!("Direction {n}:")) {
                        return Ok(json!({n.to_string(): tags}));
                    }
                }
                anyhow::bail!("no direction block found")
            }
        }
    }

    fn brief() -> Brief {
        Brief {
            brand_name: "NuRange".to_string(),
            keywords: vec!["predictive".into(), "signal".into()],
            ..Brief::default()
        }
    }

    #[tokio::test]
    async fn batch_path_uses_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = TagResolver::new(Arc::new(BatchText {
            calls: Arc::clone(&calls),
            fail_batch: false,
        }));
        let map = resolver.resolve(&brief(), &test_fixtures::directions()).await;
        assert_eq!(map.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for tags in map.values() {
            assert!(tags.contains(&"minimal".to_string()));
            assert!(tags.contains(&"predictive".to_string()));
        }
    }

    #[tokio::test]
    async fn batch_failure_degrades_to_per_direction_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = TagResolver::new(Arc::new(BatchText {
            calls: Arc::clone(&calls),
            fail_batch: true,
        }));
        let map = resolver.resolve(&brief(), &test_fixtures::directions()).await;
        assert_eq!(map.len(), 4);
        // 1 failed batch call + 4 per-direction calls.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn batched_and_fallback_paths_agree_on_tag_sets() {
        let batched = TagResolver::new(Arc::new(BatchText {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_batch: false,
        }));
        let degraded = TagResolver::new(Arc::new(BatchText {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_batch: true,
        }));
        let directions = test_fixtures::directions();
        let a = batched.resolve(&brief(), &directions).await;
        let b = degraded.resolve(&brief(), &directions).await;
        for n in 1..=4u8 {
            let set_a: std::collections::HashSet<_> = a[&n].iter().collect();
            let set_b: std::collections::HashSet<_> = b[&n].iter().collect();
            assert_eq!(set_a, set_b, "option {n}");
        }
    }

    #[test]
    fn fallback_tags_mine_direction_and_brief() {
        let directions = test_fixtures::directions();
        let tags = fallback_tags(&directions.directions[0], &brief());
        assert!(tags.contains(&"predictive".to_string()));
        assert!(tags.len() <= 12);
        // Style words present in the fixture's graphic_style.
        assert!(tags.iter().any(|t| t == "flat" || t == "modular" || t == "blue"));
    }

    #[test]
    fn sanitize_drops_out_of_taxonomy_tokens() {
        let resolver = TagResolver::new(Arc::new(BatchText {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_batch: false,
        }));
        let tags = resolver.sanitize(
            &[
                "minimal".to_string(),
                "made-up-tag".to_string(),
                "GEOMETRIC".to_string(),
            ],
            &brief(),
        );
        assert!(tags.contains(&"minimal".to_string()));
        assert!(tags.contains(&"geometric".to_string()));
        assert!(!tags.contains(&"made-up-tag".to_string()));
    }
}
