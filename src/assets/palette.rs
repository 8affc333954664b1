//! Palette enrichment and the deterministic palette board. Enrichment asks
//! the text model for human-readable names and hue families; when that call
//! fails the names are derived algorithmically from the hex values, so the
//! palette board always renders.

use super::glyph;
use crate::color::{self, HueFamily};
use crate::direction::{ColorSwatch, SwatchRole};
use crate::error::AssetError;
use crate::model::TextModel;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSwatch {
    pub hex: String,
    pub name: String,
    pub role: SwatchRole,
    pub hue_family: String,
}

fn lightness_adjective(l: f64) -> &'static str {
    if l > 0.85 {
        "Pale"
    } else if l > 0.65 {
        "Soft"
    } else if l > 0.45 {
        "Mid"
    } else if l > 0.25 {
        "Deep"
    } else {
        "Dark"
    }
}

/// Algorithmic name for a swatch, used when model enrichment is down.
fn descriptive_name(hex: &str) -> (String, String) {
    let Some(rgb) = color::parse_hex(hex) else {
        return ("Unnamed".to_string(), HueFamily::Neutral.name().to_string());
    };
    let family = color::hue_family(rgb);
    let l = color::rgb_to_oklch(rgb).l;
    let base = match family {
        HueFamily::Neutral => {
            if l > 0.9 {
                "White".to_string()
            } else if l < 0.15 {
                "Black".to_string()
            } else {
                "Gray".to_string()
            }
        }
        other => {
            let name = other.name();
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => name.to_string(),
            }
        }
    };
    (
        format!("{} {}", lightness_adjective(l), base),
        family.name().to_string(),
    )
}

pub fn fallback_enrich(colors: &[ColorSwatch]) -> Vec<EnrichedSwatch> {
    colors
        .iter()
        .map(|swatch| {
            let (name, hue_family) = descriptive_name(&swatch.hex);
            EnrichedSwatch {
                hex: swatch.hex.to_ascii_uppercase(),
                name: if swatch.name.trim().is_empty() {
                    name
                } else {
                    swatch.name.clone()
                },
                role: swatch.role,
                hue_family,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct EnrichmentRow {
    hex: String,
    name: String,
    hue_family: String,
}

/// Model-backed enrichment. The returned rows are matched back to the input
/// swatches by hex; any mismatch degrades that row to the fallback naming.
pub async fn enrich(text: &dyn TextModel, colors: &[ColorSwatch]) -> Vec<EnrichedSwatch> {
    let schema = json!({
        "type": "object",
        "properties": {
            "colors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "hex": {"type": "string", "pattern": "^#[0-9A-Fa-f]{6}$"},
                        "name": {"type": "string"},
                        "hue_family": {"type": "string", "enum": [
                            "red", "orange", "yellow", "green", "cyan", "blue",
                            "violet", "magenta", "neutral"
                        ]}
                    },
                    "required": ["hex", "name", "hue_family"]
                }
            }
        },
        "required": ["colors"]
    });
    let listing = colors
        .iter()
        .map(|c| format!("{} ({:?})", c.hex, c.role))
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "Palette: {listing}.\n\nFor each color, give an evocative two-word \
         name suitable for a brand guideline (e.g. 'Midnight Slate') and its \
         hue family. Keep the hex values exactly as given. Ensure the names \
         read as one coherent set."
    );

    let rows: Option<Vec<EnrichmentRow>> = match text.generate_json(None, &prompt, &schema).await {
        Ok(value) => value
            .get("colors")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok()),
        Err(err) => {
            tracing::warn!(error = %err, "palette enrichment failed, using algorithmic names");
            None
        }
    };

    let fallback = fallback_enrich(colors);
    let Some(rows) = rows else {
        return fallback;
    };

    colors
        .iter()
        .zip(fallback)
        .map(|(swatch, fallback_row)| {
            rows.iter()
                .find(|r| r.hex.eq_ignore_ascii_case(&swatch.hex))
                .map(|r| EnrichedSwatch {
                    hex: swatch.hex.to_ascii_uppercase(),
                    name: r.name.clone(),
                    role: swatch.role,
                    hue_family: r.hue_family.clone(),
                })
                .unwrap_or(fallback_row)
        })
        .collect()
}

// ─── Render ──────────────────────────────────────────────────────────────────

const BOARD_W: u32 = 1800;
const BOARD_H: u32 = 480;
const LABEL_BAND: u32 = 40;

/// Deterministic palette board: equal-width swatch columns with the hex code
/// labelled at the bottom of each.
pub fn render_palette_png(colors: &[EnrichedSwatch], path: &Path) -> Result<(), AssetError> {
    if colors.is_empty() {
        return Err(AssetError::Render("no colors to render".to_string()));
    }
    let mut img = RgbaImage::from_pixel(BOARD_W, BOARD_H, Rgba([255, 255, 255, 255]));
    let cols = colors.len() as u32;
    let col_w = BOARD_W / cols;

    for (i, swatch) in colors.iter().enumerate() {
        let rgb = color::parse_hex(&swatch.hex).unwrap_or([136, 136, 136]);
        let x0 = i as u32 * col_w;
        let x1 = if i as u32 == cols - 1 {
            BOARD_W
        } else {
            x0 + col_w
        };
        for y in 0..BOARD_H {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
        let label_color = if color::is_dark(rgb) {
            [255, 255, 255]
        } else {
            [20, 20, 20]
        };
        let hex = swatch.hex.to_ascii_uppercase();
        let lx = x0 + (x1 - x0).saturating_sub(glyph::text_width(&hex, 3)) / 2;
        glyph::draw_text(
            &mut img,
            lx,
            BOARD_H - LABEL_BAND,
            &hex,
            3,
            label_color,
        );
    }

    img.save(path).map_err(|e| AssetError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::test_fixtures;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EnrichText;

    #[async_trait]
    impl TextModel for EnrichText {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate_text(&self, _s: Option<&str>, _u: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _s: Option<&str>,
            _u: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            Ok(json!({"colors": [
                {"hex": "#2255DD", "name": "Harbor Blue", "hue_family": "blue"},
                {"hex": "#1B1B1F", "name": "Ink Well", "hue_family": "neutral"}
            ]}))
        }
    }

    struct DownText;

    #[async_trait]
    impl TextModel for DownText {
        fn name(&self) -> &str {
            "down"
        }

        async fn generate_text(&self, _s: Option<&str>, _u: &str) -> anyhow::Result<String> {
            anyhow::bail!("down")
        }

        async fn generate_json(
            &self,
            _s: Option<&str>,
            _u: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            anyhow::bail!("503 down")
        }
    }

    #[tokio::test]
    async fn enrichment_matches_rows_by_hex() {
        let colors = test_fixtures::swatches("#2255DD");
        let enriched = enrich(&EnrichText, &colors).await;
        assert_eq!(enriched[0].name, "Harbor Blue");
        assert_eq!(enriched[0].hue_family, "blue");
        // Unmatched rows keep the fallback naming but stay in input order.
        assert_eq!(enriched[2].hex, "#F4F2EC");
        assert_eq!(enriched.len(), colors.len());
    }

    #[tokio::test]
    async fn enrichment_failure_degrades_to_algorithmic_names() {
        let colors = test_fixtures::swatches("#2255DD");
        let enriched = enrich(&DownText, &colors).await;
        assert_eq!(enriched.len(), colors.len());
        assert_eq!(enriched[0].hue_family, "blue");
    }

    #[test]
    fn descriptive_names_cover_neutrals_and_hues() {
        let (white_name, white_family) = descriptive_name("#FAFAFA");
        assert!(white_name.contains("White"));
        assert_eq!(white_family, "neutral");
        let (blue_name, blue_family) = descriptive_name("#2255DD");
        assert!(blue_name.contains("Blue"));
        assert_eq!(blue_family, "blue");
    }

    #[test]
    fn render_writes_board() {
        let tmp = tempfile::tempdir().unwrap();
        let colors = fallback_enrich(&test_fixtures::swatches("#2255DD"));
        let path = tmp.path().join("palette.png");
        render_palette_png(&colors, &path).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), BOARD_W);
        // First column carries the primary color.
        assert_eq!(img.get_pixel(10, 10)[2], 0xDD);
    }
}
