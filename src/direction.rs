//! Stage records for the Director output: render specs, swatches, and the
//! four-direction bundle with its structural invariants. Records are
//! validated at construction boundaries and never mutated afterward (the one
//! exception, locked-copy stamping, happens inside the Director before the
//! record is published downstream).

use crate::brief::LockedCopy;
use crate::color::{self, HueFamily};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

// ─── Swatches ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwatchRole {
    Primary,
    Secondary,
    Accent,
    NeutralDark,
    NeutralLight,
    Support,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSwatch {
    /// `#RRGGBB`.
    pub hex: String,
    pub role: SwatchRole,
    /// Descriptive name, e.g. "Midnight Slate".
    pub name: String,
}

impl ColorSwatch {
    pub fn rgb(&self) -> Option<[u8; 3]> {
        color::parse_hex(&self.hex)
    }
}

// ─── Render specs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoType {
    Symbol,
    AbstractMark,
    Lettermark,
    Logotype,
    Combination,
}

impl LogoType {
    /// Whether rendered text is allowed in the mark.
    pub fn text_allowed(self) -> bool {
        matches!(self, Self::Logotype | Self::Combination)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::AbstractMark => "abstract mark",
            Self::Lettermark => "lettermark",
            Self::Logotype => "logotype",
            Self::Combination => "combination",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStyle {
    SolidFill,
    OutlineOnly,
    FillWithOutlineDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeWeight {
    Hairline,
    Thin,
    Medium,
    Bold,
}

impl StrokeWeight {
    pub fn label(self) -> &'static str {
        match self {
            Self::Hairline => "hairline",
            Self::Thin => "thin",
            Self::Medium => "medium",
            Self::Bold => "bold",
        }
    }
}

/// Render specification for the logo mark: a contract for the image stage,
/// not an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoSpec {
    pub logo_type: LogoType,
    /// One-sentence shape / metaphor description.
    pub form: String,
    /// Positioning and padding rules.
    pub composition: String,
    /// Exact hex for single-color rendering.
    pub color_hex: String,
    pub fill_style: FillStyle,
    pub stroke_weight: StrokeWeight,
    pub typography_treatment: String,
    pub render_style: String,
    pub metaphor: String,
    /// Industry-specific clichés to exclude.
    #[serde(default)]
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub motif: String,
    pub density_scale: String,
    pub primary_color_hex: String,
    #[serde(default)]
    pub secondary_color_hex: String,
    pub background_color_hex: String,
    #[serde(default)]
    pub opacity_notes: String,
    pub render_style: String,
    pub mood: String,
    #[serde(default)]
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    EnvironmentalPhoto,
    AbstractField,
    MacroTexture,
    DigitalArt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSpec {
    pub scene_type: SceneType,
    pub description: String,
    pub primary_color_hex: String,
    #[serde(default)]
    pub accent_color_hex: String,
    pub lighting: String,
    pub composition: String,
    #[serde(default)]
    pub texture: String,
    pub mood: String,
    #[serde(default)]
    pub avoid: Vec<String>,
}

// ─── Directions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "Market-Aligned")]
    MarketAligned,
    #[serde(rename = "Designer-Led")]
    DesignerLed,
    #[serde(rename = "Hybrid")]
    Hybrid,
    #[serde(rename = "Wild-Card", alias = "Wild Card")]
    WildCard,
}

impl OptionType {
    /// The fixed `option_number → option_type` mapping.
    pub fn for_option(option_number: u8) -> Option<Self> {
        match option_number {
            1 => Some(Self::MarketAligned),
            2 => Some(Self::DesignerLed),
            3 => Some(Self::Hybrid),
            4 => Some(Self::WildCard),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MarketAligned => "Market-Aligned",
            Self::DesignerLed => "Designer-Led",
            Self::Hybrid => "Hybrid",
            Self::WildCard => "Wild-Card",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandDirection {
    /// 1..4, stable within a run.
    pub option_number: u8,
    pub option_type: OptionType,
    /// Short proper-noun-style label, e.g. "Signal & Silence".
    pub direction_name: String,
    /// 1–3 sentence strategic justification.
    pub rationale: String,
    /// 4–6 swatches covering at least primary / neutral-dark / neutral-light.
    pub colors: Vec<ColorSwatch>,
    pub typography_primary: String,
    pub typography_secondary: String,
    pub graphic_style: String,
    pub logo_spec: LogoSpec,
    pub pattern_spec: PatternSpec,
    pub background_spec: BackgroundSpec,
    pub tagline: String,
    pub ad_slogan: String,
    pub announcement_copy: String,
}

impl BrandDirection {
    pub fn primary_hex(&self) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.role == SwatchRole::Primary)
            .map(|c| c.hex.as_str())
    }

    pub fn primary_hue_family(&self) -> Option<HueFamily> {
        self.primary_hex()
            .and_then(color::parse_hex)
            .map(color::hue_family)
    }

    fn validate(&self) -> Result<(), String> {
        let expected = OptionType::for_option(self.option_number)
            .ok_or_else(|| format!("option_number {} out of range", self.option_number))?;
        if self.option_type != expected {
            return Err(format!(
                "option {} must be {}, got {}",
                self.option_number,
                expected.label(),
                self.option_type.label()
            ));
        }
        if self.direction_name.trim().is_empty() {
            return Err(format!("option {}: empty direction_name", self.option_number));
        }
        if !(4..=6).contains(&self.colors.len()) {
            return Err(format!(
                "option {}: expected 4-6 colors, got {}",
                self.option_number,
                self.colors.len()
            ));
        }
        for swatch in &self.colors {
            if !color::is_valid_hex(&swatch.hex) {
                return Err(format!(
                    "option {}: invalid hex {:?} for {}",
                    self.option_number, swatch.hex, swatch.name
                ));
            }
        }
        let roles: HashSet<SwatchRole> = self.colors.iter().map(|c| c.role).collect();
        for required in [
            SwatchRole::Primary,
            SwatchRole::NeutralDark,
            SwatchRole::NeutralLight,
        ] {
            if !roles.contains(&required) {
                return Err(format!(
                    "option {}: colors missing required role {:?}",
                    self.option_number, required
                ));
            }
        }
        if !color::is_valid_hex(&self.logo_spec.color_hex) {
            return Err(format!(
                "option {}: logo_spec.color_hex {:?} is not #RRGGBB",
                self.option_number, self.logo_spec.color_hex
            ));
        }
        Ok(())
    }
}

/// Exactly four directions, indexed by `option_number`, each option type
/// appearing exactly once in the fixed positional order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandDirectionsOutput {
    pub directions: Vec<BrandDirection>,
}

impl BrandDirectionsOutput {
    pub fn by_option(&self, option_number: u8) -> Option<&BrandDirection> {
        self.directions
            .iter()
            .find(|d| d.option_number == option_number)
    }

    /// Structural invariants from the data-model contract: exactly four
    /// directions numbered 1..4, fixed option-type slots, valid palettes,
    /// and pairwise divergence (no two directions share both the primary hue
    /// family and the logo type).
    pub fn validate(&self) -> Result<(), String> {
        if self.directions.len() != 4 {
            return Err(format!("expected 4 directions, got {}", self.directions.len()));
        }
        let numbers: HashSet<u8> = self.directions.iter().map(|d| d.option_number).collect();
        if numbers != HashSet::from([1, 2, 3, 4]) {
            return Err(format!("option numbers must be exactly 1..4, got {numbers:?}"));
        }
        for direction in &self.directions {
            direction.validate()?;
        }
        for a in &self.directions {
            for b in &self.directions {
                if a.option_number >= b.option_number {
                    continue;
                }
                let same_family = match (a.primary_hue_family(), b.primary_hue_family()) {
                    (Some(fa), Some(fb)) => fa == fb,
                    _ => false,
                };
                if same_family && a.logo_spec.logo_type == b.logo_spec.logo_type {
                    return Err(format!(
                        "options {} and {} share both primary hue family and logo type {}",
                        a.option_number,
                        b.option_number,
                        a.logo_spec.logo_type.label()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Stamp locked copy over every direction. Called by the Director before
    /// the record is published, so the byte-equality guarantee holds
    /// regardless of model behavior.
    pub fn apply_locked_copy(&mut self, copy: &LockedCopy) {
        for direction in &mut self.directions {
            if let Some(tagline) = &copy.tagline {
                direction.tagline = tagline.clone();
            }
            if let Some(slogan) = &copy.slogan {
                direction.ad_slogan = slogan.clone();
            }
            if let Some(announcement) = &copy.announcement {
                direction.announcement_copy = announcement.clone();
            }
        }
    }
}

// ─── Structured-output schema ────────────────────────────────────────────────

/// JSON schema handed to the structured text call producing the four
/// directions. Mirrors the serde shape above.
pub fn directions_schema() -> Value {
    let hex = json!({"type": "string", "pattern": "^#[0-9A-Fa-f]{6}$"});
    let swatch = json!({
        "type": "object",
        "properties": {
            "hex": hex.clone(),
            "role": {"type": "string", "enum": [
                "primary", "secondary", "accent", "neutral-dark", "neutral-light", "support"
            ]},
            "name": {"type": "string"}
        },
        "required": ["hex", "role", "name"]
    });
    let logo_spec = json!({
        "type": "object",
        "properties": {
            "logo_type": {"type": "string", "enum": [
                "symbol", "abstract_mark", "lettermark", "logotype", "combination"
            ]},
            "form": {"type": "string"},
            "composition": {"type": "string"},
            "color_hex": hex.clone(),
            "fill_style": {"type": "string", "enum": [
                "solid_fill", "outline_only", "fill_with_outline_detail"
            ]},
            "stroke_weight": {"type": "string", "enum": ["hairline", "thin", "medium", "bold"]},
            "typography_treatment": {"type": "string"},
            "render_style": {"type": "string"},
            "metaphor": {"type": "string"},
            "avoid": {"type": "array", "items": {"type": "string"}}
        },
        "required": [
            "logo_type", "form", "composition", "color_hex", "fill_style",
            "stroke_weight", "typography_treatment", "render_style", "metaphor", "avoid"
        ]
    });
    let pattern_spec = json!({
        "type": "object",
        "properties": {
            "motif": {"type": "string"},
            "density_scale": {"type": "string"},
            "primary_color_hex": hex.clone(),
            "secondary_color_hex": {"type": "string"},
            "background_color_hex": hex.clone(),
            "opacity_notes": {"type": "string"},
            "render_style": {"type": "string"},
            "mood": {"type": "string"},
            "avoid": {"type": "array", "items": {"type": "string"}}
        },
        "required": [
            "motif", "density_scale", "primary_color_hex", "background_color_hex",
            "render_style", "mood"
        ]
    });
    let background_spec = json!({
        "type": "object",
        "properties": {
            "scene_type": {"type": "string", "enum": [
                "environmental_photo", "abstract_field", "macro_texture", "digital_art"
            ]},
            "description": {"type": "string"},
            "primary_color_hex": hex,
            "accent_color_hex": {"type": "string"},
            "lighting": {"type": "string"},
            "composition": {"type": "string"},
            "texture": {"type": "string"},
            "mood": {"type": "string"},
            "avoid": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["scene_type", "description", "primary_color_hex", "lighting", "composition", "mood"]
    });
    json!({
        "type": "object",
        "properties": {
            "directions": {
                "type": "array",
                "minItems": 4,
                "maxItems": 4,
                "items": {
                    "type": "object",
                    "properties": {
                        "option_number": {"type": "integer", "minimum": 1, "maximum": 4},
                        "option_type": {"type": "string", "enum": [
                            "Market-Aligned", "Designer-Led", "Hybrid", "Wild-Card"
                        ]},
                        "direction_name": {"type": "string"},
                        "rationale": {"type": "string"},
                        "colors": {"type": "array", "minItems": 4, "maxItems": 6, "items": swatch},
                        "typography_primary": {"type": "string"},
                        "typography_secondary": {"type": "string"},
                        "graphic_style": {"type": "string"},
                        "logo_spec": logo_spec,
                        "pattern_spec": pattern_spec,
                        "background_spec": background_spec,
                        "tagline": {"type": "string"},
                        "ad_slogan": {"type": "string"},
                        "announcement_copy": {"type": "string"}
                    },
                    "required": [
                        "option_number", "option_type", "direction_name", "rationale",
                        "colors", "typography_primary", "typography_secondary", "graphic_style",
                        "logo_spec", "pattern_spec", "background_spec",
                        "tagline", "ad_slogan", "announcement_copy"
                    ]
                }
            }
        },
        "required": ["directions"]
    })
}
