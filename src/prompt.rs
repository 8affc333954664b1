//! Render-spec → image-prompt translators. Image models respond to keyword
//! clusters, not prose, so logo and pattern prompts use a `[SECTION]:`
//! keyword-stack format ordered by attention priority; backgrounds stay
//! prose. Pixel dimensions are scrubbed; they read as noise to the model.

use crate::direction::{BackgroundSpec, FillStyle, LogoSpec, LogoType, PatternSpec, SceneType};
use crate::styledna::StyleDna;
use regex::Regex;
use std::sync::OnceLock;

/// Clichés banned from every logo regardless of industry, appended to the
/// spec's own avoid list.
pub const HARD_CLICHE_AVOIDS: &[&str] = &[
    "coffee cup", "mug", "coffee bean", "steam", "fork", "spoon", "chef hat", "lightbulb",
    "gear", "circuit board", "upward arrow", "dollar sign", "stethoscope", "hanger",
    "house outline", "location pin",
];

const RENDER_BANS: &[&str] = &[
    "gradient",
    "drop shadow",
    "3D effect",
    "photograph",
    "multiple colors",
];

fn dimension_scrubber() -> &'static [Regex; 3] {
    static SCRUBBERS: OnceLock<[Regex; 3]> = OnceLock::new();
    SCRUBBERS.get_or_init(|| {
        [
            Regex::new(r"\b\d+(?:×|x)\d+\s*px\b").unwrap(),
            Regex::new(r"\b\d+px\b").unwrap(),
            Regex::new(r"\b\d+pt\b").unwrap(),
        ]
    })
}

/// Remove pixel/point dimensions and tidy the leftover punctuation.
pub fn scrub_dimensions(raw: &str) -> String {
    let mut out = raw.to_string();
    for re in dimension_scrubber() {
        out = re.replace_all(&out, "").into_owned();
    }
    static TIDY_COMMAS: OnceLock<Regex> = OnceLock::new();
    static TIDY_SPACES: OnceLock<Regex> = OnceLock::new();
    let commas = TIDY_COMMAS.get_or_init(|| Regex::new(r",\s*,").unwrap());
    let spaces = TIDY_SPACES.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap());
    out = commas.replace_all(&out, ",").into_owned();
    out = spaces.replace_all(&out, " ").into_owned();
    out.trim().to_string()
}

/// Force a lettermark's form to carry the brand initial. The Director is
/// told to use the first letter; when the form drifts, patch it rather than
/// rendering the wrong monogram. The initial must appear as a standalone
/// letter token, not buried inside a word.
fn patch_lettermark_initial(form: &str, brand_name: &str) -> String {
    let Some(initial) = brand_name.trim().chars().next() else {
        return form.to_string();
    };
    let initial = initial.to_ascii_uppercase();
    let standalone = Regex::new(&format!(r"\b{}\b", regex::escape(&initial.to_string())))
        .expect("initial pattern");
    if standalone.is_match(&form.to_ascii_uppercase()) {
        return form.to_string();
    }
    tracing::warn!(expected = %initial, "lettermark form missing brand initial, patching");
    format!("uppercase {initial}, {form}")
}

/// Translate a `LogoSpec` into the keyword-stack prompt. Style-DNA
/// constraints, when present, take the highest priority slot and replace the
/// spec's own render style.
pub fn logo_prompt(spec: &LogoSpec, brand_name: &str, dna: Option<&StyleDna>) -> String {
    let mut form = spec.form.clone();
    if spec.logo_type == LogoType::Lettermark {
        form = patch_lettermark_initial(&form, brand_name);
    }

    let type_line = match spec.logo_type {
        LogoType::Logotype => {
            format!("[LOGO TYPE]: brand logotype, '{brand_name}' as pure typography")
        }
        LogoType::Combination => {
            format!("[LOGO TYPE]: combination mark, symbol + brand name '{brand_name}'")
        }
        LogoType::Lettermark => "[LOGO TYPE]: lettermark logo, single letter mark".to_string(),
        other => format!("[LOGO TYPE]: {}, standalone mark, no text", other.label()),
    };

    let fill_desc = match spec.fill_style {
        FillStyle::SolidFill => "solid flat fill".to_string(),
        FillStyle::OutlineOnly => format!(
            "outline only, {} stroke, transparent interior",
            spec.stroke_weight.label()
        ),
        FillStyle::FillWithOutlineDetail => format!(
            "solid fill with {} outline details",
            spec.stroke_weight.label()
        ),
    };
    let color_line = format!(
        "[COLOR]: {fill_desc}, {} monochrome single-color only",
        spec.color_hex
    );

    let typo_line = if spec.logo_type.text_allowed()
        && !spec.typography_treatment.is_empty()
        && !spec.typography_treatment.eq_ignore_ascii_case("n/a")
    {
        Some(format!("[TYPOGRAPHY]: {}", spec.typography_treatment))
    } else {
        None
    };

    let dna_line = dna.map(|d| format!("[STYLE DNA]: {}", d.to_constraints()));
    // With DNA present the reference defines the rendering; keep only the
    // composition from the spec's render line.
    let render_line = if dna_line.is_some() {
        format!("[RENDER]: {}", spec.composition)
    } else {
        format!("[RENDER]: {}, {}", spec.render_style, spec.composition)
    };

    let metaphor_line = if !spec.metaphor.is_empty()
        && !spec.metaphor.eq_ignore_ascii_case("abstract")
        && !spec.metaphor.eq_ignore_ascii_case("n/a")
    {
        Some(format!("[METAPHOR]: {}", spec.metaphor))
    } else {
        None
    };

    let mut avoid: Vec<String> = spec.avoid.clone();
    let has = |needle: &str, list: &[String]| {
        let joined = list.join(" ").to_ascii_lowercase();
        joined.contains(&needle.to_ascii_lowercase())
    };
    if !spec.logo_type.text_allowed() {
        for ban in ["text", "letterforms", "words"] {
            if !has(ban, &avoid) {
                avoid.insert(0, ban.to_string());
            }
        }
    }
    for cliche in HARD_CLICHE_AVOIDS {
        if !has(cliche, &avoid) {
            avoid.push((*cliche).to_string());
        }
    }
    for ban in RENDER_BANS {
        if !has(ban, &avoid) {
            avoid.push((*ban).to_string());
        }
    }
    let forbidden_line = format!("[FORBIDDEN]: {}", avoid.join(", "));

    let mut lines: Vec<String> = Vec::new();
    if let Some(dna) = dna_line {
        lines.push(dna);
    }
    lines.push(type_line);
    lines.push(format!("[FORM]: {form}"));
    lines.push(color_line);
    if let Some(typo) = typo_line {
        lines.push(typo);
    }
    lines.push(render_line);
    if let Some(metaphor) = metaphor_line {
        lines.push(metaphor);
    }
    lines.push(forbidden_line);

    scrub_dimensions(&lines.join("\n"))
}

pub fn pattern_prompt(spec: &PatternSpec) -> String {
    let mut motif_line = format!("[MOTIF]: seamless repeating pattern tile, {}", spec.motif);
    if !spec.density_scale.is_empty() {
        motif_line.push_str(&format!(", density {}", spec.density_scale));
    }

    let mut color_parts = vec![
        format!("primary motif {}", spec.primary_color_hex),
        format!("background {}", spec.background_color_hex),
    ];
    if !spec.secondary_color_hex.is_empty() && !spec.secondary_color_hex.eq_ignore_ascii_case("none")
    {
        color_parts.push(format!("secondary accent {}", spec.secondary_color_hex));
    }
    if !spec.opacity_notes.is_empty() && !spec.opacity_notes.eq_ignore_ascii_case("solid") {
        color_parts.push(spec.opacity_notes.clone());
    }

    let mut avoid = spec.avoid.clone();
    for ban in ["text", "logos", "photographic elements", "random noise"] {
        if !avoid.iter().any(|a| a.eq_ignore_ascii_case(ban)) {
            avoid.push(ban.to_string());
        }
    }

    let lines = [
        motif_line,
        format!("[COLOR]: {}", color_parts.join(", ")),
        format!("[RENDER]: {}, {}", spec.render_style, spec.mood),
        "[TILING]: all 4 edges align perfectly, seamless infinite repeat, \
         professional surface/textile quality"
            .to_string(),
        format!("[FORBIDDEN]: {}", avoid.join(", ")),
    ];
    scrub_dimensions(&lines.join("\n"))
}

pub fn background_prompt(spec: &BackgroundSpec) -> String {
    let quality = match spec.scene_type {
        SceneType::EnvironmentalPhoto => "photorealistic cinematic photograph",
        SceneType::AbstractField => "high-end abstract digital art",
        SceneType::MacroTexture => "close-up macro texture photograph",
        SceneType::DigitalArt => "premium digital illustration",
    };

    let mut color_desc = format!("dominant color {}", spec.primary_color_hex);
    if !spec.accent_color_hex.is_empty() && !spec.accent_color_hex.eq_ignore_ascii_case("none") {
        color_desc.push_str(&format!(", accent {}", spec.accent_color_hex));
    }

    let mut avoid = spec.avoid.clone();
    for ban in ["text", "logos", "UI elements", "watermarks", "typography"] {
        if !avoid.iter().any(|a| a.eq_ignore_ascii_case(ban)) {
            avoid.push(ban.to_string());
        }
    }

    let mut parts = vec![
        format!("A {quality}: {}.", spec.description),
        format!("Composition: {}.", spec.composition),
        format!("Color palette: {color_desc}."),
    ];
    if !spec.lighting.is_empty() {
        parts.push(format!("Lighting: {}.", spec.lighting));
    }
    if !spec.texture.is_empty() && !spec.texture.eq_ignore_ascii_case("smooth digital") {
        parts.push(format!("Texture: {}.", spec.texture));
    }
    if !spec.mood.is_empty() {
        parts.push(format!("Mood: {}.", spec.mood));
    }
    parts.push(format!(
        "Wide cinematic format filling the entire frame edge-to-edge, {quality} rendering quality."
    ));
    parts.push(format!("Absolutely no: {}.", avoid.join(", ")));
    parts.join(" ")
}
