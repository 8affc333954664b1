//! Color math shared across the pipeline: hex parsing, OKLab/OKLCh
//! conversion for shade scales, and hue-family classification used by the
//! direction-divergence check and palette naming fallback.

use serde::{Deserialize, Serialize};

// ─── Hex parsing ─────────────────────────────────────────────────────────────

/// Parse `#RRGGBB` into raw bytes. Case-insensitive; the leading `#` is
/// required.
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let rest = hex.strip_prefix('#')?;
    if rest.len() != 6 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&rest[0..2], 16).ok()?;
    let g = u8::from_str_radix(&rest[2..4], 16).ok()?;
    let b = u8::from_str_radix(&rest[4..6], 16).ok()?;
    Some([r, g, b])
}

pub fn is_valid_hex(hex: &str) -> bool {
    parse_hex(hex).is_some()
}

pub fn format_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// WCAG-style relative luminance on gamma-encoded values. Good enough for
/// dark/light classification; the shade scales use OKLab lightness instead.
pub fn luminance(rgb: [u8; 3]) -> f64 {
    let [r, g, b] = rgb;
    0.2126 * f64::from(r) / 255.0 + 0.7152 * f64::from(g) / 255.0 + 0.0722 * f64::from(b) / 255.0
}

pub fn is_dark(rgb: [u8; 3]) -> bool {
    luminance(rgb) < 0.5
}

// ─── OKLab / OKLCh ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oklch {
    /// Lightness, 0..1.
    pub l: f64,
    /// Chroma, typically 0..0.4.
    pub c: f64,
    /// Hue angle in degrees, 0..360.
    pub h: f64,
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB → OKLCh via the OKLab matrix pipeline.
pub fn rgb_to_oklch(rgb: [u8; 3]) -> Oklch {
    let r = srgb_to_linear(f64::from(rgb[0]) / 255.0);
    let g = srgb_to_linear(f64::from(rgb[1]) / 255.0);
    let b = srgb_to_linear(f64::from(rgb[2]) / 255.0);

    let l = (0.412_221_470_8 * r + 0.536_332_536_3 * g + 0.051_445_992_9 * b).cbrt();
    let m = (0.211_903_498_2 * r + 0.680_699_545_1 * g + 0.107_396_956_6 * b).cbrt();
    let s = (0.088_302_461_9 * r + 0.281_718_837_6 * g + 0.629_978_700_5 * b).cbrt();

    let ok_l = 0.210_454_255_3 * l + 0.793_617_785_0 * m - 0.004_072_046_8 * s;
    let ok_a = 1.977_998_495_1 * l - 2.428_592_205_0 * m + 0.450_593_709_9 * s;
    let ok_b = 0.025_904_037_1 * l + 0.782_771_766_2 * m - 0.808_675_766_0 * s;

    let c = (ok_a * ok_a + ok_b * ok_b).sqrt();
    let mut h = ok_b.atan2(ok_a).to_degrees();
    if h < 0.0 {
        h += 360.0;
    }
    Oklch { l: ok_l, c, h }
}

/// OKLCh → sRGB bytes, gamut-clamped.
pub fn oklch_to_rgb(color: Oklch) -> [u8; 3] {
    let h = color.h.to_radians();
    let a = color.c * h.cos();
    let b = color.c * h.sin();

    let l_ = color.l + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m_ = color.l - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s_ = color.l - 0.089_484_177_5 * a - 1.291_485_548_0 * b;

    let l = l_ * l_ * l_;
    let m = m_ * m_ * m_;
    let s = s_ * s_ * s_;

    let r = 4.076_741_662_1 * l - 3.307_711_591_3 * m + 0.230_969_929_2 * s;
    let g = -1.268_438_004_6 * l + 2.609_757_401_1 * m - 0.341_319_396_5 * s;
    let b_lin = -0.004_196_086_3 * l - 0.703_418_614_7 * m + 1.707_614_701_0 * s;

    [
        (linear_to_srgb(r) * 255.0).round() as u8,
        (linear_to_srgb(g) * 255.0).round() as u8,
        (linear_to_srgb(b_lin) * 255.0).round() as u8,
    ]
}

// ─── Hue families ────────────────────────────────────────────────────────────

/// Coarse perceptual hue buckets. Two directions sharing a primary family and
/// a logo type are considered non-divergent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueFamily {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Violet,
    Magenta,
    Neutral,
}

impl HueFamily {
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Cyan => "cyan",
            Self::Blue => "blue",
            Self::Violet => "violet",
            Self::Magenta => "magenta",
            Self::Neutral => "neutral",
        }
    }
}

/// Classify a color into its hue family. Low-chroma colors are neutral
/// regardless of hue angle.
pub fn hue_family(rgb: [u8; 3]) -> HueFamily {
    let lch = rgb_to_oklch(rgb);
    if lch.c < 0.03 {
        return HueFamily::Neutral;
    }
    // OKLCh hue angles; boundaries tuned to common perception.
    match lch.h {
        h if h < 30.0 => HueFamily::Magenta,
        h if h < 65.0 => HueFamily::Red,
        h if h < 95.0 => HueFamily::Orange,
        h if h < 120.0 => HueFamily::Yellow,
        h if h < 170.0 => HueFamily::Green,
        h if h < 215.0 => HueFamily::Cyan,
        h if h < 280.0 => HueFamily::Blue,
        h if h < 330.0 => HueFamily::Violet,
        _ => HueFamily::Magenta,
    }
}
