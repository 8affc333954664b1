//! Algorithmic 9-step shade scales. No model call: each scale interpolates
//! lightness in OKLCh from a near-white tint (stop 50) through the input
//! color (stop 500, reproduced verbatim) down to a near-black shade
//! (stop 900), with chroma tapered at both extremes. Lightness is kept
//! strictly monotone across the rendered stops.

use super::glyph;
use crate::color::{self, Oklch};
use crate::direction::SwatchRole;
use crate::error::AssetError;
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::path::Path;

pub const SHADE_STOPS: [u16; 10] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900];

#[derive(Debug, Clone, PartialEq)]
pub struct ShadeScale {
    pub base_hex: String,
    /// stop → hex, ordered.
    pub stops: BTreeMap<u16, String>,
}

fn light_endpoint(base_l: f64) -> f64 {
    if base_l >= 0.95 {
        (base_l + (0.999 - base_l) * 0.7).min(0.999)
    } else {
        0.965
    }
}

fn dark_endpoint(base_l: f64) -> f64 {
    if base_l <= 0.18 {
        (base_l * 0.45).max(0.015)
    } else {
        0.13
    }
}

fn target(base: Oklch, stop: u16) -> Oklch {
    if stop == 500 {
        return base;
    }
    if stop < 500 {
        let t = f64::from(500 - stop) / 450.0;
        Oklch {
            l: base.l + (light_endpoint(base.l) - base.l) * t,
            c: base.c * (1.0 - 0.75 * t),
            h: base.h,
        }
    } else {
        let t = f64::from(stop - 500) / 400.0;
        Oklch {
            l: base.l - (base.l - dark_endpoint(base.l)) * t,
            c: base.c * (1.0 - 0.35 * t),
            h: base.h,
        }
    }
}

/// Build the scale for one color. Returns `None` for an unparseable hex.
pub fn shade_scale(hex: &str) -> Option<ShadeScale> {
    let rgb = color::parse_hex(hex)?;
    let base = color::rgb_to_oklch(rgb);
    let base_hex = color::format_hex(rgb);

    let mut stops = BTreeMap::new();
    let mut previous_l = f64::INFINITY;
    for stop in SHADE_STOPS {
        if stop == 500 {
            // The anchor is the input, byte for byte.
            previous_l = color::rgb_to_oklch(rgb).l;
            stops.insert(stop, base_hex.clone());
            continue;
        }
        let mut t = target(base, stop);
        let mut rendered = color::oklch_to_rgb(t);
        // Rounding to 8-bit can flatten adjacent near-extreme steps; nudge
        // lightness until the rendered value stays strictly below the
        // previous stop.
        let mut guard = 0;
        while color::rgb_to_oklch(rendered).l >= previous_l && guard < 50 {
            t.l -= 0.004;
            rendered = color::oklch_to_rgb(t);
            guard += 1;
        }
        previous_l = color::rgb_to_oklch(rendered).l;
        stops.insert(stop, color::format_hex(rendered));
    }
    Some(ShadeScale {
        base_hex,
        stops,
    })
}

/// Scales for the palette roles that get shade boards.
pub fn palette_shades(colors: &[super::palette::EnrichedSwatch]) -> Vec<(String, ShadeScale)> {
    colors
        .iter()
        .filter(|c| {
            matches!(
                c.role,
                SwatchRole::Primary | SwatchRole::Secondary | SwatchRole::Accent
            )
        })
        .filter_map(|c| shade_scale(&c.hex).map(|scale| (c.name.clone(), scale)))
        .collect()
}

// ─── Render ──────────────────────────────────────────────────────────────────

const CELL_W: u32 = 150;
const CELL_H: u32 = 110;
const HEADER_H: u32 = 34;
const GAP: u32 = 2;

/// Deterministic shade board: one row per color, one column per stop, stop
/// numbers in the header, hex labels in the cells, the 500 anchor outlined.
pub fn render_shades_png(
    scales: &[(String, ShadeScale)],
    path: &Path,
) -> Result<(), AssetError> {
    if scales.is_empty() {
        return Err(AssetError::Render("no scales to render".to_string()));
    }
    let cols = SHADE_STOPS.len() as u32;
    let width = cols * CELL_W + (cols - 1) * GAP;
    let height = HEADER_H + scales.len() as u32 * (CELL_H + GAP);
    let mut img = RgbaImage::from_pixel(width, height, Rgba([12, 12, 16, 255]));

    for (col, stop) in SHADE_STOPS.iter().enumerate() {
        let label = stop.to_string();
        let x = col as u32 * (CELL_W + GAP);
        let lx = x + (CELL_W - glyph::text_width(&label, 2)) / 2;
        glyph::draw_text(&mut img, lx, 10, &label, 2, [120, 120, 135]);
    }

    for (row, (_, scale)) in scales.iter().enumerate() {
        let y = HEADER_H + row as u32 * (CELL_H + GAP);
        for (col, stop) in SHADE_STOPS.iter().enumerate() {
            let hex = &scale.stops[stop];
            let rgb = color::parse_hex(hex).unwrap_or([136, 136, 136]);
            let x = col as u32 * (CELL_W + GAP);
            for dy in 0..CELL_H {
                for dx in 0..CELL_W {
                    img.put_pixel(x + dx, y + dy, Rgba([rgb[0], rgb[1], rgb[2], 255]));
                }
            }
            if *stop == 500 {
                let outline = if color::is_dark(rgb) {
                    [255, 255, 255]
                } else {
                    [0, 0, 0]
                };
                for dx in 0..CELL_W {
                    for edge in [2u32, CELL_H - 3] {
                        img.put_pixel(x + dx, y + edge, Rgba([outline[0], outline[1], outline[2], 255]));
                    }
                }
                for dy in 0..CELL_H {
                    for edge in [2u32, CELL_W - 3] {
                        img.put_pixel(x + edge, y + dy, Rgba([outline[0], outline[1], outline[2], 255]));
                    }
                }
            }
            let label_color = if color::is_dark(rgb) {
                [255, 255, 255]
            } else {
                [20, 20, 20]
            };
            let lx = x + (CELL_W - glyph::text_width(hex, 2)) / 2;
            glyph::draw_text(&mut img, lx, y + CELL_H - 16, hex, 2, label_color);
        }
    }

    img.save(path).map_err(|e| AssetError::Render(e.to_string()))
}
