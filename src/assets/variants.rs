//! Logo variant derivation: from the rendered `logo.png`, produce the
//! transparent, white-on-black, and black-on-white variants the mockup and
//! social stages need. Pure pixel work, no model calls.
//!
//! Known trade-off: the near-white knockout erodes near-white brand colors.
//! Recorded as a caveat, not a blocker; the base logo is always kept.

use crate::error::AssetError;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

pub const DEFAULT_WHITE_THRESHOLD: u8 = 240;

#[derive(Debug, Clone)]
pub struct LogoVariants {
    pub transparent: PathBuf,
    pub white: PathBuf,
    pub black: PathBuf,
}

fn brightness(pixel: &Rgba<u8>) -> f32 {
    0.299 * f32::from(pixel[0]) + 0.587 * f32::from(pixel[1]) + 0.114 * f32::from(pixel[2])
}

/// Knock out the near-white background: brightness at or above the
/// threshold fades to transparent over a short ramp so anti-aliased edges
/// keep a soft falloff.
fn knock_out_white(img: &RgbaImage, threshold: u8) -> RgbaImage {
    let ramp = 30.0_f32;
    let threshold = f32::from(threshold);
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let scale = ((threshold - brightness(pixel)) / ramp).clamp(0.0, 1.0);
        pixel[3] = (f32::from(pixel[3]) * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn flatten_as(mask: &RgbaImage, ink: [u8; 3], paper: [u8; 3]) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(
        mask.width(),
        mask.height(),
        Rgba([paper[0], paper[1], paper[2], 255]),
    );
    for (x, y, pixel) in mask.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        if alpha > 0.0 {
            let base = out.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = f32::from(ink[c]) * alpha + f32::from(paper[c]) * (1.0 - alpha);
                base[c] = blended.round() as u8;
            }
        }
    }
    out
}

/// Derive all three variants from the base logo file.
pub fn derive(
    logo_path: &Path,
    out_dir: &Path,
    white_threshold: u8,
) -> Result<LogoVariants, AssetError> {
    let bytes = std::fs::read(logo_path)
        .map_err(|e| AssetError::Variant(format!("read {}: {e}", logo_path.display())))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| AssetError::Variant(format!("decode {}: {e}", logo_path.display())))?
        .to_rgba8();

    let mask = knock_out_white(&img, white_threshold);

    // Transparent variant keeps the original ink over the knocked-out alpha.
    let mut transparent = img;
    for (pixel, masked) in transparent.pixels_mut().zip(mask.pixels()) {
        pixel[3] = masked[3];
    }

    // Black variant: desaturate-and-threshold to near-black ink on white.
    let black = flatten_as(&mask, [20, 20, 20], [255, 255, 255]);
    // White variant is its inversion: white ink on black.
    let white = flatten_as(&mask, [255, 255, 255], [0, 0, 0]);

    let paths = LogoVariants {
        transparent: out_dir.join("logo_transparent.png"),
        white: out_dir.join("logo_white.png"),
        black: out_dir.join("logo_black.png"),
    };
    transparent
        .save(&paths.transparent)
        .map_err(|e| AssetError::Variant(e.to_string()))?;
    white
        .save(&paths.white)
        .map_err(|e| AssetError::Variant(e.to_string()))?;
    black
        .save(&paths.black)
        .map_err(|e| AssetError::Variant(e.to_string()))?;
    tracing::debug!(dir = %out_dir.display(), "logo variants derived");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4×4 logo: solid dark glyph square on a white field.
    fn sample_logo(dir: &Path) -> PathBuf {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([250, 250, 250, 255]));
        for x in 1..3 {
            for y in 1..3 {
                img.put_pixel(x, y, Rgba([30, 60, 90, 255]));
            }
        }
        let path = dir.join("logo.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn transparent_variant_keeps_ink_and_drops_background() {
        let tmp = tempfile::tempdir().unwrap();
        let logo = sample_logo(tmp.path());
        let variants = derive(&logo, tmp.path(), DEFAULT_WHITE_THRESHOLD).unwrap();

        let transparent = image::open(&variants.transparent).unwrap().to_rgba8();
        assert_eq!(transparent.get_pixel(0, 0)[3], 0, "background must be knocked out");
        assert_eq!(transparent.get_pixel(1, 1)[3], 255, "glyph must stay opaque");
        assert_eq!(transparent.get_pixel(1, 1)[0], 30);
    }

    #[test]
    fn white_variant_is_inversion_of_black_variant() {
        let tmp = tempfile::tempdir().unwrap();
        let logo = sample_logo(tmp.path());
        let variants = derive(&logo, tmp.path(), DEFAULT_WHITE_THRESHOLD).unwrap();

        let black = image::open(&variants.black).unwrap().to_rgba8();
        let white = image::open(&variants.white).unwrap().to_rgba8();

        // Glyph: near-black on white vs white on black.
        assert!(black.get_pixel(1, 1)[0] < 40);
        assert_eq!(white.get_pixel(1, 1)[0], 255);
        // Field: white vs black.
        assert_eq!(black.get_pixel(0, 0)[0], 255);
        assert_eq!(white.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = derive(&tmp.path().join("nope.png"), tmp.path(), DEFAULT_WHITE_THRESHOLD);
        assert!(result.is_err());
    }
}
