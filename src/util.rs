use chrono::Local;
use std::path::{Path, PathBuf};

/// Lowercase alphanumeric slug, underscore-separated, capped at 30 chars.
/// Used for the per-direction asset directories.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_sep = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    let trimmed = out.trim_matches('_');
    trimmed.chars().take(30).collect::<String>().trim_end_matches('_').to_string()
}

/// Timestamped run directory under the output root, e.g. `outputs/20260802_141503`.
pub fn run_output_dir(root: &Path) -> PathBuf {
    root.join(Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// `option_<N>_<slug>` directory name for one direction.
pub fn option_dir_name(option_number: u8, direction_name: &str) -> String {
    format!("option_{}_{}", option_number, slugify(direction_name))
}

/// Infer a mime type from a file extension, defaulting to PNG.
pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
