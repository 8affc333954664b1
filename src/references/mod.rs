//! Read-only reference library: tagged logo/pattern images plus
//! per-category styleguide documents. Loaded once at startup; lookups are
//! pure functions over the loaded data, so concurrent reads need no locking.

pub mod styleguide;

pub use styleguide::Styleguide;

use crate::error::ReferenceError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Logo,
    Pattern,
}

impl ReferenceKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Logo => "logos",
            Self::Pattern => "patterns",
        }
    }
}

/// One `index.json` entry. `relative_path` is the current format;
/// `local_path` (absolute) is accepted for legacy entries but never written.
#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    relative_path: Option<String>,
    #[serde(default)]
    local_path: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    quality: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)]
    form: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    motif: Option<String>,
}

#[derive(Debug, Clone)]
struct IndexedImage {
    path: PathBuf,
    tags: Vec<String>,
    quality: f64,
    category_words: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    logos: Vec<IndexedImage>,
    patterns: Vec<IndexedImage>,
    logo_guides: Vec<Styleguide>,
    pattern_guides: Vec<Styleguide>,
}

fn category_words(name: &str) -> HashSet<String> {
    name.to_ascii_lowercase()
        .split(|c: char| c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl ReferenceIndex {
    /// Load every category index and styleguide. Missing directories yield
    /// an empty (but valid) library; a malformed index or styleguide is a
    /// startup error; silently dropping fields would surface much later as
    /// inexplicably weak prompts.
    pub fn load(references_dir: &Path, styles_dir: &Path) -> Result<Self, ReferenceError> {
        let mut index = Self::default();
        for kind in [ReferenceKind::Logo, ReferenceKind::Pattern] {
            let images = load_kind(references_dir, kind)?;
            let guides = load_guides(styles_dir, kind)?;
            match kind {
                ReferenceKind::Logo => {
                    index.logos = images;
                    index.logo_guides = guides;
                }
                ReferenceKind::Pattern => {
                    index.patterns = images;
                    index.pattern_guides = guides;
                }
            }
        }
        tracing::info!(
            logos = index.logos.len(),
            patterns = index.patterns.len(),
            logo_guides = index.logo_guides.len(),
            pattern_guides = index.pattern_guides.len(),
            "reference library loaded"
        );
        Ok(index)
    }

    /// Top-k reference images for the given tags. Score is tag overlap with
    /// a doubled weight for category-folder membership plus the stored
    /// quality rank; ties break on path so the ordering is deterministic.
    pub fn lookup_references(&self, tags: &[String], kind: ReferenceKind, k: usize) -> Vec<PathBuf> {
        let pool = match kind {
            ReferenceKind::Logo => &self.logos,
            ReferenceKind::Pattern => &self.patterns,
        };
        let tag_set: HashSet<String> = normalize_tags(tags).into_iter().collect();

        let mut scored: Vec<(f64, &IndexedImage)> = pool
            .iter()
            .filter_map(|image| {
                let category_overlap = image
                    .category_words
                    .iter()
                    .filter(|w| tag_set.contains(*w))
                    .count();
                let tag_overlap = image.tags.iter().filter(|t| tag_set.contains(*t)).count();
                if category_overlap == 0 && tag_overlap == 0 {
                    return None;
                }
                let score =
                    2.0 * category_overlap as f64 + tag_overlap as f64 + image.quality / 10.0;
                Some((score, image))
            })
            .collect();

        scored.sort_by(|(sa, ia), (sb, ib)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ia.path.cmp(&ib.path))
        });
        scored.into_iter().take(k).map(|(_, i)| i.path.clone()).collect()
    }

    /// Best-matching styleguide for the tags, or nothing.
    pub fn lookup_styleguide(&self, tags: &[String], kind: ReferenceKind) -> Option<&Styleguide> {
        let pool = match kind {
            ReferenceKind::Logo => &self.logo_guides,
            ReferenceKind::Pattern => &self.pattern_guides,
        };
        let tag_set: HashSet<String> = normalize_tags(tags).into_iter().collect();
        pool.iter()
            .map(|guide| {
                let overlap = category_words(&guide.category)
                    .iter()
                    .filter(|w| tag_set.contains(*w))
                    .count();
                (overlap, guide)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .max_by(|(oa, ga), (ob, gb)| oa.cmp(ob).then_with(|| gb.category.cmp(&ga.category)))
            .map(|(_, guide)| guide)
    }
}

fn load_kind(references_dir: &Path, kind: ReferenceKind) -> Result<Vec<IndexedImage>, ReferenceError> {
    let kind_dir = references_dir.join(kind.dir_name());
    if !kind_dir.is_dir() {
        return Ok(Vec::new());
    }
    let base = references_dir.parent().unwrap_or(references_dir);

    let mut images = Vec::new();
    let mut categories: Vec<PathBuf> = std::fs::read_dir(&kind_dir)
        .map_err(|e| ReferenceError::IndexUnreadable {
            path: kind_dir.display().to_string(),
            reason: e.to_string(),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    categories.sort();

    for category_dir in categories {
        let index_path = category_dir.join("index.json");
        if !index_path.is_file() {
            continue;
        }
        let raw = std::fs::read_to_string(&index_path).map_err(|e| {
            ReferenceError::IndexUnreadable {
                path: index_path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let entries: Vec<IndexEntry> =
            serde_json::from_str(&raw).map_err(|e| ReferenceError::IndexUnreadable {
                path: index_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let category = category_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let words = category_words(&category);

        for entry in entries {
            let resolved = resolve_entry_path(&entry, base, &category_dir);
            let Some(path) = resolved else {
                tracing::warn!(
                    index = %index_path.display(),
                    "index entry has no resolvable path, skipping"
                );
                continue;
            };
            images.push(IndexedImage {
                path,
                tags: normalize_tags(&entry.tags),
                quality: entry.quality.unwrap_or(5.0),
                category_words: words.clone(),
            });
        }
    }
    Ok(images)
}

fn resolve_entry_path(entry: &IndexEntry, base: &Path, category_dir: &Path) -> Option<PathBuf> {
    if let Some(rel) = entry.relative_path.as_deref().filter(|r| !r.is_empty()) {
        let from_base = base.join(rel);
        if from_base.exists() {
            return Some(from_base);
        }
        let from_category = category_dir.join(rel);
        if from_category.exists() {
            return Some(from_category);
        }
        return Some(from_base);
    }
    // Deprecated: absolute path from older index builds.
    entry
        .local_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

fn load_guides(styles_dir: &Path, kind: ReferenceKind) -> Result<Vec<Styleguide>, ReferenceError> {
    let kind_dir = styles_dir.join(kind.dir_name());
    if !kind_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&kind_dir)
        .map_err(|e| ReferenceError::IndexUnreadable {
            path: kind_dir.display().to_string(),
            reason: e.to_string(),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    paths.sort();

    let mut guides = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ReferenceError::IndexUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let category = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        guides.push(styleguide::parse(&path, &category, kind, &content)?);
    }
    Ok(guides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_index(dir: &Path, category: &str, entries: &str) {
        let cat = dir.join("references/logos").join(category);
        fs::create_dir_all(&cat).unwrap();
        fs::write(cat.join("index.json"), entries).unwrap();
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn lookup_scores_category_membership_double() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("references/logos/industry_tech/a.png"));
        touch(&root.join("references/logos/style_organic/b.png"));
        write_index(
            root,
            "industry_tech",
            r#"[{"relative_path": "references/logos/industry_tech/a.png", "tags": ["minimal"], "quality": 5}]"#,
        );
        write_index(
            root,
            "style_organic",
            r#"[{"relative_path": "references/logos/style_organic/b.png", "tags": ["tech", "minimal"], "quality": 9}]"#,
        );

        let index =
            ReferenceIndex::load(&root.join("references"), &root.join("styles")).unwrap();
        let hits = index.lookup_references(
            &["tech".to_string(), "minimal".to_string()],
            ReferenceKind::Logo,
            2,
        );
        assert_eq!(hits.len(), 2);
        // Category-folder match (×2) + tag overlap beats two tag overlaps.
        assert!(hits[0].ends_with("industry_tech/a.png"), "{hits:?}");
    }

    #[test]
    fn lookup_is_deterministic_on_ties() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("references/logos/cat/a.png"));
        touch(&root.join("references/logos/cat/b.png"));
        write_index(
            root,
            "cat",
            r#"[
                {"relative_path": "references/logos/cat/b.png", "tags": ["bold"], "quality": 5},
                {"relative_path": "references/logos/cat/a.png", "tags": ["bold"], "quality": 5}
            ]"#,
        );
        let index =
            ReferenceIndex::load(&root.join("references"), &root.join("styles")).unwrap();
        let hits = index.lookup_references(&["bold".to_string()], ReferenceKind::Logo, 2);
        assert!(hits[0].ends_with("cat/a.png"));
        assert!(hits[1].ends_with("cat/b.png"));
    }

    #[test]
    fn legacy_local_path_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let legacy = root.join("elsewhere/logo.png");
        touch(&legacy);
        write_index(
            root,
            "cat",
            &format!(
                r#"[{{"local_path": "{}", "tags": ["bold"], "quality": 5}}]"#,
                legacy.display()
            ),
        );
        let index =
            ReferenceIndex::load(&root.join("references"), &root.join("styles")).unwrap();
        let hits = index.lookup_references(&["bold".to_string()], ReferenceKind::Logo, 1);
        assert_eq!(hits, vec![legacy]);
    }

    #[test]
    fn irrelevant_entries_are_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("references/logos/cat/a.png"));
        write_index(
            root,
            "cat",
            r#"[{"relative_path": "references/logos/cat/a.png", "tags": ["organic"], "quality": 10}]"#,
        );
        let index =
            ReferenceIndex::load(&root.join("references"), &root.join("styles")).unwrap();
        assert!(index
            .lookup_references(&["fintech".to_string()], ReferenceKind::Logo, 5)
            .is_empty());
    }

    #[test]
    fn malformed_index_is_a_startup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_index(root, "cat", "not json");
        let result = ReferenceIndex::load(&root.join("references"), &root.join("styles"));
        assert!(matches!(
            result,
            Err(ReferenceError::IndexUnreadable { .. })
        ));
    }

    #[test]
    fn missing_library_is_empty_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let index = ReferenceIndex::load(
            &tmp.path().join("references"),
            &tmp.path().join("styles"),
        )
        .unwrap();
        assert!(index
            .lookup_references(&["tech".to_string()], ReferenceKind::Logo, 3)
            .is_empty());
        assert!(index
            .lookup_styleguide(&["tech".to_string()], ReferenceKind::Pattern)
            .is_none());
    }
}
