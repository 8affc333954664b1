//! Styleguide documents are a contract, not free text. The pattern guides
//! follow a rigid shape: `### For PATTERNS:` followed by numbered sections
//! carrying `**Dominant Motif Types**:`, `**Rendering**:` and `**Vibe**:`
//! values, and a trailing `Avoid` section rendered as bullet items. A
//! document that drifts from it fails at load time instead of silently
//! producing weaker prompts later.

use super::ReferenceKind;
use crate::error::ReferenceError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Styleguide {
    pub category: String,
    pub kind: ReferenceKind,
    /// Cleaned body of the kind-relevant section.
    pub body: String,
    /// Pattern guides only; empty for logo guides.
    pub motifs: String,
    pub rendering: String,
    pub vibe: String,
    pub avoid: Vec<String>,
}

impl Styleguide {
    /// Compact block injected into an image prompt.
    pub fn prompt_excerpt(&self) -> String {
        if self.kind == ReferenceKind::Pattern {
            let mut parts = vec![
                format!("Motifs: {}", self.motifs),
                format!("Style: {}", self.rendering),
                format!("Mood: {}", self.vibe),
            ];
            if !self.avoid.is_empty() {
                parts.push(format!("Avoid: {}.", self.avoid.join("; ")));
            }
            parts.join(" ")
        } else {
            self.body
                .lines()
                .filter(|l| !l.trim().is_empty())
                .take(30)
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn section_regex(kind: ReferenceKind) -> &'static Regex {
    static LOGOS: OnceLock<Regex> = OnceLock::new();
    static PATTERNS: OnceLock<Regex> = OnceLock::new();
    match kind {
        ReferenceKind::Logo => LOGOS.get_or_init(|| {
            Regex::new(r"(?is)#{2,3}\s+For\s+LOGOS:\s*\n(.*?)(?:\n#{2,3}\s+For\s|\z)").unwrap()
        }),
        ReferenceKind::Pattern => PATTERNS.get_or_init(|| {
            Regex::new(r"(?is)#{2,3}\s+For\s+PATTERNS:\s*\n(.*?)(?:\n#{2,3}\s+For\s|\z)").unwrap()
        }),
    }
}

fn field_regex(label: &str) -> Regex {
    // `1. **Label**: value`; the value runs to the next numbered section.
    Regex::new(&format!(
        r"(?s)\*\*{label}\*\*\s*:\s*(.+?)(?:\n\s*\d+\.|\z)"
    ))
    .unwrap()
}

fn avoid_items(section: &str) -> Option<Vec<String>> {
    // A numbered `Avoid` heading on its own line, then bullet items.
    static HEADING: OnceLock<Regex> = OnceLock::new();
    let heading = HEADING.get_or_init(|| {
        Regex::new(r"(?m)^\s*\d+\.\s*(?:\*\*)?Avoid(?:\*\*)?\s*:?\s*$").unwrap()
    });
    let m = heading.find(section)?;
    let rest = &section[m.end()..];
    let mut items = Vec::new();
    for line in rest.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(item) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('*')) {
            let item = item.trim().trim_end_matches('.').to_string();
            if !item.is_empty() {
                items.push(item);
            }
        } else {
            break;
        }
    }
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn clean_value(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse(
    path: &Path,
    category: &str,
    kind: ReferenceKind,
    content: &str,
) -> Result<Styleguide, ReferenceError> {
    let malformed = |reason: &str| ReferenceError::StyleguideMalformed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let body = match section_regex(kind).captures(content) {
        Some(caps) => caps[1].trim().to_string(),
        None if kind == ReferenceKind::Pattern => {
            return Err(malformed("missing `### For PATTERNS:` section"));
        }
        // Logo guides without a section marker are single-type documents.
        None => content.trim().to_string(),
    };

    if kind == ReferenceKind::Logo {
        return Ok(Styleguide {
            category: category.to_string(),
            kind,
            body,
            motifs: String::new(),
            rendering: String::new(),
            vibe: String::new(),
            avoid: Vec::new(),
        });
    }

    let motifs = field_regex("Dominant Motif Types")
        .captures(&body)
        .map(|c| clean_value(&c[1]))
        .ok_or_else(|| malformed("missing `**Dominant Motif Types**:` field"))?;
    let rendering = field_regex("Rendering(?: Style)?")
        .captures(&body)
        .map(|c| clean_value(&c[1]))
        .ok_or_else(|| malformed("missing `**Rendering**:` field"))?;
    let vibe = field_regex("(?:Vibe|Mood)")
        .captures(&body)
        .map(|c| clean_value(&c[1]))
        .ok_or_else(|| malformed("missing `**Vibe**:` field"))?;
    let avoid = avoid_items(&body)
        .ok_or_else(|| malformed("missing `Avoid` numbered section with bullet items"))?;

    Ok(Styleguide {
        category: category.to_string(),
        kind,
        body,
        motifs,
        rendering,
        vibe,
        avoid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PATTERN_GUIDE: &str = "\
---
category: pattern_geometric_repeat
---

### For PATTERNS:

1. **Dominant Motif Types**: interlocking diamonds, offset hex grids,
   stepped chevrons.
2. **Rendering**: flat vector, uniform stroke, no texture.
3. **Vibe**: precise, architectural, calm.
4. Avoid
- photographic elements
- random noise
- text of any kind
";

    fn parse_pattern(content: &str) -> Result<Styleguide, ReferenceError> {
        parse(
            Path::new("styles/patterns/pattern_geometric_repeat.md"),
            "pattern_geometric_repeat",
            ReferenceKind::Pattern,
            content,
        )
    }

    #[test]
    fn valid_pattern_guide_parses_all_fields() {
        let guide = parse_pattern(VALID_PATTERN_GUIDE).unwrap();
        assert!(guide.motifs.contains("interlocking diamonds"));
        assert_eq!(guide.rendering, "flat vector, uniform stroke, no texture.");
        assert_eq!(guide.vibe, "precise, architectural, calm.");
        assert_eq!(
            guide.avoid,
            vec!["photographic elements", "random noise", "text of any kind"]
        );
    }

    #[test]
    fn rendering_style_variant_is_accepted() {
        let content = VALID_PATTERN_GUIDE.replace("**Rendering**", "**Rendering Style**");
        assert!(parse_pattern(&content).is_ok());
    }

    #[test]
    fn mood_variant_is_accepted_for_vibe() {
        let content = VALID_PATTERN_GUIDE.replace("**Vibe**", "**Mood**");
        let guide = parse_pattern(&content).unwrap();
        assert_eq!(guide.vibe, "precise, architectural, calm.");
    }

    #[test]
    fn missing_section_header_fails() {
        let content = VALID_PATTERN_GUIDE.replace("### For PATTERNS:", "### Patterns");
        let err = parse_pattern(&content).unwrap_err();
        assert!(err.to_string().contains("For PATTERNS"));
    }

    #[test]
    fn missing_motifs_field_fails() {
        let content = VALID_PATTERN_GUIDE.replace("**Dominant Motif Types**", "**Motifs**");
        assert!(parse_pattern(&content).is_err());
    }

    #[test]
    fn inline_avoid_is_rejected() {
        let content = VALID_PATTERN_GUIDE.replace(
            "4. Avoid\n- photographic elements\n- random noise\n- text of any kind\n",
            "4. Avoid: photographic elements, random noise.\n",
        );
        let err = parse_pattern(&content).unwrap_err();
        assert!(err.to_string().contains("Avoid"));
    }

    #[test]
    fn pattern_excerpt_condenses_fields() {
        let guide = parse_pattern(VALID_PATTERN_GUIDE).unwrap();
        let excerpt = guide.prompt_excerpt();
        assert!(excerpt.contains("Motifs:"));
        assert!(excerpt.contains("Avoid: photographic elements;"));
    }

    #[test]
    fn logo_guide_without_marker_uses_whole_body() {
        let guide = parse(
            Path::new("styles/logos/industry_tech.md"),
            "industry_tech",
            ReferenceKind::Logo,
            "Keep marks reductive.\nPrefer geometric construction.",
        )
        .unwrap();
        assert!(guide.body.contains("reductive"));
        assert!(guide.prompt_excerpt().contains("geometric construction"));
    }

    #[test]
    fn logo_guide_extracts_its_section_when_both_present() {
        let content = "\
### For LOGOS:
Reductive, grid-built marks.

### For PATTERNS:
1. **Dominant Motif Types**: x.
2. **Rendering**: y.
3. **Vibe**: z.
4. Avoid
- nothing
";
        let guide = parse(
            Path::new("styles/logos/mixed.md"),
            "mixed",
            ReferenceKind::Logo,
            content,
        )
        .unwrap();
        assert!(guide.body.contains("grid-built"));
        assert!(!guide.body.contains("Dominant Motif"));
    }
}
