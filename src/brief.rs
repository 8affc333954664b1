//! Brief ingress record. The conversational frontend and brief parser live
//! outside this crate; they deliver this structure with validated field
//! types, and the runner refuses malformed briefs at ingress.

use crate::error::BriefError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Copy the client has locked in the brief. When any field is present the
/// Director must reproduce it verbatim in every direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedCopy {
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub slogan: Option<String>,
    #[serde(default)]
    pub announcement: Option<String>,
}

impl LockedCopy {
    pub fn is_empty(&self) -> bool {
        self.tagline.is_none() && self.slogan.is_none() && self.announcement.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    pub brand_name: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub competitors: String,
    #[serde(default)]
    pub core_promise: String,
    /// Ordered, user-provided; may be empty.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub moodboard_images: Vec<PathBuf>,
    #[serde(default)]
    pub style_ref_images: Vec<PathBuf>,
    #[serde(default)]
    pub locked_copy: Option<LockedCopy>,
}

impl Brief {
    /// Ingress validation. A brief without a brand name cannot drive any
    /// stage; keyword entries must be short tokens, not paragraphs.
    pub fn validate(&self) -> Result<(), BriefError> {
        if self.brand_name.trim().is_empty() {
            return Err(BriefError::MissingField("brand_name"));
        }
        for kw in &self.keywords {
            if kw.trim().is_empty() {
                return Err(BriefError::InvalidField {
                    field: "keywords",
                    reason: "empty keyword entry".to_string(),
                });
            }
            if kw.len() > 64 {
                return Err(BriefError::InvalidField {
                    field: "keywords",
                    reason: format!("keyword too long: {:.24}…", kw),
                });
            }
        }
        Ok(())
    }

    pub fn locked(&self) -> Option<&LockedCopy> {
        self.locked_copy.as_ref().filter(|c| !c.is_empty())
    }

    /// Render the brief as the Director's user-message block, including the
    /// pre-written copy lock when present.
    pub fn to_prompt_block(&self) -> String {
        let mut parts: Vec<String> = vec!["## BRAND BRIEF".to_string()];
        parts.push(format!("Brand name: {}", self.brand_name));
        if !self.product_description.is_empty() {
            parts.push(format!("Product / service: {}", self.product_description));
        }
        if !self.target_audience.is_empty() {
            parts.push(format!("Target audience: {}", self.target_audience));
        }
        if !self.tone.is_empty() {
            parts.push(format!("Tone: {}", self.tone));
        }
        if !self.competitors.is_empty() {
            parts.push(format!("Competitors: {}", self.competitors));
        }
        if !self.core_promise.is_empty() {
            parts.push(format!("Core promise: {}", self.core_promise));
        }

        if !self.keywords.is_empty() {
            parts.push(String::new());
            parts.push("## BRAND KEYWORDS".to_string());
            for kw in &self.keywords {
                parts.push(format!("- {kw}"));
            }
        }

        if !self.moodboard_images.is_empty() {
            parts.push(String::new());
            parts.push(format!(
                "## VISUAL REFERENCES ({} image(s) attached)",
                self.moodboard_images.len()
            ));
            parts.push(
                "The client has provided reference images alongside this brief. \
                 They inform Option 2 (Designer-Led) most directly, but all \
                 directions should acknowledge the visual language they suggest."
                    .to_string(),
            );
        }

        if let Some(copy) = self.locked() {
            parts.push(String::new());
            parts.push("## PRE-WRITTEN COPY (use these exactly — do not rewrite)".to_string());
            if let Some(tagline) = &copy.tagline {
                parts.push(format!("Tagline: {tagline}"));
            }
            if let Some(slogan) = &copy.slogan {
                parts.push(format!("Ad slogan: {slogan}"));
            }
            if let Some(announcement) = &copy.announcement {
                parts.push(format!("Announcement copy: {announcement}"));
            }
            parts.push(String::new());
            parts.push(
                "The copy fields above are LOCKED. Use them verbatim in \
                 tagline / ad_slogan / announcement_copy for ALL directions. \
                 Do not paraphrase, improve, or alter them."
                    .to_string(),
            );
        }

        parts.join("\n")
    }

    /// Compact keyword context used by the research and tag stages.
    pub fn keyword_line(&self) -> String {
        if self.keywords.is_empty() {
            "brand identity".to_string()
        } else {
            self.keywords.join(", ")
        }
    }
}
