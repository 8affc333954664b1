use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration. Built with defaults, then overlaid with
/// environment overrides so deployments can tune concurrency and endpoints
/// without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// API key consumed by the model clients. Opaque to the engine.
    pub api_key: Option<String>,
    /// Base endpoint for text / vision calls.
    pub text_endpoint: String,
    /// Base endpoint for image generation calls.
    pub image_endpoint: String,

    /// Text model used for structured stages (director, tags, research).
    pub text_model: String,
    /// Vision model used for Style-DNA extraction.
    pub vision_model: String,
    /// Image generation ladder: primary first, then ordered fallbacks.
    pub image_models: Vec<String>,

    pub max_logo_concurrency: usize,
    pub max_mockup_concurrency: usize,
    pub research_timeout_ms: u64,
    /// Per-mockup cap including retries.
    pub mockup_item_timeout_ms: u64,

    pub references_dir: PathBuf,
    pub styles_dir: PathBuf,
    pub mockups_dir: PathBuf,
    pub output_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_endpoint: "https://generativelanguage.googleapis.com".to_string(),
            image_endpoint: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            vision_model: "gemini-2.5-flash".to_string(),
            image_models: vec![
                "gemini-2.5-flash-image".to_string(),
                "gemini-3-pro-image-preview".to_string(),
                "gemini-2.0-flash-exp-image-generation".to_string(),
            ],
            max_logo_concurrency: 4,
            max_mockup_concurrency: 10,
            research_timeout_ms: 30_000,
            mockup_item_timeout_ms: 180_000,
            references_dir: PathBuf::from("references"),
            styles_dir: PathBuf::from("styles"),
            mockups_dir: PathBuf::from("mockups"),
            output_root: PathBuf::from("outputs"),
        }
    }
}

impl PipelineConfig {
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) =
            std::env::var("BRANDFORGE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"))
        {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Ok(endpoint) = std::env::var("BRANDFORGE_TEXT_ENDPOINT") {
            if !endpoint.is_empty() {
                self.text_endpoint = endpoint;
            }
        }

        if let Ok(endpoint) = std::env::var("BRANDFORGE_IMAGE_ENDPOINT") {
            if !endpoint.is_empty() {
                self.image_endpoint = endpoint;
            }
        }

        if let Ok(raw) = std::env::var("MAX_LOGO_CONCURRENCY") {
            if let Ok(n) = raw.parse::<usize>() {
                if (1..=64).contains(&n) {
                    self.max_logo_concurrency = n;
                }
            }
        }

        if let Ok(raw) = std::env::var("MAX_MOCKUP_CONCURRENCY") {
            if let Ok(n) = raw.parse::<usize>() {
                if (1..=64).contains(&n) {
                    self.max_mockup_concurrency = n;
                }
            }
        }

        if let Ok(raw) = std::env::var("RESEARCH_TIMEOUT_MS") {
            if let Ok(ms) = raw.parse::<u64>() {
                if ms > 0 {
                    self.research_timeout_ms = ms;
                }
            }
        }

        if let Ok(dir) = std::env::var("BRANDFORGE_REFERENCES_DIR") {
            if !dir.is_empty() {
                self.references_dir = PathBuf::from(dir);
            }
        }

        if let Ok(dir) = std::env::var("BRANDFORGE_STYLES_DIR") {
            if !dir.is_empty() {
                self.styles_dir = PathBuf::from(dir);
            }
        }

        if let Ok(dir) = std::env::var("BRANDFORGE_MOCKUPS_DIR") {
            if !dir.is_empty() {
                self.mockups_dir = PathBuf::from(dir);
            }
        }

        if let Ok(dir) = std::env::var("BRANDFORGE_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.output_root = PathBuf::from(dir);
            }
        }
    }

    pub fn research_timeout(&self) -> Duration {
        Duration::from_millis(self.research_timeout_ms)
    }

    pub fn mockup_item_timeout(&self) -> Duration {
        Duration::from_millis(self.mockup_item_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_ceilings() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_logo_concurrency, 4);
        assert_eq!(config.max_mockup_concurrency, 10);
        assert_eq!(config.research_timeout_ms, 30_000);
        assert!(!config.image_models.is_empty());
    }

    #[test]
    fn env_override_rejects_out_of_range_concurrency() {
        let mut config = PipelineConfig::default();
        std::env::set_var("MAX_LOGO_CONCURRENCY", "0");
        config.apply_env_overrides();
        std::env::remove_var("MAX_LOGO_CONCURRENCY");
        assert_eq!(config.max_logo_concurrency, 4);
    }

    #[test]
    fn env_override_applies_valid_values() {
        let mut config = PipelineConfig::default();
        std::env::set_var("RESEARCH_TIMEOUT_MS", "5000");
        config.apply_env_overrides();
        std::env::remove_var("RESEARCH_TIMEOUT_MS");
        assert_eq!(config.research_timeout_ms, 5000);
    }
}
