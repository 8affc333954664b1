//! Best-effort market research. One structured call, hard wall-clock cap;
//! timeout or failure yields an empty summary the Director tolerates.

use crate::brief::Brief;
use crate::model::TextModel;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSummary {
    #[serde(default)]
    pub positioning: String,
    #[serde(default)]
    pub design_language: String,
    #[serde(default)]
    pub common_tropes: String,
}

impl ResearchSummary {
    pub fn is_empty(&self) -> bool {
        self.positioning.is_empty()
            && self.design_language.is_empty()
            && self.common_tropes.is_empty()
    }

    /// Block appended to the Director's user message.
    pub fn to_director_context(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(
            "## MARKET RESEARCH CONTEXT\n\
             Competitive positioning: {}\n\
             Category design language: {}\n\
             Common visual tropes (candidates to avoid or subvert): {}",
            self.positioning, self.design_language, self.common_tropes
        )
    }
}

const RESEARCH_SYSTEM: &str = "\
You are a senior brand strategist. Given a brand brief, summarize the \
competitive landscape it implies: how the category positions itself, what \
its design language looks like, and which visual tropes are so common they \
have become noise. Be specific and compact.";

pub struct ResearchStage {
    text: Arc<dyn TextModel>,
    timeout: Duration,
}

impl ResearchStage {
    pub fn new(text: Arc<dyn TextModel>, timeout: Duration) -> Self {
        Self { text, timeout }
    }

    /// Run the research call under the stage timeout. Never fails: every
    /// error path returns the empty summary.
    pub async fn run(&self, brief: &Brief) -> ResearchSummary {
        let schema = json!({
            "type": "object",
            "properties": {
                "positioning": {"type": "string"},
                "design_language": {"type": "string"},
                "common_tropes": {"type": "string"}
            },
            "required": ["positioning", "design_language", "common_tropes"]
        });
        let prompt = format!(
            "{}\n\nKeywords: {}\n\nSummarize the market context for this brand.",
            brief.to_prompt_block(),
            brief.keyword_line()
        );

        let call = self.text.generate_json(Some(RESEARCH_SYSTEM), &prompt, &schema);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => match serde_json::from_value::<ResearchSummary>(value) {
                Ok(summary) => {
                    tracing::info!(
                        chars = summary.to_director_context().len(),
                        "research context ready"
                    );
                    summary
                }
                Err(err) => {
                    tracing::warn!(error = %err, "research output malformed, continuing without");
                    ResearchSummary::default()
                }
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "research call failed, continuing without");
                ResearchSummary::default()
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "research timed out");
                ResearchSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextModel;
    use async_trait::async_trait;
    use serde_json::Value;

    struct SlowText {
        delay: Duration,
    }

    #[async_trait]
    impl TextModel for SlowText {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_text(&self, _s: Option<&str>, _u: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _s: Option<&str>,
            _u: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            tokio::time::sleep(self.delay).await;
            Ok(json!({
                "positioning": "late",
                "design_language": "late",
                "common_tropes": "late"
            }))
        }
    }

    fn brief() -> Brief {
        Brief {
            brand_name: "NuRange".to_string(),
            ..Brief::default()
        }
    }

    #[tokio::test]
    async fn timeout_yields_empty_summary() {
        let stage = ResearchStage::new(
            Arc::new(SlowText {
                delay: Duration::from_millis(200),
            }),
            Duration::from_millis(20),
        );
        let summary = stage.run(&brief()).await;
        assert!(summary.is_empty());
        assert_eq!(summary.to_director_context(), "");
    }

    #[tokio::test]
    async fn fast_call_produces_context() {
        let stage = ResearchStage::new(
            Arc::new(SlowText {
                delay: Duration::from_millis(1),
            }),
            Duration::from_secs(5),
        );
        let summary = stage.run(&brief()).await;
        assert!(!summary.is_empty());
        assert!(summary.to_director_context().contains("MARKET RESEARCH CONTEXT"));
    }
}
