//! Capability contracts for the AI models the pipeline consumes. Stages
//! depend only on these traits; the concrete provider lives in `gemini` and
//! tests substitute mocks.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;

pub mod gemini;
pub mod ladder;
pub mod retry;

pub use ladder::ImageLadder;
pub use retry::RetryPolicy;

use crate::error::ModelError;

// ─── Shared call types ───────────────────────────────────────────────────────

/// An image attached to a multimodal call, with the caption shown to the
/// model immediately before it.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    Square,
    Wide,
    Tall,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Wide => "16:9",
            Self::Tall => "9:16",
        }
    }
}

/// Full input to an image-generation call. The ladder forwards this
/// unchanged from rung to rung.
#[derive(Debug, Clone)]
pub struct ImagePrompt {
    pub text: String,
    pub aspect_ratio: AspectRatio,
    pub attachments: Vec<ImageRef>,
}

impl ImagePrompt {
    pub fn new(text: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            text: text.into(),
            aspect_ratio,
            attachments: Vec::new(),
        }
    }
}

/// Per-call trace record. Emitted through `tracing` by the retry and ladder
/// layers so every model interaction is observable.
#[derive(Debug, Clone, Serialize)]
pub struct CallTrace {
    pub stage: String,
    pub model: String,
    pub latency_ms: u64,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Ok,
    Failed,
}

pub(crate) fn emit_trace(stage: &str, model: &str, started: Instant, outcome: CallOutcome) {
    let latency_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        stage,
        model,
        latency_ms,
        outcome = ?outcome,
        "model call"
    );
}

// ─── Capability traits ───────────────────────────────────────────────────────

/// Text generation with optional JSON-schema-constrained output.
#[async_trait]
pub trait TextModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_text(&self, system: Option<&str>, user: &str) -> anyhow::Result<String>;

    /// Structured output: the provider is asked for JSON conforming to
    /// `schema` and the raw value is returned for the caller to deserialize.
    async fn generate_json(
        &self,
        system: Option<&str>,
        user: &str,
        schema: &Value,
    ) -> anyhow::Result<Value>;
}

/// Vision analysis producing schema-constrained JSON.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze_json(
        &self,
        prompt: &str,
        images: &[ImageRef],
        schema: &Value,
    ) -> anyhow::Result<Value>;
}

/// Image generation returning raw encoded image bytes.
#[async_trait]
pub trait ImageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_image(&self, prompt: &ImagePrompt) -> anyhow::Result<Vec<u8>>;
}

// ─── Structured-output helper ────────────────────────────────────────────────

/// Call the text model for schema-constrained output, deserialize into `T`,
/// and run the optional post-parse validator. Parse or validation failures
/// are fed back to the model as repair prompts, up to `repairs` extra
/// attempts; persistent failure surfaces as `ModelError::SchemaViolation`.
pub async fn structured<T: DeserializeOwned>(
    model: &dyn TextModel,
    stage: &str,
    system: Option<&str>,
    user: &str,
    schema: &Value,
    repairs: u32,
    validate: impl Fn(&T) -> Result<(), String>,
) -> Result<T, ModelError> {
    let mut prompt = user.to_string();
    let mut last_error = String::new();
    let attempts = repairs + 1;

    for attempt in 0..attempts {
        let started = Instant::now();
        let value = match model.generate_json(system, &prompt, schema).await {
            Ok(value) => {
                emit_trace(stage, model.name(), started, CallOutcome::Ok);
                value
            }
            Err(err) => {
                emit_trace(stage, model.name(), started, CallOutcome::Failed);
                return Err(ModelError::Request {
                    model: model.name().to_string(),
                    message: err.to_string(),
                });
            }
        };

        let problem = match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => match validate(&parsed) {
                Ok(()) => return Ok(parsed),
                Err(reason) => reason,
            },
            Err(err) => err.to_string(),
        };

        tracing::warn!(
            stage,
            attempt = attempt + 1,
            attempts,
            problem = problem.as_str(),
            "structured output failed validation, requesting repair"
        );
        last_error = problem;
        prompt = format!(
            "{user}\n\n---\nYour previous output was rejected: {last_error}\n\
             Return corrected JSON that satisfies the schema and every stated constraint. \
             JSON only, no commentary."
        );
    }

    Err(ModelError::SchemaViolation {
        stage: stage.to_string(),
        attempts,
        message: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        value: u32,
    }

    struct ScriptedText {
        calls: Arc<AtomicUsize>,
        responses: Vec<Value>,
    }

    #[async_trait]
    impl TextModel for ScriptedText {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(&self, _system: Option<&str>, _user: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _system: Option<&str>,
            _user: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses[i.min(self.responses.len() - 1)].clone())
        }
    }

    #[tokio::test]
    async fn structured_parses_first_valid_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = ScriptedText {
            calls: Arc::clone(&calls),
            responses: vec![serde_json::json!({"value": 7})],
        };
        let record: Record = structured(
            &model,
            "test",
            None,
            "give value",
            &serde_json::json!({}),
            2,
            |_| Ok(()),
        )
        .await
        .unwrap();
        assert_eq!(record, Record { value: 7 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn structured_repairs_after_parse_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = ScriptedText {
            calls: Arc::clone(&calls),
            responses: vec![
                serde_json::json!({"wrong": true}),
                serde_json::json!({"value": 3}),
            ],
        };
        let record: Record = structured(
            &model,
            "test",
            None,
            "give value",
            &serde_json::json!({}),
            2,
            |_| Ok(()),
        )
        .await
        .unwrap();
        assert_eq!(record.value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn structured_counts_validator_rejections_as_repairs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = ScriptedText {
            calls: Arc::clone(&calls),
            responses: vec![serde_json::json!({"value": 0})],
        };
        let result: Result<Record, _> = structured(
            &model,
            "test",
            None,
            "give value",
            &serde_json::json!({}),
            2,
            |r: &Record| {
                if r.value == 0 {
                    Err("value must be non-zero".to_string())
                } else {
                    Ok(())
                }
            },
        )
        .await;
        match result {
            Err(ModelError::SchemaViolation { attempts, message, .. }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("non-zero"));
            }
            other => panic!("expected schema violation, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
