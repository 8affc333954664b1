//! Image-generation fallback ladder. Each rung gets the full retry policy;
//! a rung that fails non-transiently or exhausts its retries hands the
//! unchanged prompt to the next model. Failure after the last rung is fatal
//! for the call; callers decide whether to degrade.

use super::retry::{with_retry, RetryPolicy};
use super::{emit_trace, CallOutcome, ImageModel, ImagePrompt};
use crate::error::ModelError;
use std::sync::Arc;
use std::time::Instant;

pub struct ImageLadder {
    rungs: Vec<Arc<dyn ImageModel>>,
    policy: RetryPolicy,
}

impl ImageLadder {
    pub fn new(rungs: Vec<Arc<dyn ImageModel>>) -> Self {
        Self {
            rungs,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Generate image bytes, walking the ladder until a rung succeeds.
    pub async fn generate(
        &self,
        stage: &str,
        prompt: &ImagePrompt,
    ) -> Result<Vec<u8>, ModelError> {
        let mut failures: Vec<String> = Vec::new();

        for rung in &self.rungs {
            let started = Instant::now();
            let result = with_retry(&self.policy, stage, rung.name(), |_| {
                rung.generate_image(prompt)
            })
            .await;

            match result {
                Ok(bytes) if !bytes.is_empty() => {
                    emit_trace(stage, rung.name(), started, CallOutcome::Ok);
                    return Ok(bytes);
                }
                Ok(_) => {
                    emit_trace(stage, rung.name(), started, CallOutcome::Failed);
                    failures.push(format!("{}: empty image payload", rung.name()));
                }
                Err(err) => {
                    emit_trace(stage, rung.name(), started, CallOutcome::Failed);
                    failures.push(format!("{}: {err}", rung.name()));
                }
            }
            tracing::warn!(stage, model = rung.name(), "advancing to next image model");
        }

        Err(ModelError::FallbackExhausted {
            stage: stage.to_string(),
            tried: if failures.is_empty() {
                "no models configured".to_string()
            } else {
                failures.join("; ")
            },
        })
    }
}
