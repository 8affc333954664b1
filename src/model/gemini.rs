//! Gemini REST client implementing the three capability contracts over
//! `generateContent`. One pooled HTTP client is shared across the text,
//! vision, and image wrappers.

use super::{ImageModel, ImagePrompt, ImageRef, TextModel, VisionModel};
use crate::util::mime_for;
use anyhow::{bail, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub fn build_http_client() -> Client {
    build_http_client_with_timeout(120)
}

pub fn build_http_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    data: String,
}

// ─── Client core ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn text_model(&self, model: impl Into<String>) -> GeminiTextModel {
        GeminiTextModel {
            client: self.clone(),
            model: model.into(),
        }
    }

    pub fn vision_model(&self, model: impl Into<String>) -> GeminiVisionModel {
        GeminiVisionModel {
            client: self.clone(),
            model: model.into(),
        }
    }

    pub fn image_model(&self, model: impl Into<String>) -> GeminiImageModel {
        GeminiImageModel {
            client: self.clone(),
            model: model.into(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .context("request dispatch failed")?
            .error_for_status()
            .context("provider returned error status")?;

        let body: GenerateContentResponse =
            response.json().await.context("malformed provider response")?;
        if let Some(error) = &body.error {
            bail!(
                "provider error {}: {}",
                error.code.unwrap_or_default(),
                error.message.clone().unwrap_or_default()
            );
        }
        Ok(body)
    }
}

fn collect_text(response: &GenerateContentResponse) -> Option<String> {
    let mut out = String::new();
    for candidate in response.candidates.as_deref().unwrap_or_default() {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_deref())
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn collect_image(response: &GenerateContentResponse) -> Option<Vec<u8>> {
    for candidate in response.candidates.as_deref().unwrap_or_default() {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_deref())
            .unwrap_or_default();
        for part in parts {
            if let Some(inline) = &part.inline_data {
                if let Ok(bytes) = BASE64.decode(&inline.data) {
                    if !bytes.is_empty() {
                        return Some(bytes);
                    }
                }
            }
        }
    }
    None
}

/// Strip a markdown code fence from structured output. Some models wrap the
/// JSON payload even when a response mime type is requested.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end_matches('`').trim()
}

async fn load_attachment(image: &ImageRef) -> anyhow::Result<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(&image.path)
        .await
        .with_context(|| format!("reading attachment {}", image.path.display()))?;
    Ok((mime_for(Path::new(&image.path)).to_string(), bytes))
}

// ─── Capability impls ────────────────────────────────────────────────────────

pub struct GeminiTextModel {
    client: GeminiClient,
    model: String,
}

#[async_trait]
impl TextModel for GeminiTextModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, system: Option<&str>, user: &str) -> anyhow::Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(user)],
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            generation_config: None,
        };
        let response = self.client.generate(&self.model, &request).await?;
        collect_text(&response)
            .ok_or_else(|| anyhow::anyhow!("model {} returned no text", self.model))
    }

    async fn generate_json(
        &self,
        system: Option<&str>,
        user: &str,
        schema: &Value,
    ) -> anyhow::Result<Value> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(user)],
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                response_modalities: None,
            }),
        };
        let response = self.client.generate(&self.model, &request).await?;
        let raw = collect_text(&response)
            .ok_or_else(|| anyhow::anyhow!("model {} returned no text", self.model))?;
        serde_json::from_str(strip_fences(&raw)).context("structured output is not valid JSON")
    }
}

pub struct GeminiVisionModel {
    client: GeminiClient,
    model: String,
}

#[async_trait]
impl VisionModel for GeminiVisionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn analyze_json(
        &self,
        prompt: &str,
        images: &[ImageRef],
        schema: &Value,
    ) -> anyhow::Result<Value> {
        let mut parts = vec![Part::text(prompt)];
        for image in images {
            let (mime, bytes) = load_attachment(image).await?;
            if !image.label.is_empty() {
                parts.push(Part::text(&image.label));
            }
            parts.push(Part::image(&mime, &bytes));
        }
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                response_modalities: None,
            }),
        };
        let response = self.client.generate(&self.model, &request).await?;
        let raw = collect_text(&response)
            .ok_or_else(|| anyhow::anyhow!("model {} returned no text", self.model))?;
        serde_json::from_str(strip_fences(&raw)).context("vision output is not valid JSON")
    }
}

pub struct GeminiImageModel {
    client: GeminiClient,
    model: String,
}

#[async_trait]
impl ImageModel for GeminiImageModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_image(&self, prompt: &ImagePrompt) -> anyhow::Result<Vec<u8>> {
        let mut parts = vec![Part::text(format!(
            "{}\n\nOutput aspect ratio: {}. Image only — no captions.",
            prompt.text,
            prompt.aspect_ratio.as_str()
        ))];
        for image in &prompt.attachments {
            let (mime, bytes) = load_attachment(image).await?;
            if !image.label.is_empty() {
                parts.push(Part::text(&image.label));
            }
            parts.push(Part::image(&mime, &bytes));
        }
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
            }),
        };
        let response = self.client.generate(&self.model, &request).await?;
        collect_image(&response)
            .ok_or_else(|| anyhow::anyhow!("model {} returned no image", self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_handles_plain_and_fenced() {
        assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn request_serializes_camel_case_fields() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text("hi"), Part::image("image/png", &[1, 2])],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                response_mime_type: Some("application/json".to_string()),
                response_schema: None,
                response_modalities: None,
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("generationConfig"));
        assert!(json.contains("responseMimeType"));
        assert!(json.contains("inlineData"));
        assert!(json.contains("mimeType"));
    }

    #[test]
    fn collect_image_decodes_base64_payload() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": BASE64.encode([9u8, 9, 9])}}
                ]}
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert_eq!(collect_image(&parsed), Some(vec![9, 9, 9]));
        assert_eq!(collect_text(&parsed).as_deref(), Some("here you go"));
    }
}
