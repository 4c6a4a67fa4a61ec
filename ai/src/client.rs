//! HTTP client for the generateContent endpoint
//!
//! Stateless apart from the pooled connection: each call sends one user
//! turn and reads back the first candidate's first text part.

use async_trait::async_trait;
use imlo_ledger::{ReceiptVerification, ReceiptVerificationRequest, ReceiptVerifier};
use imlo_spelling::{FallbackError, SpellingFallback, SpellingRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::prompts;
use crate::verification::{parse_verification, VERIFICATION_FAILED_REASON};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Some freedom to rephrase broken words
    pub const SPELLING: Self = Self {
        temperature: 0.7,
        top_p: Some(0.7),
        max_output_tokens: 500,
    };

    /// Near-deterministic structured answers
    pub const VERIFICATION: Self = Self {
        temperature: 0.1,
        top_p: None,
        max_output_tokens: 500,
    };
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Trimmed text of the first part of the first candidate, empty when absent
    pub(crate) fn first_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        log::info!(
            "🤖 Generative client initialized: {} ({})",
            config.endpoint,
            config.model
        );
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the model's text answer
    pub async fn generate(
        &self,
        prompt: &str,
        generation: GenerationConfig,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        log::debug!("→ POST {}", url);

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: generation,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!("❌ generateContent failed: {}", response.status());
            return Err(ClientError::http(response.status().as_u16()));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(parsed.first_text())
    }
}

#[async_trait]
impl SpellingFallback for GeminiClient {
    async fn complete(
        &self,
        request: &SpellingRequest,
    ) -> std::result::Result<String, FallbackError> {
        let prompt = prompts::spelling_prompt(request);
        let text = self.generate(&prompt, GenerationConfig::SPELLING).await?;
        Ok(text)
    }
}

#[async_trait]
impl ReceiptVerifier for GeminiClient {
    async fn verify_receipt(&self, request: &ReceiptVerificationRequest) -> ReceiptVerification {
        let prompt = prompts::verification_prompt(request);
        match self.generate(&prompt, GenerationConfig::VERIFICATION).await {
            Ok(text) => parse_verification(&text, request),
            Err(e) => {
                log::warn!(
                    "Receipt verification for {} failed: {}",
                    request.payment_code,
                    e
                );
                ReceiptVerification::failed(request, VERIFICATION_FAILED_REASON)
            }
        }
    }
}
