//! Google Gemini API client implementation
//!
//! Talks to the `generateContent` endpoint of the Generative Language API, or
//! to any endpoint with the same shape when a base URL is configured.

use crate::config::{CredentialResolver, LlmConfig, LlmProvider, ModelParameters};
use crate::core_types::{LLMResponse, Message, Role, Usage};
use crate::errors::AssistantError;
use crate::llm::LLM;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key. The key is never part of the request URL.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini API client
pub struct GeminiClient {
    credentials: CredentialResolver,
    model: String,
    parameters: ModelParameters,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(credentials: CredentialResolver, model: String) -> Self {
        Self::with_base_url(credentials, model, DEFAULT_BASE_URL.to_string())
    }

    /// Create a new Gemini client with custom base URL
    pub fn with_base_url(credentials: CredentialResolver, model: String, base_url: String) -> Self {
        Self {
            credentials,
            model,
            parameters: ModelParameters::default(),
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "safetySettings", skip_serializing_if = "Option::is_none")]
    safety_settings: Option<Value>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "stopSequences", skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<i32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<i32>,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    code: u16,
    message: String,
}

fn text_content(role: Option<&str>, text: String) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![GeminiPart { text: Some(text) }],
    }
}

impl GeminiClient {
    fn convert_messages_to_gemini_contents(
        &self,
        messages: Vec<Message>,
    ) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_instruction = self
            .parameters
            .system_message
            .clone()
            .map(|text| text_content(None, text));
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                // Use the last system message as system instruction
                Role::System => system_instruction = Some(text_content(None, message.content)),
                Role::User => contents.push(text_content(Some("user"), message.content)),
                Role::Assistant => contents.push(text_content(Some("model"), message.content)),
            }
        }

        (system_instruction, contents)
    }

    fn convert_gemini_response_to_llm(
        &self,
        response: GeminiResponse,
    ) -> Result<LLMResponse, AssistantError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::LLMError("No candidates in Gemini response".to_string()))?;

        let content_parts: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let content = if content_parts.is_empty() {
            None
        } else {
            Some(content_parts.join(""))
        };

        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0) as u32,
            completion_tokens: u.candidates_token_count.unwrap_or(0) as u32,
            total_tokens: u.total_token_count.unwrap_or(0) as u32,
        });

        Ok(LLMResponse {
            content,
            finish_reason: candidate.finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl LLM for GeminiClient {
    async fn generate(&self, messages: Vec<Message>) -> Result<LLMResponse, AssistantError> {
        let api_key = self.credentials.resolve().await?;
        let (system_instruction, contents) = self.convert_messages_to_gemini_contents(messages);

        let generation_config = GeminiGenerationConfig {
            temperature: self.parameters.temperature,
            max_output_tokens: self.parameters.max_tokens,
            top_p: self.parameters.top_p,
            stop_sequences: self.parameters.stop_sequences.clone(),
        };

        let request = GeminiRequest {
            contents,
            generation_config,
            safety_settings: self.parameters.safety_settings.clone(),
            system_instruction,
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        log::debug!("Sending Gemini request for model {} to {}", self.model, url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key.as_str())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AssistantError::LLMError(format!(
                    "Gemini API request failed: {}",
                    e.without_url()
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(AssistantError::LLMError(format!(
                    "Gemini API error {}: {}",
                    gemini_error.error.code, gemini_error.error.message
                )));
            }

            return Err(AssistantError::LLMError(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            AssistantError::ParsingError(format!("Failed to parse Gemini response: {}", e))
        })?;

        let llm_response = self.convert_gemini_response_to_llm(gemini_response)?;
        if let Some(usage) = &llm_response.usage {
            log::debug!(
                "Gemini usage: prompt={} completion={} total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        Ok(llm_response)
    }
}

/// Create a Gemini LLM client from configuration
pub fn create_client(
    config: &LlmConfig,
    credentials: CredentialResolver,
) -> Result<Arc<dyn LLM>, AssistantError> {
    let client = match (&config.provider, &config.base_url) {
        (_, Some(base_url)) => {
            GeminiClient::with_base_url(credentials, config.model.clone(), base_url.clone())
        }
        (LlmProvider::Gemini, None) => GeminiClient::new(credentials, config.model.clone()),
        (LlmProvider::Custom, None) => {
            return Err(AssistantError::ConfigError(
                "Custom provider requires a valid 'base_url'".to_string(),
            ))
        }
    };

    Ok(Arc::new(client.with_parameters(config.parameters.clone())))
}
