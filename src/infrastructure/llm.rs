//! Hosted model client (OpenAI-compatible chat completions API).

use crate::config::Settings;
use crate::errors::GenerationError;
use crate::infrastructure::traits::{LlmClient, PromptMessage};
use async_trait::async_trait;
use di::Ref;
use di::inject;
use di::injectable;
use log::debug;
use serde_json::Value;

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[injectable(LlmClient)]
impl OpenAiClient {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> OpenAiClient {
        let model = &settings.model;
        OpenAiClient {
            api_key: model.api_key.clone(),
            base_url: model.base_url.clone(),
            model: model.model.clone(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            client: reqwest::Client::new(),
        }
    }
}

impl OpenAiClient {
    fn parse_response(json: &Value) -> Result<String, GenerationError> {
        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_owned())
            .ok_or_else(|| {
                GenerationError::Provider("missing choices[0].message.content".to_owned())
            })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, GenerationError> {
        let wire_messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        debug!("model call: {} messages to {}", messages.len(), self.model);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?
            .error_for_status()
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        let json: Value = resp
            .json()
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        Self::parse_response(&json)
    }
}
