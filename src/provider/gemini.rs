//! Google Gemini backend (secondary provider)
//!
//! Gemini has no first-class system role in `contents`, so the request is
//! reshaped:
//! - system messages are merged into `systemInstruction.parts[0].text`
//! - `assistant` turns become `model`, `user` turns stay `user`
//! - each turn's text is wrapped as `parts: [{ text }]`
//!
//! The reply is read from `candidates[0].content.parts[0].text`.

use super::backend::{ensure_success, ChatBackend};
use super::types::{ChatMessage, ChatOptions, NormalizedResponse, ProviderId, Role};
use crate::error::{Error, Result};
use crate::settings::Credential;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<Credential>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
    }
}

/// Reshape provider-neutral messages into a Gemini request.
pub(crate) fn to_gemini_request(messages: &[ChatMessage], options: &ChatOptions) -> GenerateRequest {
    let mut system: Option<String> = None;
    let mut contents = Vec::with_capacity(messages.len());

    for msg in messages {
        let role = match msg.role {
            Role::System => {
                system = Some(match system.take() {
                    Some(prev) => format!("{}\n\n{}", prev, msg.content),
                    None => msg.content.clone(),
                });
                continue;
            }
            Role::Assistant => "model",
            Role::User => "user",
        };
        contents.push(Content {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(msg.content.clone()),
            }],
        });
    }

    GenerateRequest {
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part { text: Some(text) }],
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
        },
    }
}

impl GeminiBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<Credential>,
    ) -> Self {
        Self::with_client(Client::new(), base_url, model, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<Credential>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Secondary
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<NormalizedResponse> {
        let key = self.api_key.as_ref().filter(|k| !k.is_empty()).ok_or_else(|| {
            Error::Config(format!(
                "no API key configured for {}",
                self.provider().display_name()
            ))
        })?;

        let body = to_gemini_request(messages, options);
        let resp = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", key.expose())])
            .json(&body)
            .send()
            .await?;

        let reply: GenerateResponse = ensure_success(resp).await?.json().await?;
        NormalizedResponse::from_text(reply.into_text())
    }
}
