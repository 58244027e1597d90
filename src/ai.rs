//! OpenAI-backed chat completion and image generation.
//!
//! The gateway only depends on the [`AiProvider`] trait; the HTTP client
//! lives behind it so tests can substitute a mock.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serenity::async_trait;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// External AI capabilities consumed by the dispatch gateway
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Produce a chat completion for the prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Generate an image for the prompt and return its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    chat_model: String,
    image_model: String,
    image_size: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        image_model: impl Into<String>,
        image_size: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        OpenAiClient {
            http,
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            image_model: image_model.into(),
            image_size: image_size.into(),
        }
    }

    async fn post_json<T>(&self, url: &str, body: &impl Serialize) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("request to OpenAI failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenAI API error ({status}): {}",
                body.chars().take(200).collect::<String>()
            );
        }

        response
            .json::<T>()
            .await
            .context("failed to parse OpenAI response")
    }
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionsRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatCompletionsResponse = self
            .post_json(&format!("{OPENAI_BASE_URL}/chat/completions"), &request)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImagesRequest {
            model: &self.image_model,
            prompt,
            size: &self.image_size,
            quality: "standard",
            n: 1,
        };

        let response: ImagesResponse = self
            .post_json(&format!("{OPENAI_BASE_URL}/images/generations"), &request)
            .await?;

        response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or_else(|| anyhow::anyhow!("image generation returned no URL"))
    }
}
