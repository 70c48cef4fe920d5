
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatModel, Embedder, HttpClient, endpoint, require_key};
use crate::config::OpenAiConfig;
use crate::{AppError, Result};

/// Client for the OpenAI embeddings and chat-completions endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,
    batch_size: u32,
    api_key: Option<String>,
    api_key_env: String,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &OpenAiConfig, http: HttpClient) -> Self {
        Self {
            base_url: config.base_url.clone(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            batch_size: config.batch_size.max(1),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
            http,
        }
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn auth_header(&self) -> Result<String> {
        let key = require_key(self.api_key.as_deref(), &self.api_key_env)?;
        Ok(format!("Bearer {}", key))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let auth = self.auth_header()?;
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            AppError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        let response_text = self.http.post_json(
            &endpoint(&self.base_url, "embeddings"),
            &[("Authorization", auth.as_str())],
            &body,
        )?;

        let mut response: EmbeddingsResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                AppError::Embedding(format!("Failed to parse embedding response: {}", e))
            })?;

        if response.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiClient {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts with {} in batches of {}",
            texts.len(),
            self.embedding_model,
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_batch(batch)?);
        }

        Ok(vectors)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| AppError::Embedding("Empty embedding response".to_string()))
    }
}

impl ChatModel for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let auth = self.auth_header()?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            AppError::Completion(format!("Failed to serialize chat request: {}", e))
        })?;

        debug!("Requesting completion from {}", self.chat_model);

        let response_text = self.http.post_json(
            &endpoint(&self.base_url, "chat/completions"),
            &[("Authorization", auth.as_str())],
            &body,
        )?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| AppError::Completion(format!("Failed to parse chat response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::Completion("Model returned an empty answer".to_string()))
    }
}
