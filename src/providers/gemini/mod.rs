
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatModel, Embedder, HttpClient, endpoint, require_key};
use crate::config::GeminiConfig;
use crate::{AppError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini `batchEmbedContents` and `generateContent` endpoints
#[derive(Debug, Clone)]
pub struct GeminiClient {
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
#[serde(rename_all = "camelCase")]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &GeminiConfig, http: HttpClient) -> Self {
        Self {
            base_url: config.base_url.clone(),
            embedding_model: qualified_model(&config.embedding_model),
            chat_model: qualified_model(&config.chat_model),
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

    fn embed_batch(&self, texts: &[String], task_type: &'static str) -> Result<Vec<Vec<f32>>> {
        let key = require_key(self.api_key.as_deref(), &self.api_key_env)?;
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.embedding_model,
                    content: Content {
                        role: None,
                        parts: vec![Part { text }],
                    },
                    task_type,
                })
                .collect(),
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            AppError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        let url = endpoint(
            &self.base_url,
            &format!("{}:batchEmbedContents", self.embedding_model),
        );
        let response_text = self
            .http
            .post_json(&url, &[(API_KEY_HEADER, key)], &body)?;

        let response: BatchEmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            AppError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// Gemini addresses models as `models/<name>`
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

impl Embedder for GeminiClient {
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
            vectors.extend(self.embed_batch(batch, "RETRIEVAL_DOCUMENT")?);
        }

        Ok(vectors)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()], "RETRIEVAL_QUERY")?
            .pop()
            .ok_or_else(|| AppError::Embedding("Empty embedding response".to_string()))
    }
}

impl ChatModel for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let key = require_key(self.api_key.as_deref(), &self.api_key_env)?;
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            AppError::Completion(format!("Failed to serialize generate request: {}", e))
        })?;

        debug!("Requesting completion from {}", self.chat_model);

        let url = endpoint(
            &self.base_url,
            &format!("{}:generateContent", self.chat_model),
        );
        let response_text = self
            .http
            .post_json(&url, &[(API_KEY_HEADER, key)], &body)?;

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            AppError::Completion(format!("Failed to parse generate response: {}", e))
        })?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Completion(
                "Model returned an empty answer".to_string(),
            ));
        }

        Ok(text.to_string())
    }
}
