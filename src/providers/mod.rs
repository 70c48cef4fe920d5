// Hosted model providers
// Embedding and chat-completion clients for the OpenAI and Gemini HTTP APIs

pub mod gemini;
pub mod http;
pub mod openai;

use std::sync::Arc;

use tracing::{info, warn};

pub use gemini::GeminiClient;
pub use http::HttpClient;
pub use openai::OpenAiClient;

use crate::config::{Config, Provider};
use crate::{AppError, Result};

/// Maps text to embedding vectors
pub trait Embedder: Send + Sync {
    /// Embed chunk texts, returning one vector per input in input order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a user question
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces a completion for a single prompt
pub trait ChatModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the embedding and chat clients for the configured provider.
///
/// A missing API key is logged but not rejected here; the first request reports it.
#[inline]
pub fn build_clients(config: &Config) -> (Arc<dyn Embedder>, Arc<dyn ChatModel>) {
    let http = HttpClient::new(&config.http);
    let key_var = config.api_key_env();

    if crate::config::read_api_key(key_var).is_none() {
        warn!(
            "{} is not set; requests to the {} API will fail",
            key_var, config.provider
        );
    }

    info!("Using {} provider", config.provider);

    match config.provider {
        Provider::OpenAi => {
            let client = Arc::new(OpenAiClient::new(&config.openai, http));
            let embedder: Arc<dyn Embedder> = Arc::<OpenAiClient>::clone(&client);
            let chat: Arc<dyn ChatModel> = client;
            (embedder, chat)
        }
        Provider::Gemini => {
            let client = Arc::new(GeminiClient::new(&config.gemini, http));
            let embedder: Arc<dyn Embedder> = Arc::<GeminiClient>::clone(&client);
            let chat: Arc<dyn ChatModel> = client;
            (embedder, chat)
        }
    }
}

/// Return the API key or the error naming the variable it should come from
pub(crate) fn require_key<'a>(key: Option<&'a str>, var: &str) -> Result<&'a str> {
    key.ok_or_else(|| AppError::MissingApiKey {
        var: var.to_string(),
    })
}

/// Join a base URL and a path without doubling or dropping slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
