// Question answering
// Retrieves the closest chunks for a question and asks the chat model to answer from them


use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use crate::index::{SearchResult, VectorIndex};
use crate::providers::{ChatModel, Embedder};
use crate::{AppError, Result};

/// Answer to a single question together with the chunks it was based on
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

/// Build the "stuff" prompt: every retrieved chunk is placed verbatim before the question
#[inline]
pub fn build_prompt(question: &str, sources: &[SearchResult]) -> String {
    let context = sources
        .iter()
        .map(|source| source.chunk.content.as_str())
        .join("\n\n");

    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         {context}\n\n\
         Question: {question}\n\
         Helpful Answer:"
    )
}

/// Retrieval-augmented question answering over one document's index
pub struct RetrievalQa {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
}

impl RetrievalQa {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>, top_k: usize) -> Self {
        Self {
            embedder,
            chat,
            top_k: top_k.max(1),
        }
    }

    #[inline]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` from the chunks in `index`. Each call is independent; no history is kept.
    #[inline]
    pub fn ask(&self, index: &VectorIndex, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
        }

        if index.is_empty() {
            return Err(AppError::EmptyDocument);
        }

        let query = self.embedder.embed_query(question)?;
        let sources = index.search(&query, self.top_k)?;
        debug!(
            "Retrieved {} chunks for question (closest distance {:?})",
            sources.len(),
            sources.first().map(|s| s.distance)
        );

        let prompt = build_prompt(question, &sources);
        let text = self.chat.complete(&prompt)?;

        info!(
            "Answered question using {} source chunks ({} characters)",
            sources.len(),
            text.len()
        );

        Ok(Answer { text, sources })
    }
}
