// Ingestion and query pipeline
// Wires document loading, chunking, embedding, indexing and question answering together


use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::chunking::{ChunkingConfig, split_pages};
use crate::config::Config;
use crate::document::{Page, load_pdf, load_pdf_bytes};
use crate::index::{Distance, VectorIndex};
use crate::providers::{ChatModel, Embedder, build_clients};
use crate::qa::{Answer, RetrievalQa};
use crate::{AppError, Result};

/// A document that has been chunked, embedded and indexed
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub page_count: usize,
    pub index: VectorIndex,
}

impl IndexedDocument {
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    distance: Distance,
    qa: RetrievalQa,
}

impl Pipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        chunking: ChunkingConfig,
        top_k: usize,
        distance: Distance,
    ) -> Self {
        Self {
            qa: RetrievalQa::new(Arc::clone(&embedder), chat, top_k),
            embedder,
            chunking,
            distance,
        }
    }

    /// Build a pipeline for the configured provider
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        let (embedder, chat) = build_clients(config);
        Self::new(
            embedder,
            chat,
            config.chunking(),
            config.retrieval.top_k,
            config.retrieval.distance,
        )
    }

    #[inline]
    pub const fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Load a PDF from disk and index it from scratch
    #[inline]
    pub fn ingest_file(&self, path: &Path) -> Result<IndexedDocument> {
        let pages = load_pdf(path)?;
        self.ingest_pages(&pages)
    }

    /// Index PDF bytes that are still in memory, such as an upload not yet written to disk
    #[inline]
    pub fn ingest_bytes(&self, bytes: &[u8]) -> Result<IndexedDocument> {
        let pages = load_pdf_bytes(bytes)?;
        self.ingest_pages(&pages)
    }

    /// Chunk, embed and index already-loaded pages
    #[inline]
    pub fn ingest_pages(&self, pages: &[Page]) -> Result<IndexedDocument> {
        let started = Instant::now();
        let chunks = split_pages(pages, &self.chunking);

        let vectors = if chunks.is_empty() {
            debug!("Document has no text; skipping embedding");
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            self.embedder.embed_documents(&texts)?
        };

        if vectors.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, received {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let index = VectorIndex::build(chunks.into_iter().zip(vectors).collect(), self.distance)?;

        info!(
            "Indexed {} pages into {} chunks in {:?}",
            pages.len(),
            index.len(),
            started.elapsed()
        );

        Ok(IndexedDocument {
            page_count: pages.len(),
            index,
        })
    }

    /// Answer a question about an indexed document
    #[inline]
    pub fn ask(&self, document: &IndexedDocument, question: &str) -> Result<Answer> {
        self.qa.ask(&document.index, question)
    }
}
