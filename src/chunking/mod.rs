
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Page;

/// A window of page text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// Index of the page this chunk was cut from
    pub page: usize,
    /// Position of this chunk within the whole document
    pub chunk_index: usize,
    /// Character offset of the chunk within its page
    pub start: usize,
}

/// Configuration for fixed-window chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive windows
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    #[inline]
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Distance between the starts of two consecutive windows
    #[inline]
    pub const fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.chunk_size > 0 && self.chunk_overlap < self.chunk_size
    }
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Split every page into overlapping windows, numbering chunks across the document
#[inline]
pub fn split_pages(pages: &[Page], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for page in pages {
        for (start, content) in split_text(&page.text, config) {
            chunks.push(Chunk {
                content,
                page: page.index,
                chunk_index: chunks.len(),
                start,
            });
        }
    }

    debug!(
        "Split {} pages into {} chunks (size {}, overlap {})",
        pages.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    chunks
}

/// Split text into fixed-size windows of `chunk_size` characters that overlap by `chunk_overlap`.
///
/// Returns the character offset of each window together with its text. Every window except the
/// last is exactly `chunk_size` characters long. Text that is empty or only whitespace produces
/// no windows.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<(usize, String)> {
    if text.trim().is_empty() || !config.is_valid() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let stride = config.stride();
    let mut windows = Vec::with_capacity(expected_chunk_count(chars.len(), config));
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(chars.len());
        windows.push((start, chars[start..end].iter().collect()));

        if end == chars.len() {
            break;
        }
        start += stride;
    }

    windows
}

/// Number of windows `split_text` produces for non-blank text of `len` characters
#[inline]
pub fn expected_chunk_count(len: usize, config: &ChunkingConfig) -> usize {
    if len == 0 || !config.is_valid() {
        return 0;
    }
    if len <= config.chunk_size {
        return 1;
    }

    (len - config.chunk_overlap).div_ceil(config.stride())
}
