use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("API key missing: environment variable {var} is not set")]
    MissingApiKey { var: String },

    #[error("The uploaded document contains no extractable text")]
    EmptyDocument,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod document;
pub mod index;
pub mod pipeline;
pub mod providers;
pub mod qa;
pub mod session;
pub mod web;

#[cfg(test)]
pub mod test_util;
