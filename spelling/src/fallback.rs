//! Generative fallback boundary
//!
//! The corrector only knows this trait. Prompt construction and response
//! parsing live with the client that implements it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the fallback is asked to fix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpellingRequest {
    /// Trimmed user text
    pub original_text: String,
    /// Sample of dictionary words given to the model as context
    pub dictionary_preview: String,
}

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("Fallback unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error {0}")]
    Http(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A second correction strategy consulted when the dictionary pass changes nothing.
///
/// Implementations make a single attempt and never retry.
#[async_trait]
pub trait SpellingFallback: Send + Sync {
    async fn complete(&self, request: &SpellingRequest) -> Result<String, FallbackError>;
}
