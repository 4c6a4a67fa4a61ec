//! IMLO generative model client
//!
//! One HTTP client, two roles:
//! - [`imlo_spelling::SpellingFallback`]: rewrite text the dictionary could not fix
//! - [`imlo_ledger::ReceiptVerifier`]: judge whether a receipt matches a payment
//!
//! Prompt construction and response parsing stay in this crate.

pub mod client;
pub mod error;
pub mod prompts;
pub mod verification;

pub use client::{GeminiClient, GeminiConfig, GenerationConfig};
pub use error::{ClientError, Result};
