//! IMLO Spelling Module
//!
//! Deterministic, dictionary-driven spelling correction for Uzbek text with an
//! optional generative fallback:
//! - A word list is loaded once into an immutable [`DictionaryIndex`]
//! - Near-miss words are fixed by bounded Levenshtein search in first-letter buckets
//! - Only when the dictionary pass changes nothing is the fallback consulted

pub mod corrector;
pub mod dictionary;
pub mod distance;
pub mod fallback;

pub use corrector::{
    normalize_word, AppliedCorrection, CorrectionSuggestion, Corrector, DictionaryCorrection,
    MAX_AUTO_CORRECT_DISTANCE, MAX_LENGTH_DIFFERENCE,
};
pub use dictionary::{DictionaryIndex, DEFAULT_PREVIEW_LIMIT, EMPTY_WORD_BUCKET};
pub use distance::levenshtein;
pub use fallback::{FallbackError, SpellingFallback, SpellingRequest};
