//! Dictionary fuzzy corrector
//!
//! Pipeline for [`Corrector::correct_spelling`]:
//! 1. Empty (after trim) input is returned as-is
//! 2. Text whose every word is in the dictionary is returned as-is
//! 3. Words within edit distance 1 of a dictionary word are substituted
//! 4. Only if step 3 changed nothing, the generative fallback is asked

use crate::dictionary::{DictionaryIndex, DEFAULT_PREVIEW_LIMIT};
use crate::distance::levenshtein;
use crate::fallback::{SpellingFallback, SpellingRequest};
use std::sync::Arc;

/// Largest edit distance the deterministic pass will substitute.
pub const MAX_AUTO_CORRECT_DISTANCE: usize = 1;

/// Candidates whose length differs from the word by more than this are skipped.
pub const MAX_LENGTH_DIFFERENCE: usize = 2;

/// Best dictionary match for one misspelled word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionSuggestion {
    pub word: String,
    pub distance: usize,
}

/// One substitution made by the deterministic pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCorrection {
    pub original: String,
    pub suggestion: String,
    pub distance: usize,
}

/// Result of a deterministic pass that changed at least one word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryCorrection {
    pub corrected_text: String,
    pub corrections: Vec<AppliedCorrection>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c == '’' || c == 'ʼ' || c == '-'
}

/// Strip leading/trailing characters that cannot be part of a word, then lowercase.
pub fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !is_word_char(c)).to_lowercase()
}

/// Apply the case pattern of `original` to a lowercase `suggestion`.
fn preserve_case(original: &str, suggestion: &str) -> String {
    if original == original.to_uppercase() {
        return suggestion.to_uppercase();
    }

    match original.chars().next() {
        Some(first) if !first.is_lowercase() => {
            let mut chars = suggestion.chars();
            match chars.next() {
                Some(head) => head.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => suggestion.to_string(),
    }
}

/// Fuzzy spelling corrector over an immutable dictionary
pub struct Corrector {
    index: Arc<DictionaryIndex>,
    fallback: Option<Arc<dyn SpellingFallback>>,
    preview_limit: usize,
}

impl Corrector {
    pub fn new(index: Arc<DictionaryIndex>, fallback: Arc<dyn SpellingFallback>) -> Self {
        Self {
            index,
            fallback: Some(fallback),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    /// Deterministic-only corrector; step 4 of the pipeline returns the input.
    pub fn without_fallback(index: Arc<DictionaryIndex>) -> Self {
        Self {
            index,
            fallback: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn dictionary(&self) -> &DictionaryIndex {
        &self.index
    }

    /// True iff the dictionary is non-empty and every whitespace-separated,
    /// normalized, non-empty token is a member. An empty token list is never correct.
    pub fn is_text_already_correct(&self, text: &str) -> bool {
        if self.index.is_empty() {
            return false;
        }

        let mut words = text
            .split_whitespace()
            .map(normalize_word)
            .filter(|w| !w.is_empty())
            .peekable();

        if words.peek().is_none() {
            return false;
        }

        words.all(|w| self.index.contains(&w))
    }

    /// Nearest in-bucket candidate for a normalized word.
    ///
    /// Scans in bucket order, keeps the first candidate at a new minimum
    /// distance and stops as soon as that minimum is within
    /// [`MAX_AUTO_CORRECT_DISTANCE`].
    pub fn find_best_suggestion(&self, word: &str) -> Option<CorrectionSuggestion> {
        let word_len = word.chars().count();
        let mut best: Option<CorrectionSuggestion> = None;

        for candidate in self.index.candidates_for(word) {
            let candidate_len = candidate.chars().count();
            if candidate_len.abs_diff(word_len) > MAX_LENGTH_DIFFERENCE {
                continue;
            }

            let distance = levenshtein(word, candidate);
            let improves = best.as_ref().map_or(true, |b| distance < b.distance);
            if improves {
                best = Some(CorrectionSuggestion {
                    word: candidate.clone(),
                    distance,
                });
                if distance <= MAX_AUTO_CORRECT_DISTANCE {
                    break;
                }
            }
        }

        best
    }

    /// Deterministic pass over every word-shaped run of the text.
    ///
    /// Returns `None` when the dictionary is empty or no word was substituted.
    pub fn auto_correct(&self, text: &str) -> Option<DictionaryCorrection> {
        if self.index.is_empty() {
            return None;
        }

        let mut corrected_text = String::with_capacity(text.len());
        let mut corrections = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find(is_word_char) {
            corrected_text.push_str(&rest[..start]);
            let tail = &rest[start..];
            let end = tail.find(|c: char| !is_word_char(c)).unwrap_or(tail.len());
            let token = &tail[..end];

            match self.correct_token(token) {
                Some(correction) => {
                    corrected_text.push_str(&preserve_case(token, &correction.suggestion));
                    corrections.push(correction);
                }
                None => corrected_text.push_str(token),
            }

            rest = &tail[end..];
        }
        corrected_text.push_str(rest);

        if corrections.is_empty() {
            return None;
        }

        log::debug!(
            "Dictionary pass fixed {} word(s): {:?}",
            corrections.len(),
            corrections
        );

        Some(DictionaryCorrection {
            corrected_text,
            corrections,
        })
    }

    fn correct_token(&self, token: &str) -> Option<AppliedCorrection> {
        let normalized = normalize_word(token);
        if normalized.is_empty() || self.index.contains(&normalized) {
            return None;
        }

        let suggestion = self.find_best_suggestion(&normalized)?;
        if suggestion.distance > MAX_AUTO_CORRECT_DISTANCE {
            return None;
        }

        Some(AppliedCorrection {
            original: token.to_string(),
            suggestion: suggestion.word,
            distance: suggestion.distance,
        })
    }

    /// Correct a text. Never fails: on any fallback problem the input comes back unchanged.
    pub async fn correct_spelling(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return text.to_string();
        }

        if self.is_text_already_correct(trimmed) {
            return text.to_string();
        }

        if let Some(correction) = self.auto_correct(trimmed) {
            return correction.corrected_text;
        }

        let Some(fallback) = &self.fallback else {
            return text.to_string();
        };

        let request = SpellingRequest {
            original_text: trimmed.to_string(),
            dictionary_preview: self.index.preview(self.preview_limit),
        };

        match fallback.complete(&request).await {
            Ok(answer) => {
                let cleaned = strip_wrapping_quotes(answer.trim());
                if cleaned.is_empty() || cleaned == trimmed {
                    text.to_string()
                } else {
                    cleaned.to_string()
                }
            }
            Err(e) => {
                log::warn!("Spelling fallback failed, returning text unchanged: {}", e);
                text.to_string()
            }
        }
    }
}

/// Remove one leading and one trailing `"` or `'`.
fn strip_wrapping_quotes(text: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let text = text.strip_prefix(is_quote).unwrap_or(text);
    text.strip_suffix(is_quote).unwrap_or(text)
}
