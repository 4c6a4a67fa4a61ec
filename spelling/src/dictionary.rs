//! Dictionary index
//!
//! An immutable set of canonical lowercase words plus a first-character bucket
//! map used to bound fuzzy candidate search. Built once at startup and shared
//! by reference (`Arc<DictionaryIndex>`) with every corrector.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Bucket key used for a word with no first character.
pub const EMPTY_WORD_BUCKET: char = '#';

/// Number of words shown to the generative fallback as context.
pub const DEFAULT_PREVIEW_LIMIT: usize = 80;

#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    /// Words in load order (first occurrence wins)
    words: Vec<String>,
    members: HashSet<String>,
    buckets: HashMap<char, Vec<String>>,
}

impl DictionaryIndex {
    /// An index with no words. Every correction falls through to the fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from raw entries: trimmed, empties dropped, lowercased, de-duplicated.
    pub fn from_words<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();

        for entry in entries {
            let word = entry.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            let word = word.to_lowercase();
            if !index.members.insert(word.clone()) {
                continue;
            }
            index
                .buckets
                .entry(bucket_key(&word))
                .or_default()
                .push(word.clone());
            index.words.push(word);
        }

        index
    }

    /// Parse a word list with one entry per line (`\n` or `\r\n`).
    pub fn from_text(text: &str) -> Self {
        Self::from_words(text.lines())
    }

    /// Load a word list from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_text(&raw))
    }

    /// Load a word list, degrading to an empty index on any read failure.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(index) => {
                log::info!(
                    "📚 Loaded {} dictionary words from {}",
                    index.len(),
                    path.as_ref().display()
                );
                index
            }
            Err(e) => {
                log::warn!(
                    "⚠️  Unable to load dictionary {}: {}",
                    path.as_ref().display(),
                    e
                );
                Self::empty()
            }
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.members.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words sharing the given first character, in load order
    pub fn bucket(&self, key: char) -> &[String] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates for a (normalized) word: the bucket of its first character
    pub fn candidates_for(&self, word: &str) -> &[String] {
        self.bucket(bucket_key(word))
    }

    /// The first `limit` words joined with `", "`
    pub fn preview(&self, limit: usize) -> String {
        self.words
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn bucket_key(word: &str) -> char {
    word.chars().next().unwrap_or(EMPTY_WORD_BUCKET)
}
