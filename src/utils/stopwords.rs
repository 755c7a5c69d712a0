use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::Path;

/// Default English stopword list shipped with the crate.
const DEFAULT_STOPWORDS: &str = include_str!("../stopwords.txt");

/// Set of words excluded from indexing.
///
/// Stopwords still flow through the tokenizer as separator text so that
/// fragment reconstruction keeps the full sentence, they just never reach
/// the inverted index. Matching is case-insensitive: the list is stored
/// lowercase and candidates are lowercased before lookup.
#[derive(Debug, Clone)]
pub struct Stopwords {
    words: FxHashSet<String>,
}

impl Stopwords {
    /// Empty set (nothing is filtered)
    pub fn empty() -> Self {
        Self {
            words: FxHashSet::default(),
        }
    }

    /// Build a set from an iterator of words
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Load a whitespace-separated word list from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read stopword list: {}", path.display()))?;
        Ok(Self::from_words(contents.split_whitespace()))
    }

    /// Check whether a token is a stopword (case-insensitive)
    pub fn contains(&self, token: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        self.words.contains(&token.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Stopwords {
    /// The embedded English list
    fn default() -> Self {
        Self::from_words(DEFAULT_STOPWORDS.split_whitespace())
    }
}
