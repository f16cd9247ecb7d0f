//! Stemmers used by the in-memory index.

use std::fmt::Debug;

/// Reduces a lower-case word to its stem.
pub trait Stemmer: Send + Sync + Debug {
    fn stem(&self, word: &str) -> String;

    fn name(&self) -> &'static str;
}

/// Stemmer that strips the longest matching common English suffix.
#[derive(Debug, Clone)]
pub struct SuffixStemmer {
    /// Sorted longest first.
    suffixes: Vec<String>,
}

impl SuffixStemmer {
    pub fn new() -> Self {
        Self::with_suffixes(
            [
                "ing", "ed", "er", "est", "ly", "s", "es", "ies", "ied", "tion", "sion", "able",
                "ible", "ment", "ness", "ful",
            ]
            .map(String::from),
        )
    }

    pub fn with_suffixes<I>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut suffixes: Vec<String> = suffixes.into_iter().collect();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        SuffixStemmer { suffixes }
    }
}

impl Default for SuffixStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        if word.len() <= 3 {
            return word.to_string();
        }
        for suffix in &self.suffixes {
            if word.len() > suffix.len() + 2 && word.ends_with(suffix.as_str()) {
                return word[..word.len() - suffix.len()].to_string();
            }
        }
        word.to_string()
    }

    fn name(&self) -> &'static str {
        "suffix"
    }
}
