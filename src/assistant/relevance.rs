//! Deciding whether a question should go to the catalogue

use std::path::Path;

use levenshtein::levenshtein;

use super::vocabulary::load_vocabulary;
use crate::error::{BridgeError, Result};

pub trait RelevanceScorer: Send + Sync {
    fn should_use_store(&self, text: &str) -> bool;
}

/// Substrings that mark a question as being about music
pub const MUSIC_KEYWORDS: &[&str] = &[
    "artist",
    "singer",
    "band",
    "musician",
    "album",
    "song",
    "track",
    "music",
    "genre",
    "rock",
    "jazz",
    "pop",
    "metal",
    "classical",
    "metallica",
    "beatles",
    "queen",
    "led zeppelin",
    "playlist",
];

/// Used when no vocabulary file is available
pub const BASIC_VOCABULARY: &[&str] = &[
    "artist", "singer", "band", "musician", "album", "song", "track", "music", "rock", "jazz",
    "pop",
];

/// Plain keyword containment
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    keywords: Vec<String>,
}

impl KeywordScorer {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(MUSIC_KEYWORDS.iter().copied())
    }
}

impl RelevanceScorer for KeywordScorer {
    fn should_use_store(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Fuzzy match of each word against the catalogue vocabulary
///
/// Every word of three or more characters contributes its best similarity
/// (0-100) when that exceeds `word_threshold`; the question is relevant
/// when the sum exceeds `total_threshold`.
#[derive(Debug, Clone)]
pub struct FuzzyScorer {
    vocabulary: Vec<String>,
    word_threshold: u32,
    total_threshold: u32,
}

impl FuzzyScorer {
    pub fn new(vocabulary: Vec<String>) -> Self {
        Self {
            vocabulary,
            word_threshold: 60,
            total_threshold: 60,
        }
    }

    /// Load a vocabulary file, falling back to [`BASIC_VOCABULARY`] when
    /// the file does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match load_vocabulary(path) {
            Ok(vocabulary) => {
                tracing::info!("Loaded {} vocabulary terms from {}", vocabulary.len(), path.display());
                Ok(Self::new(vocabulary))
            }
            Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using basic vocabulary", path.display());
                Ok(Self::new(
                    BASIC_VOCABULARY.iter().map(|s| s.to_string()).collect(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Sum of per-word best similarities above the word threshold
    pub fn score(&self, text: &str) -> u32 {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.chars().count() >= 3)
            .filter_map(|word| self.best_match(word))
            .filter(|(_, score)| *score > self.word_threshold)
            .map(|(_, score)| score)
            .sum()
    }

    fn best_match(&self, word: &str) -> Option<(&str, u32)> {
        self.vocabulary
            .iter()
            .map(|term| (term.as_str(), similarity(word, term)))
            .max_by_key(|(_, score)| *score)
    }
}

impl RelevanceScorer for FuzzyScorer {
    fn should_use_store(&self, text: &str) -> bool {
        let score = self.score(text);
        let relevant = score > self.total_threshold;
        tracing::debug!(score, relevant, "Music relevance for '{}'", text);
        relevant
    }
}

/// Edit-distance similarity on a 0-100 scale
pub fn similarity(a: &str, b: &str) -> u32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100;
    }
    let distance = levenshtein(a, b).min(longest);
    ((longest - distance) * 100 / longest) as u32
}
