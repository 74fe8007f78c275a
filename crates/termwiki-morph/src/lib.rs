//! Morphology Validator.
//!
//! An [`Analyzer`] answers "which readings does this word have". The
//! [`AnalyzerCache`] loads one analyzer per language on first use and keeps it
//! for the life of the cache; the [`Validator`] borrows a cache and turns
//! readings into a [`Verdict`] for whole (possibly multiword) term forms.

mod cache;
mod hfst;
mod lexicon;
mod validator;

pub use cache::{AnalyzerCache, AnalyzerLoader};
pub use hfst::{HfstLoader, HfstLookupAnalyzer, DEFAULT_ANALYSER_DIR, DEFAULT_LOOKUP_BIN};
pub use lexicon::{LexiconAnalyzer, LexiconLoader};
pub use validator::{illegal_chars, tokens, Validator, Verdict, ILLEGAL_CHARS};

use thiserror::Error;

/// One reading of a word form: `lemma+Tag+Tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub lemma: String,
    pub tags: Vec<String>,
}

impl Analysis {
    /// Split an analyser output string such as `beana+N+Sg+Nom`.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('+');
        let lemma = parts.next().unwrap_or_default().to_string();
        Self {
            lemma,
            tags: parts.filter(|t| !t.is_empty()).map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MorphError {
    #[error("no analyser for `{language}`: {reason}")]
    Load { language: String, reason: String },
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A loaded analyser. Shared read-only across worker threads.
pub trait Analyzer: Send + Sync {
    /// All readings of `word`; empty when the word is unknown.
    fn analyse(&self, word: &str) -> Result<Vec<Analysis>, MorphError>;

    /// Readings for several words, in input order.
    fn analyse_batch(&self, words: &[&str]) -> Result<Vec<Vec<Analysis>>, MorphError> {
        words.iter().map(|w| self.analyse(w)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_splits_lemma_and_tags() {
        let a = Analysis::parse("beana+N+Sg+Nom");
        assert_eq!(a.lemma, "beana");
        assert_eq!(a.tags, vec!["N", "Sg", "Nom"]);
        assert!(Analysis::parse("juoga").tags.is_empty());
    }
}
