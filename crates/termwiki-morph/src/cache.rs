use crate::{Analyzer, MorphError};
use once_cell::sync::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use termwiki_core::LanguageCode;

/// Builds the analyser for one language. Called at most once per language by
/// [`AnalyzerCache`].
pub trait AnalyzerLoader: Send + Sync {
    fn load(&self, language: &LanguageCode) -> Result<Arc<dyn Analyzer>, MorphError>;
}

type Slot = Arc<OnceCell<Option<Arc<dyn Analyzer>>>>;

/// Lazily populated, never evicted analyser table.
///
/// A language outside the configured set is never loaded. A failed load is
/// logged once and remembered as `None`, so the language stays unsupported for
/// the rest of the run.
pub struct AnalyzerCache {
    loader: Box<dyn AnalyzerLoader>,
    languages: Option<BTreeSet<LanguageCode>>,
    slots: Mutex<HashMap<LanguageCode, Slot>>,
}

impl AnalyzerCache {
    pub fn new(loader: impl AnalyzerLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            languages: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Restrict loading to a closed set of languages.
    pub fn with_languages(mut self, languages: impl IntoIterator<Item = LanguageCode>) -> Self {
        self.languages = Some(languages.into_iter().collect());
        self
    }

    pub fn get(&self, language: &LanguageCode) -> Option<Arc<dyn Analyzer>> {
        if let Some(set) = &self.languages {
            if !set.contains(language) {
                return None;
            }
        }
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.entry(language.clone()).or_default().clone()
        };
        // The table lock is released here; concurrent callers for the same
        // language block inside get_or_init instead.
        slot.get_or_init(|| match self.loader.load(language) {
            Ok(a) => {
                tracing::info!(event = "analyzer_loaded", language = %language);
                Some(a)
            }
            Err(e) => {
                tracing::warn!(event = "analyzer_load_failed", language = %language, error = %e);
                None
            }
        })
        .clone()
    }

    /// Languages whose load was attempted, with the outcome.
    pub fn loaded(&self) -> Vec<(LanguageCode, bool)> {
        let slots = match self.slots.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out: Vec<_> = slots
            .iter()
            .filter_map(|(k, s)| s.get().map(|a| (k.clone(), a.is_some())))
            .collect();
        out.sort();
        out
    }
}
