use crate::{Analysis, Analyzer, AnalyzerLoader, MorphError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use termwiki_core::LanguageCode;

/// Word list analyser: `<form>\t<lemma>\t<Tag+Tag>` per line, `#` comments.
/// Stands in for a compiled transducer where none is installed.
#[derive(Debug, Default, Clone)]
pub struct LexiconAnalyzer {
    entries: HashMap<String, Vec<Analysis>>,
}

impl LexiconAnalyzer {
    pub fn parse(text: &str) -> Self {
        let mut entries: HashMap<String, Vec<Analysis>> = HashMap::new();
        for line in text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split('\t');
            let form = cols.next().unwrap_or_default().trim();
            if form.is_empty() {
                continue;
            }
            let lemma = cols.next().map(str::trim).filter(|s| !s.is_empty()).unwrap_or(form);
            let tags = cols
                .next()
                .map(|t| t.split('+').filter(|s| !s.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();
            entries.entry(form.to_string()).or_default().push(Analysis {
                lemma: lemma.to_string(),
                tags,
            });
        }
        Self { entries }
    }

    pub fn from_file(path: &Path) -> Result<Self, MorphError> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Analyzer for LexiconAnalyzer {
    fn analyse(&self, word: &str) -> Result<Vec<Analysis>, MorphError> {
        Ok(self.entries.get(word).cloned().unwrap_or_default())
    }
}

/// Loads `<dir>/<language>.tsv`.
pub struct LexiconLoader {
    pub dir: PathBuf,
}

impl LexiconLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AnalyzerLoader for LexiconLoader {
    fn load(&self, language: &LanguageCode) -> Result<Arc<dyn Analyzer>, MorphError> {
        let path = self.dir.join(format!("{language}.tsv"));
        if !path.is_file() {
            return Err(MorphError::Load {
                language: language.to_string(),
                reason: format!("{} not found", path.display()),
            });
        }
        Ok(Arc::new(LexiconAnalyzer::from_file(&path)?))
    }
}
