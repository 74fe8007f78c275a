use crate::{Analysis, AnalyzerCache};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use termwiki_core::LanguageCode;

type Readings = HashMap<(LanguageCode, String), Vec<Analysis>>;

/// Outcome of checking one term form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every word was recognised. `lemma` joins the first reading of each
    /// word; `tags` are the readings of the last (head) word.
    Valid { lemma: String, tags: Vec<String> },
    /// At least one word is unknown to the analyser.
    Invalid { unknown: Vec<String> },
    /// The form carries characters that never belong in a term.
    IllegalCharacters { found: Vec<char> },
    /// No analyser is available for the language, so nothing was checked.
    Unsupported,
}

impl Verdict {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Verdict::Invalid { .. } | Verdict::IllegalCharacters { .. })
    }
}

/// Characters that mark a form as a note or markup rather than a term.
pub const ILLEGAL_CHARS: &[char] = &['(', ')', '[', ']', '?', ':', ';', '+', '*', '='];

/// Distinct illegal characters in `text`, in order of appearance.
pub fn illegal_chars(text: &str) -> Vec<char> {
    let mut found = Vec::new();
    for c in text.chars().filter(|c| ILLEGAL_CHARS.contains(c)) {
        if !found.contains(&c) {
            found.push(c);
        }
    }
    found
}

/// Words of a term form that are sent to the analyser: split on whitespace
/// and `/`, punctuation stripped, and hyphen-initial affixes skipped.
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .flat_map(|w| w.split('/'))
        .map(|w| {
            w.chars()
                .filter(|c| !matches!(c, '(' | ')' | ',' | '?' | '+' | '*' | '[' | ']' | '=' | ';' | ':' | '!'))
                .collect::<String>()
        })
        .filter(|w| !w.is_empty() && !w.starts_with(['-', '\u{2011}']))
        .collect()
}

pub struct Validator<'a> {
    cache: &'a AnalyzerCache,
    workers: usize,
}

impl<'a> Validator<'a> {
    pub fn new(cache: &'a AnalyzerCache) -> Self {
        Self { cache, workers: 1 }
    }

    /// Upper bound on threads used by [`Validator::validate_all`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Illegal characters are reported whether or not an analyser exists
    /// for the language.
    pub fn validate(&self, language: &LanguageCode, text: &str) -> Verdict {
        self.judge(language, text, &Readings::new())
    }

    fn judge(&self, language: &LanguageCode, text: &str, readings: &Readings) -> Verdict {
        let found = illegal_chars(text);
        if !found.is_empty() {
            return Verdict::IllegalCharacters { found };
        }
        let Some(analyzer) = self.cache.get(language) else {
            return Verdict::Unsupported;
        };
        let words = tokens(text);
        let mut lemmas = Vec::with_capacity(words.len());
        let mut unknown = Vec::new();
        let mut tags = Vec::new();
        for word in &words {
            let looked_up = match readings.get(&(language.clone(), word.clone())) {
                Some(hit) => Ok(hit.clone()),
                None => analyzer.analyse(word),
            };
            match looked_up {
                Ok(analyses) => match analyses.into_iter().next() {
                    Some(first) => {
                        lemmas.push(first.lemma);
                        tags = first.tags;
                    }
                    None => unknown.push(word.clone()),
                },
                Err(e) => {
                    tracing::warn!(event = "lookup_failed", language = %language, word = %word, error = %e);
                    return Verdict::Unsupported;
                }
            }
        }
        if !unknown.is_empty() {
            return Verdict::Invalid { unknown };
        }
        if lemmas.is_empty() {
            // nothing analysable, e.g. a bare suffix
            return Verdict::Valid {
                lemma: text.to_string(),
                tags,
            };
        }
        Verdict::Valid {
            lemma: lemmas.join(" "),
            tags,
        }
    }

    /// Look up every distinct word of `items` with one batch call per language.
    fn prefetch(&self, items: &[(LanguageCode, String)]) -> Readings {
        let mut wanted: BTreeMap<&LanguageCode, BTreeSet<String>> = BTreeMap::new();
        for (language, text) in items {
            if illegal_chars(text).is_empty() {
                wanted.entry(language).or_default().extend(tokens(text));
            }
        }
        let mut out = Readings::new();
        for (language, words) in wanted {
            let Some(analyzer) = self.cache.get(language) else {
                continue;
            };
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            match analyzer.analyse_batch(&words) {
                Ok(all) => {
                    for (word, readings) in words.iter().zip(all) {
                        out.insert((language.clone(), word.to_string()), readings);
                    }
                }
                Err(e) => {
                    tracing::warn!(event = "batch_lookup_failed", language = %language, error = %e);
                }
            }
        }
        out
    }

    /// Validate independent forms on up to `workers` scoped threads. Words are
    /// looked up in one batch per language first. Results keep input order.
    pub fn validate_all(&self, items: &[(LanguageCode, String)]) -> Vec<Verdict> {
        if items.is_empty() {
            return Vec::new();
        }
        let readings = self.prefetch(items);
        let readings = &readings;
        if self.workers == 1 || items.len() == 1 {
            return items.iter().map(|(l, t)| self.judge(l, t, readings)).collect();
        }
        let chunk = items.len().div_ceil(self.workers);
        std::thread::scope(|s| {
            let handles: Vec<_> = items
                .chunks(chunk)
                .map(|part| {
                    s.spawn(move || {
                        part.iter()
                            .map(|(l, t)| self.judge(l, t, readings))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .zip(items.chunks(chunk))
                .flat_map(|(h, part)| {
                    h.join()
                        .unwrap_or_else(|_| vec![Verdict::Unsupported; part.len()])
                })
                .collect()
        })
    }
}
