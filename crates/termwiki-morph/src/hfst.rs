use crate::{Analysis, Analyzer, AnalyzerLoader, MorphError};
use lru::LruCache;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use termwiki_core::LanguageCode;

pub const ANALYSER_FILE: &str = "analyser-gt-norm.hfstol";
pub const DEFAULT_ANALYSER_DIR: &str = "/usr/share/giella";
pub const DEFAULT_LOOKUP_BIN: &str = "hfst-lookup";

/// Runs `hfst-lookup --quiet <fst>` once per batch of words, memoising answers.
pub struct HfstLookupAnalyzer {
    bin: PathBuf,
    fst: PathBuf,
    memo: Mutex<LruCache<String, Vec<Analysis>>>,
}

impl HfstLookupAnalyzer {
    pub fn new(bin: impl Into<PathBuf>, fst: impl Into<PathBuf>, cache_size: usize) -> Self {
        let cap = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            bin: bin.into(),
            fst: fst.into(),
            memo: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Feed all `words` through one child process, one per line.
    fn run(&self, words: Vec<String>) -> Result<String, MorphError> {
        let mut child = Command::new(&self.bin)
            .arg("--quiet")
            .arg(&self.fst)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take();
        // stdin is fed while stdout is drained
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                for word in &words {
                    writeln!(stdin, "{word}")?;
                }
            }
            Ok(())
        });
        let out = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| MorphError::Lookup("stdin writer panicked".into()))??;
        if !out.status.success() {
            return Err(MorphError::Lookup(format!(
                "{} exited with {}",
                self.bin.display(),
                out.status
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl Analyzer for HfstLookupAnalyzer {
    fn analyse(&self, word: &str) -> Result<Vec<Analysis>, MorphError> {
        Ok(self.analyse_batch(&[word])?.pop().unwrap_or_default())
    }

    fn analyse_batch(&self, words: &[&str]) -> Result<Vec<Vec<Analysis>>, MorphError> {
        let mut known: HashMap<String, Vec<Analysis>> = HashMap::new();
        if let Ok(mut memo) = self.memo.lock() {
            for w in words {
                if let Some(hit) = memo.get(*w) {
                    known.insert(w.to_string(), hit.clone());
                }
            }
        }
        let mut missing: Vec<String> = Vec::new();
        for w in words {
            if !known.contains_key(*w) && !missing.iter().any(|m| m == w) {
                missing.push(w.to_string());
            }
        }

        if !missing.is_empty() {
            let out = self.run(missing.clone())?;
            let blocks = lookup_blocks(&out);
            if blocks.len() != missing.len() {
                return Err(MorphError::Lookup(format!(
                    "expected {} answers from {}, got {}",
                    missing.len(),
                    self.bin.display(),
                    blocks.len()
                )));
            }
            tracing::trace!(event = "hfst_lookup", words = missing.len());
            let mut memo = self.memo.lock().ok();
            for (word, block) in missing.into_iter().zip(blocks) {
                let analyses = parse_lookup_output(block);
                if let Some(memo) = memo.as_mut() {
                    memo.put(word.clone(), analyses.clone());
                }
                known.insert(word, analyses);
            }
        }

        Ok(words
            .iter()
            .map(|w| known.get(*w).cloned().unwrap_or_default())
            .collect())
    }
}

/// Split lookup output into one block per input word. `hfst-lookup` ends
/// every answer with an empty line.
pub(crate) fn lookup_blocks(out: &str) -> Vec<&str> {
    out.split("\n\n")
        .filter(|b| !b.trim().is_empty())
        .collect()
}

/// Parse `input<TAB>analysis<TAB>weight` lines. Unknown words come back as
/// `word<TAB>word+?<TAB>inf` and produce no reading.
pub(crate) fn parse_lookup_output(out: &str) -> Vec<Analysis> {
    out.lines()
        .filter_map(|line| line.split('\t').nth(1))
        .map(str::trim)
        .filter(|a| !a.is_empty() && !a.ends_with("+?"))
        .map(Analysis::parse)
        .collect()
}

/// Finds `<analyser_dir>/<fst language>/analyser-gt-norm.hfstol`, mapping wiki
/// codes (`se`) to analyser codes (`sme`).
pub struct HfstLoader {
    pub lookup_bin: PathBuf,
    pub analyser_dir: PathBuf,
    pub language_map: BTreeMap<String, String>,
    pub cache_size: usize,
}

impl HfstLoader {
    pub fn new(analyser_dir: impl Into<PathBuf>, language_map: BTreeMap<String, String>) -> Self {
        Self {
            lookup_bin: PathBuf::from(DEFAULT_LOOKUP_BIN),
            analyser_dir: analyser_dir.into(),
            language_map,
            cache_size: 4096,
        }
    }

    pub fn fst_path(&self, language: &LanguageCode) -> PathBuf {
        let fst_lang = self
            .language_map
            .get(language.as_str())
            .map(String::as_str)
            .unwrap_or(language.as_str());
        self.analyser_dir.join(fst_lang).join(ANALYSER_FILE)
    }
}

impl AnalyzerLoader for HfstLoader {
    fn load(&self, language: &LanguageCode) -> Result<Arc<dyn Analyzer>, MorphError> {
        let fst = self.fst_path(language);
        if !Path::new(&fst).is_file() {
            return Err(MorphError::Load {
                language: language.to_string(),
                reason: format!("{} not found", fst.display()),
            });
        }
        Ok(Arc::new(HfstLookupAnalyzer::new(
            &self.lookup_bin,
            fst,
            self.cache_size,
        )))
    }
}
