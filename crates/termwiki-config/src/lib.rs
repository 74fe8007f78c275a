use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "termwiki.toml";
pub const DEFAULT_PASSWORD_ENV: &str = "TERMWIKI_PASSWORD";
pub const DEFAULT_SUMMARY: &str = "termwiki: reconcile terms";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TermwikiConfig {
    pub languages: Option<Vec<String>>,
    pub wiki: Option<WikiCfg>,
    pub morph: Option<MorphCfg>,
    pub retry: Option<RetryCfg>,
    pub export: Option<ExportCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiCfg {
    pub api_url: Option<String>,
    pub username: Option<String>,
    /// Name of the environment variable holding the bot password.
    pub password_env: Option<String>,
    pub summary: Option<String>,
    pub pages_dir: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MorphCfg {
    pub analyser_dir: Option<String>,
    pub lookup_bin: Option<String>,
    pub lexicon_dir: Option<String>,
    pub language_map: Option<BTreeMap<String, String>>,
    pub cache_size: Option<usize>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryCfg {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportCfg {
    pub metadata_columns: Option<Vec<String>>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl TermwikiConfig {
    pub fn password_env(&self) -> &str {
        self.wiki
            .as_ref()
            .and_then(|w| w.password_env.as_deref())
            .unwrap_or(DEFAULT_PASSWORD_ENV)
    }

    pub fn summary(&self) -> &str {
        self.wiki
            .as_ref()
            .and_then(|w| w.summary.as_deref())
            .unwrap_or(DEFAULT_SUMMARY)
    }

    /// Wiki language code → analyser directory name. Built-in pairs are kept
    /// unless the file overrides them.
    pub fn language_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = [("se", "sme"), ("fi", "fin"), ("nb", "nob"), ("nn", "nob")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(user) = self.morph.as_ref().and_then(|m| m.language_map.clone()) {
            map.extend(user);
        }
        map
    }

    pub fn metadata_columns(&self) -> Vec<String> {
        self.export
            .as_ref()
            .and_then(|e| e.metadata_columns.clone())
            .unwrap_or_default()
    }
}

/// Search order: CWD/termwiki.toml, then `<config dir>/termwiki/termwiki.toml`.
/// Earlier files win field by field.
pub fn load_config() -> Result<TermwikiConfig, ConfigError> {
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::current_dir() {
        candidates.push(p.join(FILE_NAME));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("termwiki").join(FILE_NAME));
    }
    load_from(&candidates)
}

/// Merge the given files in priority order. Missing files are skipped; a file
/// that exists but does not parse is an error.
pub fn load_from<P: AsRef<Path>>(paths: &[P]) -> Result<TermwikiConfig, ConfigError> {
    let mut merged = TermwikiConfig::default();
    for path in paths {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let cfg = toml::from_str::<TermwikiConfig>(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        merged = merge(merged, cfg);
    }
    Ok(merged)
}

fn merge(mut a: TermwikiConfig, b: TermwikiConfig) -> TermwikiConfig {
    if a.languages.is_none() {
        a.languages = b.languages;
    }
    a.wiki = merge_opt(a.wiki, b.wiki, merge_wiki);
    a.morph = merge_opt(a.morph, b.morph, merge_morph);
    a.retry = merge_opt(a.retry, b.retry, merge_retry);
    a.export = merge_opt(a.export, b.export, merge_export);
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, b) => b,
        (a, None) => a,
    }
}

fn merge_wiki(mut a: WikiCfg, b: WikiCfg) -> WikiCfg {
    a.api_url = a.api_url.or(b.api_url);
    a.username = a.username.or(b.username);
    a.password_env = a.password_env.or(b.password_env);
    a.summary = a.summary.or(b.summary);
    a.pages_dir = a.pages_dir.or(b.pages_dir);
    a.category = a.category.or(b.category);
    a
}

fn merge_morph(mut a: MorphCfg, b: MorphCfg) -> MorphCfg {
    a.analyser_dir = a.analyser_dir.or(b.analyser_dir);
    a.lookup_bin = a.lookup_bin.or(b.lookup_bin);
    a.lexicon_dir = a.lexicon_dir.or(b.lexicon_dir);
    a.language_map = a.language_map.or(b.language_map);
    a.cache_size = a.cache_size.or(b.cache_size);
    a.workers = a.workers.or(b.workers);
    a
}

fn merge_retry(mut a: RetryCfg, b: RetryCfg) -> RetryCfg {
    a.max_attempts = a.max_attempts.or(b.max_attempts);
    a.initial_delay_ms = a.initial_delay_ms.or(b.initial_delay_ms);
    a.max_delay_ms = a.max_delay_ms.or(b.max_delay_ms);
    a
}

fn merge_export(mut a: ExportCfg, b: ExportCfg) -> ExportCfg {
    a.metadata_columns = a.metadata_columns.or(b.metadata_columns);
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn first_file_wins_per_field() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("local.toml");
        let global = tmp.path().join("global.toml");
        fs::write(
            &local,
            "[wiki]\npages_dir = \"pages\"\n[retry]\nmax_attempts = 5\n",
        )
        .unwrap();
        fs::write(
            &global,
            "languages = [\"se\", \"fi\"]\n[wiki]\npages_dir = \"other\"\napi_url = \"https://example.org/w/api.php\"\n",
        )
        .unwrap();

        let cfg = load_from(&[local, global]).unwrap();
        let wiki = cfg.wiki.as_ref().unwrap();
        assert_eq!(wiki.pages_dir.as_deref(), Some("pages"));
        assert_eq!(wiki.api_url.as_deref(), Some("https://example.org/w/api.php"));
        assert_eq!(cfg.languages.as_deref().map(|l| l.len()), Some(2));
        assert_eq!(cfg.retry.unwrap().max_attempts, Some(5));
    }

    #[test]
    fn missing_files_are_skipped_and_defaults_apply() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = load_from(&[tmp.path().join("nope.toml")]).unwrap();
        assert_eq!(cfg.password_env(), DEFAULT_PASSWORD_ENV);
        assert_eq!(cfg.language_map().get("se").map(String::as_str), Some("sme"));
        assert!(cfg.metadata_columns().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.toml");
        fs::write(&bad, "[wiki\n").unwrap();
        assert!(matches!(load_from(&[bad]), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn user_language_map_extends_builtin() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("t.toml");
        fs::write(&p, "[morph.language_map]\nse = \"sme-x\"\nsma = \"sma\"\n").unwrap();
        let map = load_from(&[p]).unwrap().language_map();
        assert_eq!(map["se"], "sme-x");
        assert_eq!(map["sma"], "sma");
        assert_eq!(map["fi"], "fin");
    }
}
