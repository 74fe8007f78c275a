pub mod bot_update;
pub mod export;
pub mod import;
pub mod moves;
pub mod schema;
pub mod validate;

use crate::Format;
use color_eyre::eyre::{eyre, Result, WrapErr};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;
use termwiki_config::TermwikiConfig;
use termwiki_core::LanguageCode;
use termwiki_domain::RunReport;
use termwiki_morph::{AnalyzerCache, HfstLoader, LexiconLoader};
use termwiki_services::{DirTransport, MediaWikiTransport, RetryConfig, Session, WikiTransport};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// `--pages-dir` beats `wiki.pages_dir`; without either the MediaWiki API
/// from `[wiki]` is used.
pub fn open_transport(cfg: &TermwikiConfig, pages_dir: Option<PathBuf>) -> Result<Box<dyn WikiTransport>> {
    let wiki = cfg.wiki.clone().unwrap_or_default();
    if let Some(dir) = pages_dir.or_else(|| wiki.pages_dir.as_ref().map(PathBuf::from)) {
        tracing::debug!(event = "transport_selected", kind = "dir", path = %dir.display());
        let t = DirTransport::new(&dir).wrap_err_with(|| format!("cannot open {}", dir.display()))?;
        return Ok(Box::new(t));
    }
    let api_url = wiki
        .api_url
        .ok_or_else(|| eyre!("no wiki configured: set [wiki].api_url or pass --pages-dir"))?;
    let password = std::env::var(cfg.password_env()).ok();
    let credentials = match (&wiki.username, &password) {
        (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
        (Some(user), None) => {
            return Err(eyre!(
                "password for `{user}` missing: set the {} environment variable",
                cfg.password_env()
            ))
        }
        (None, _) => None,
    };
    tracing::debug!(event = "transport_selected", kind = "mediawiki", api = %api_url);
    let t = MediaWikiTransport::connect(&api_url, credentials, HTTP_TIMEOUT)?;
    Ok(Box::new(t))
}

pub fn session<'a>(cfg: &TermwikiConfig, transport: &'a dyn WikiTransport) -> Session<'a> {
    Session::new(transport)
        .with_retry(RetryConfig::from_cfg(cfg.retry.as_ref()))
        .with_summary(cfg.summary())
}

/// Lexicon files when `morph.lexicon_dir` is set, HFST analysers otherwise.
pub fn analyzer_cache(cfg: &TermwikiConfig) -> Result<AnalyzerCache> {
    let morph = cfg.morph.clone().unwrap_or_default();
    let cache = if let Some(dir) = &morph.lexicon_dir {
        AnalyzerCache::new(LexiconLoader::new(dir))
    } else {
        let dir = morph
            .analyser_dir
            .clone()
            .unwrap_or_else(|| termwiki_morph::DEFAULT_ANALYSER_DIR.to_string());
        let mut loader = HfstLoader::new(dir, cfg.language_map());
        if let Some(bin) = &morph.lookup_bin {
            loader.lookup_bin = PathBuf::from(bin);
        }
        if let Some(size) = morph.cache_size {
            loader.cache_size = size;
        }
        AnalyzerCache::new(loader)
    };
    match &cfg.languages {
        Some(codes) => {
            let langs = codes
                .iter()
                .map(|c| LanguageCode::new(c))
                .collect::<Result<Vec<_>, _>>()
                .wrap_err("invalid code in `languages`")?;
            Ok(cache.with_languages(langs))
        }
        None => Ok(cache),
    }
}

pub fn workers(cfg: &TermwikiConfig) -> usize {
    cfg.morph
        .as_ref()
        .and_then(|m| m.workers)
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}

/// Print a run report and tell whether the run was clean.
pub fn emit_report(report: &RunReport, format: Format, use_color: bool) -> Result<bool> {
    if format == Format::Json {
        crate::ui_out!("{}", serde_json::to_string_pretty(report)?);
        return Ok(report.is_success());
    }

    for w in &report.warnings {
        let form = match (&w.language, &w.text) {
            (Some(l), Some(t)) => format!(" [{l}] {t}"),
            _ => String::new(),
        };
        if use_color {
            crate::ui_warn!("[{}] {}{}: {}", w.kind.yellow(), w.record.green(), form, w.message);
        } else {
            crate::ui_warn!("[{}] {}{}: {}", w.kind, w.record, form, w.message);
        }
    }

    for op in &report.operations {
        let detail = op.detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default();
        if use_color {
            let outcome = match op.outcome.as_str() {
                "applied" | "written" => op.outcome.green().to_string(),
                "conflict" => op.outcome.yellow().to_string(),
                "failed" => op.outcome.red().to_string(),
                _ => op.outcome.cyan().to_string(),
            };
            crate::ui_out!("{:>4}  {:<7} {:<9} {}{}", op.index, op.kind, outcome, op.id.blue(), detail);
        } else {
            crate::ui_out!("{:>4}  {:<7} {:<9} {}{}", op.index, op.kind, op.outcome, op.id, detail);
        }
    }

    if let Some(plan) = &report.plan {
        crate::ui_info!(
            "plan: {} create, {} update, {} delete, {} unchanged",
            plan.creates,
            plan.updates,
            plan.deletes,
            plan.noops
        );
        if !plan.unsupported_languages.is_empty() {
            crate::ui_info!("not checked (no analyser): {}", plan.unsupported_languages.join(", "));
        }
    }
    let summary = format!(
        "{}: {} created, {} updated, {} deleted, {} skipped, {} conflicted, {} failed",
        report.mode,
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.skipped.len(),
        report.conflicted.len(),
        report.failed.len()
    );
    if report.is_success() {
        crate::ui_ok!("{summary}");
    } else {
        crate::ui_err!("{summary}");
    }
    if let Some(next) = report.resume_from {
        crate::ui_warn!("cancelled; resume with --resume-from {next}");
    }
    Ok(report.is_success())
}
