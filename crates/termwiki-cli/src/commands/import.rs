use super::{analyzer_cache, emit_report, open_transport, session, workers};
use crate::Format;
use std::path::PathBuf;
use termwiki_config::TermwikiConfig;
use termwiki_morph::Validator;
use termwiki_services::import::{import_sheet, ImportOptions};

#[derive(Debug)]
pub struct ImportArgs {
    pub sheet: PathBuf,
    pub pages_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub plan_out: Option<PathBuf>,
    pub delete: Vec<String>,
}

pub fn run_import(
    cfg: &TermwikiConfig,
    args: ImportArgs,
    format: Format,
    use_color: bool,
) -> color_eyre::Result<bool> {
    tracing::debug!(event = "import_args", ?args);
    let transport = open_transport(cfg, args.pages_dir)?;
    let session = session(cfg, transport.as_ref());
    let cache = analyzer_cache(cfg)?;
    let validator = Validator::new(&cache).with_workers(workers(cfg));

    let opts = ImportOptions {
        deletes: args.delete,
        dry_run: args.dry_run,
        plan_out: args.plan_out.clone(),
    };
    let report = import_sheet(&session, &args.sheet, Some(&validator), &opts)?;
    for (language, loaded) in cache.loaded() {
        tracing::debug!(event = "analyzer_status", language = %language, loaded);
    }
    if let Some(path) = &args.plan_out {
        if format == Format::Text {
            crate::ui_info!("plan saved to {}", path.display());
        }
    }
    emit_report(&report, format, use_color)
}
