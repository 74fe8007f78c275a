use super::{emit_report, open_transport, session};
use crate::Format;
use std::path::PathBuf;
use termwiki_config::TermwikiConfig;
use termwiki_services::export::{export_sheet, ExportOptions};
use termwiki_services::ListFilter;

#[derive(Debug)]
pub struct ExportArgs {
    pub out: PathBuf,
    pub pages_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub category: Option<String>,
    pub dump: Option<PathBuf>,
    pub into: Option<PathBuf>,
}

pub fn run_export(
    cfg: &TermwikiConfig,
    args: ExportArgs,
    format: Format,
    use_color: bool,
) -> color_eyre::Result<bool> {
    tracing::debug!(event = "export_args", ?args);
    let category = args
        .category
        .or_else(|| cfg.wiki.as_ref().and_then(|w| w.category.clone()));
    let opts = ExportOptions {
        filter: ListFilter {
            prefix: args.prefix,
            category,
        },
        dump: args.dump,
        into: args.into,
        metadata_columns: cfg.metadata_columns(),
    };

    let report = if opts.dump.is_some() {
        export_sheet(None, &args.out, &opts)?
    } else {
        let transport = open_transport(cfg, args.pages_dir)?;
        let session = session(cfg, transport.as_ref());
        export_sheet(Some(&session), &args.out, &opts)?
    };
    if format == Format::Text {
        crate::ui_info!("spreadsheet written to {}", args.out.display());
    }
    emit_report(&report, format, use_color)
}
