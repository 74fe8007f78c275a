use super::{analyzer_cache, emit_report, workers};
use crate::Format;
use std::path::PathBuf;
use termwiki_config::TermwikiConfig;
use termwiki_morph::Validator;

pub fn run_validate(
    cfg: &TermwikiConfig,
    sheet: PathBuf,
    format: Format,
    use_color: bool,
) -> color_eyre::Result<bool> {
    tracing::debug!(event = "validate_args", sheet = %sheet.display());
    let cache = analyzer_cache(cfg)?;
    let validator = Validator::new(&cache).with_workers(workers(cfg));
    let report = termwiki_services::validate::validate_sheet(&sheet, &validator)?;
    if format == Format::Text && report.warnings.is_empty() {
        crate::ui_ok!("all forms recognised");
    }
    emit_report(&report, format, use_color)
}
