use super::{emit_report, open_transport, session};
use crate::Format;
use std::path::PathBuf;
use termwiki_config::TermwikiConfig;

pub fn run_bot_update(
    cfg: &TermwikiConfig,
    plan: PathBuf,
    pages_dir: Option<PathBuf>,
    resume_from: usize,
    format: Format,
    use_color: bool,
) -> color_eyre::Result<bool> {
    tracing::debug!(event = "bot_update_args", plan = %plan.display(), resume_from);
    let transport = open_transport(cfg, pages_dir)?;
    let session = session(cfg, transport.as_ref());
    let report = termwiki_services::bot_update::bot_update(&session, &plan, resume_from)?;
    emit_report(&report, format, use_color)
}
