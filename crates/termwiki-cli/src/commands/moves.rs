use super::{emit_report, open_transport, session};
use crate::Format;
use std::path::PathBuf;
use termwiki_config::TermwikiConfig;
use termwiki_services::moves::move_concept;

#[derive(Debug)]
pub struct MoveArgs {
    pub from: String,
    pub to: String,
    pub merge: bool,
    pub pages_dir: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run_move(
    cfg: &TermwikiConfig,
    args: MoveArgs,
    format: Format,
    use_color: bool,
) -> color_eyre::Result<bool> {
    tracing::debug!(event = "move_args", ?args);
    let transport = open_transport(cfg, args.pages_dir)?;
    let session = session(cfg, transport.as_ref());
    let report = move_concept(&session, &args.from, &args.to, args.merge, args.dry_run)?;
    emit_report(&report, format, use_color)
}
