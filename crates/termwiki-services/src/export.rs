use crate::remote::fetch_remote;
use crate::{ListFilter, Result, Session};
use std::path::{Path, PathBuf};
use termwiki_core::{Collection, Parsed, SourceParser};
use termwiki_domain::{OperationLine, RunReport};
use termwiki_parsers_wiki::{read_dump_file, WikiParser};
use termwiki_reconcile::{apply_writes, reconcile, EditOperation};

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub filter: ListFilter,
    /// Read concepts from a MediaWiki XML export instead of the live wiki.
    pub dump: Option<PathBuf>,
    /// Existing spreadsheet to update instead of writing a fresh one.
    pub into: Option<PathBuf>,
    pub metadata_columns: Vec<String>,
}

/// Write wiki concepts to a spreadsheet.
///
/// With `into`, the wiki is reconciled onto the existing sheet: languages the
/// wiki has replace the sheet's, the rest of the sheet is kept.
pub fn export_sheet(session: Option<&Session<'_>>, out: &Path, opts: &ExportOptions) -> Result<RunReport> {
    let wiki = load_wiki(session, opts)?;
    let mut run = RunReport::new("export");
    run.warnings
        .extend(wiki.warnings.iter().map(crate::report::parse_msg));

    let collection = match &opts.into {
        None => {
            for (index, c) in wiki.collection.sorted().into_iter().enumerate() {
                run.created.push(c.id().to_string());
                run.operations.push(line(index, c.id(), "create", "written"));
            }
            wiki.collection
        }
        Some(existing) => {
            let sheet = termwiki_sheet::read_sheet(existing)?;
            run.warnings
                .extend(sheet.warnings.iter().map(crate::report::parse_msg));
            let plan = reconcile(&sheet.collection, &wiki.collection, &[], None)?;
            for (index, op) in plan.operations.iter().enumerate() {
                let outcome = match op {
                    EditOperation::Create(_) => {
                        run.created.push(op.id().to_string());
                        "written"
                    }
                    EditOperation::Update { .. } => {
                        run.updated.push(op.id().to_string());
                        "written"
                    }
                    _ => {
                        run.skipped.push(op.id().to_string());
                        "skipped"
                    }
                };
                run.operations.push(line(index, op.id(), op.kind(), outcome));
            }
            run.plan = Some(plan.summary());
            apply_writes(&sheet.collection, &plan.operations)
        }
    };

    write_collection(out, &collection, &opts.metadata_columns)?;
    tracing::info!(event = "sheet_written", path = %out.display(), concepts = collection.len());
    Ok(run)
}

fn load_wiki(session: Option<&Session<'_>>, opts: &ExportOptions) -> Result<Parsed> {
    if let Some(dump) = &opts.dump {
        let mut pages = read_dump_file(dump)?;
        if let Some(prefix) = &opts.filter.prefix {
            pages.retain(|p| p.title.starts_with(prefix.as_str()));
        }
        return Ok(WikiParser.parse(&pages)?);
    }
    let Some(session) = session else {
        color_eyre::eyre::bail!("export needs either a wiki or a dump file");
    };
    let ids = session.transport.list_concept_ids(&opts.filter)?;
    tracing::info!(event = "concepts_listed", count = ids.len());
    fetch_remote(session.transport, ids.iter().map(String::as_str), &session.retry)
}

fn write_collection(out: &Path, collection: &Collection, columns: &[String]) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(out)?;
    termwiki_sheet::write_sheet(std::io::BufWriter::new(file), collection, columns)?;
    Ok(())
}

fn line(index: usize, id: &str, kind: &str, outcome: &str) -> OperationLine {
    OperationLine {
        index,
        id: id.to_string(),
        kind: kind.to_string(),
        outcome: outcome.to_string(),
        detail: None,
    }
}
