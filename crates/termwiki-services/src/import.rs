use crate::remote::fetch_remote;
use crate::{report, Result, Session};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use termwiki_domain::RunReport;
use termwiki_morph::Validator;
use termwiki_reconcile::{reconcile, Plan};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Concept ids to delete on the wiki.
    pub deletes: Vec<String>,
    pub dry_run: bool,
    /// Where to store the computed plan for a later `bot-update`.
    pub plan_out: Option<PathBuf>,
}

/// Reconcile a spreadsheet against the wiki and, unless dry-running, apply
/// the resulting edits.
pub fn import_sheet(
    session: &Session<'_>,
    sheet: &Path,
    validator: Option<&Validator<'_>>,
    opts: &ImportOptions,
) -> Result<RunReport> {
    let incoming = termwiki_sheet::read_sheet(sheet)?;
    tracing::info!(
        event = "sheet_read",
        path = %sheet.display(),
        concepts = incoming.collection.len(),
        warnings = incoming.warnings.len()
    );

    let ids: BTreeSet<&str> = incoming
        .collection
        .ids()
        .chain(opts.deletes.iter().map(String::as_str))
        .collect();
    let remote = fetch_remote(session.transport, ids, &session.retry)?;
    let plan = reconcile(&remote.collection, &incoming.collection, &opts.deletes, validator)?;

    if let Some(out) = &opts.plan_out {
        write_plan(out, &plan)?;
    }

    let mut run = if opts.dry_run {
        report::planned("import", &plan)
    } else {
        let exec = session.executor().apply(&plan.operations, 0, &session.cancel);
        let mut run = report::executed("import", &plan.operations, &exec);
        run.plan = Some(plan.summary());
        run.warnings = report::plan_messages(&plan);
        run
    };
    let mut warnings: Vec<_> = incoming
        .warnings
        .iter()
        .chain(remote.warnings.iter())
        .map(report::parse_msg)
        .collect();
    warnings.append(&mut run.warnings);
    run.warnings = warnings;
    Ok(run)
}

pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, json)?;
    tracing::info!(event = "plan_written", path = %path.display(), operations = plan.operations.len());
    Ok(())
}

pub fn read_plan(path: &Path) -> Result<Plan> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DirTransport, WikiTransport};

    const SHEET: &str = "concept_id,language,text,status\n\
                         X:beana,se,beana,sanctioned\n\
                         X:beana,fi,koira,unsanctioned\n";

    #[test]
    fn dry_run_plans_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let sheet = tmp.path().join("terms.csv");
        std::fs::write(&sheet, SHEET).unwrap();
        let t = DirTransport::new(tmp.path().join("wiki")).unwrap();
        let session = Session::new(&t);
        let opts = ImportOptions {
            dry_run: true,
            plan_out: Some(tmp.path().join("plan.json")),
            ..ImportOptions::default()
        };
        let run = import_sheet(&session, &sheet, None, &opts).unwrap();
        assert_eq!(run.operations[0].outcome, "planned");
        assert_eq!(run.plan.as_ref().unwrap().creates, 1);
        assert!(t.fetch_concept("X:beana").unwrap().is_none());

        let plan = read_plan(&tmp.path().join("plan.json")).unwrap();
        assert_eq!(plan.operations.len(), 1);
    }
}
