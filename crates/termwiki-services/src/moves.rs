use crate::remote::fetch_remote;
use crate::{report, ListFilter, Result, Session};
use std::collections::BTreeSet;
use termwiki_domain::RunReport;
use termwiki_reconcile::{plan_move, Plan};

/// Rename concept `from` to `to`, or fold it into an existing `to` with
/// `merge`. Concepts in the same namespace that link to `from` are relinked.
pub fn move_concept(
    session: &Session<'_>,
    from: &str,
    to: &str,
    merge: bool,
    dry_run: bool,
) -> Result<RunReport> {
    let mut ids: BTreeSet<String> = [from.to_string(), to.to_string()].into_iter().collect();
    match from.split_once(':') {
        Some((ns, _)) => {
            let filter = ListFilter {
                prefix: Some(format!("{ns}:")),
                category: None,
            };
            ids.extend(session.transport.list_concept_ids(&filter)?);
        }
        None => tracing::warn!(event = "relink_skipped", from, reason = "concept id has no namespace"),
    }
    let remote = fetch_remote(session.transport, ids.iter().map(String::as_str), &session.retry)?;
    let plan = Plan {
        operations: plan_move(&remote.collection, from, to, merge)?,
        ..Plan::default()
    };

    let mut run = if dry_run {
        report::planned("move", &plan)
    } else {
        let exec = session.executor().apply(&plan.operations, 0, &session.cancel);
        let mut run = report::executed("move", &plan.operations, &exec);
        run.plan = Some(plan.summary());
        run
    };
    run.warnings
        .extend(remote.warnings.iter().map(report::parse_msg));
    Ok(run)
}
