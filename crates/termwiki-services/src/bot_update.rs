use crate::import::read_plan;
use crate::{report, Result, Session};
use color_eyre::eyre::bail;
use std::path::Path;
use termwiki_domain::RunReport;

/// Apply a plan stored by `import --plan-out`, starting at `resume_from`.
///
/// Every update and delete is re-checked against the live revision, so a
/// plan that went stale while it waited turns into conflicts, not overwrites.
pub fn bot_update(session: &Session<'_>, plan_path: &Path, resume_from: usize) -> Result<RunReport> {
    let plan = read_plan(plan_path)?;
    if resume_from > plan.operations.len() {
        bail!(
            "--resume-from {resume_from} is past the end of the plan ({} operations)",
            plan.operations.len()
        );
    }
    tracing::info!(
        event = "bot_update_started",
        plan = %plan_path.display(),
        operations = plan.operations.len(),
        resume_from
    );
    let exec = session
        .executor()
        .apply(&plan.operations, resume_from, &session.cancel);
    let mut run = report::executed("bot-update", &plan.operations, &exec);
    run.plan = Some(plan.summary());
    run.warnings = report::plan_messages(&plan);
    Ok(run)
}
