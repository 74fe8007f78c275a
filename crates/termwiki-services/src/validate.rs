use crate::{report, Result};
use std::path::Path;
use termwiki_core::Collection;
use termwiki_domain::RunReport;
use termwiki_morph::Validator;
use termwiki_reconcile::reconcile;

/// Morphology check of a spreadsheet without touching the wiki: the sheet is
/// planned against an empty remote and only the messages are kept.
pub fn validate_sheet(sheet: &Path, validator: &Validator<'_>) -> Result<RunReport> {
    let parsed = termwiki_sheet::read_sheet(sheet)?;
    let plan = reconcile(&Collection::new(), &parsed.collection, &[], Some(validator))?;
    let mut run = RunReport::new("validate");
    run.warnings
        .extend(parsed.warnings.iter().map(report::parse_msg));
    run.warnings.extend(report::plan_messages(&plan));
    tracing::info!(
        event = "sheet_validated",
        concepts = parsed.collection.len(),
        downgraded = plan.validation.len()
    );
    Ok(run)
}
