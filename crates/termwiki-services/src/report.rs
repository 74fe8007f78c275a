use crate::executor::{ExecutionReport, Outcome};
use termwiki_core::{ParseWarning, ValidationWarning};
use termwiki_domain::{OperationLine, RunReport, ValidationMsg};
use termwiki_reconcile::{EditOperation, Plan};

pub fn parse_msg(w: &ParseWarning) -> ValidationMsg {
    ValidationMsg::new("parse", &w.record, &w.message).with_line(w.line)
}

pub fn validation_msg(w: &ValidationWarning) -> ValidationMsg {
    ValidationMsg::new("validation", &w.concept_id, &w.message)
        .with_form(w.language.as_str(), &w.text)
}

/// Everything a plan has to say besides its operations.
pub fn plan_messages(plan: &Plan) -> Vec<ValidationMsg> {
    let mut out: Vec<ValidationMsg> = plan
        .notes
        .iter()
        .map(|n| ValidationMsg::new("plan", &n.record, &n.message).with_line(n.line))
        .collect();
    out.extend(plan.validation.iter().map(validation_msg));
    out.extend(plan.unsupported.iter().map(|lang| {
        ValidationMsg::new("unsupported", lang.as_str(), "no analyser; forms not checked")
    }));
    out
}

/// Report for a plan that was computed but not applied.
pub fn planned(mode: &str, plan: &Plan) -> RunReport {
    let mut report = RunReport::new(mode);
    for (index, op) in plan.operations.iter().enumerate() {
        let (outcome, detail) = match op {
            EditOperation::NoOp { reason, .. } => {
                report.skipped.push(op.id().to_string());
                ("skipped", Some(reason.clone()))
            }
            _ => ("planned", None),
        };
        report.operations.push(OperationLine {
            index,
            id: op.id().to_string(),
            kind: op.kind().to_string(),
            outcome: outcome.to_string(),
            detail,
        });
    }
    report.plan = Some(plan.summary());
    report.warnings = plan_messages(plan);
    report
}

/// Fold executor results into a run report.
pub fn executed(mode: &str, operations: &[EditOperation], exec: &ExecutionReport) -> RunReport {
    let mut report = RunReport::new(mode);
    for r in &exec.results {
        let id = r.id.clone();
        let detail = match &r.outcome {
            Outcome::Applied { revision } => {
                match operations.get(r.index) {
                    Some(EditOperation::Create(_)) => report.created.push(id),
                    Some(EditOperation::Delete { .. }) => report.deleted.push(id),
                    _ => report.updated.push(id),
                }
                revision.as_ref().map(|rev| format!("revision {rev}"))
            }
            Outcome::Skipped { reason } => {
                report.skipped.push(id);
                Some(reason.clone())
            }
            Outcome::Conflict { expected, found } => {
                report.conflicted.push(id);
                Some(format!(
                    "expected revision {}, found {}",
                    expected.as_deref().unwrap_or("none"),
                    found.as_deref().unwrap_or("none")
                ))
            }
            Outcome::Failed { error, attempts } => {
                report.failed.push(id);
                Some(format!("{error} (after {attempts} attempts)"))
            }
        };
        report.operations.push(OperationLine {
            index: r.index,
            id: r.id.clone(),
            kind: r.kind.clone(),
            outcome: r.outcome.label().to_string(),
            detail,
        });
    }
    report.resume_from = exec.resume_from;
    report
}
