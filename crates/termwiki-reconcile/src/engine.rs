use crate::{reason, EditOperation, ReconcileError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use termwiki_core::{
    Collection, Concept, LanguageCode, ParseWarning, Status, TermForm, ValidationWarning,
};
use termwiki_domain::PlanSummary;
use termwiki_morph::{Validator, Verdict};

/// Output of one reconciliation pass. Serialisable so that a plan computed by
/// `import --plan-out` can be applied later by `bot-update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<EditOperation>,
    /// Forms downgraded to unsanctioned by the morphology check.
    #[serde(default)]
    pub validation: Vec<ValidationWarning>,
    /// Incoming records that were set aside.
    #[serde(default)]
    pub notes: Vec<ParseWarning>,
    /// Languages for which no analyser was available; their forms were not checked.
    #[serde(default)]
    pub unsupported: BTreeSet<LanguageCode>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        let mut s = PlanSummary {
            unsupported_languages: self.unsupported.iter().map(|l| l.to_string()).collect(),
            ..PlanSummary::default()
        };
        for op in &self.operations {
            match op {
                EditOperation::Create(_) => s.creates += 1,
                EditOperation::Update { .. } => s.updates += 1,
                EditOperation::Delete { .. } => s.deletes += 1,
                EditOperation::NoOp { .. } => s.noops += 1,
            }
        }
        s
    }

    pub fn has_writes(&self) -> bool {
        self.operations.iter().any(|op| !op.is_noop())
    }
}

/// Compute the edits that turn `remote` into `remote` + `incoming`.
///
/// Concepts only in `remote` are left alone unless their id is in `deletes`;
/// a deleted id wins over an incoming concept with the same id. When a
/// `validator` is given every form of a created or updated concept is checked,
/// and unknown forms are downgraded to unsanctioned, never dropped.
pub fn reconcile(
    remote: &Collection,
    incoming: &Collection,
    deletes: &[String],
    validator: Option<&Validator<'_>>,
) -> Result<Plan, ReconcileError> {
    let delete_set: BTreeSet<&str> = deletes
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let mut plan = Plan::default();
    let mut ops: BTreeMap<String, EditOperation> = BTreeMap::new();

    for concept in incoming {
        let id = concept.id();
        if delete_set.contains(id) {
            plan.notes.push(ParseWarning::new(
                id,
                None,
                "listed for deletion; incoming concept ignored",
            ));
            continue;
        }
        let op = match remote.get(id) {
            None => EditOperation::Create(concept.clone().with_revision(None)),
            Some(current) if current.value_eq(concept) => EditOperation::noop(id, reason::UNCHANGED),
            Some(current) => {
                let merged = merge(current, concept)?;
                if merged.value_eq(current) {
                    EditOperation::noop(id, reason::NO_EFFECTIVE_CHANGE)
                } else {
                    EditOperation::Update {
                        id: id.to_string(),
                        previous_revision: current.revision().map(str::to_string),
                        concept: merged,
                    }
                }
            }
        };
        ops.insert(id.to_string(), op);
    }

    for id in delete_set {
        let op = match remote.get(id) {
            Some(current) => EditOperation::Delete {
                id: id.to_string(),
                previous_revision: current.revision().map(str::to_string),
            },
            None => EditOperation::noop(id, reason::NOT_PRESENT),
        };
        ops.insert(id.to_string(), op);
    }

    plan.operations = ops.into_values().collect();
    if let Some(v) = validator {
        validate_writes(&mut plan, remote, v)?;
    }

    let s = plan.summary();
    tracing::info!(
        event = "plan_built",
        creates = s.creates,
        updates = s.updates,
        deletes = s.deletes,
        noops = s.noops,
        downgraded = plan.validation.len(),
    );
    Ok(plan)
}

/// Per-language last-writer-wins: languages present in `incoming` replace the
/// remote forms, the rest are kept. Incoming metadata overrides per key.
fn merge(remote: &Concept, incoming: &Concept) -> Result<Concept, ReconcileError> {
    let replaced = incoming.languages();
    let mut terms: Vec<TermForm> = remote
        .terms()
        .iter()
        .filter(|t| !replaced.contains(&t.language))
        .cloned()
        .collect();
    terms.extend(incoming.terms().iter().cloned());
    let mut metadata = remote.metadata().clone();
    metadata.extend(incoming.metadata().iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(remote.with_content(terms, metadata)?)
}

fn validate_writes(
    plan: &mut Plan,
    remote: &Collection,
    validator: &Validator<'_>,
) -> Result<(), ReconcileError> {
    let mut items: Vec<(LanguageCode, String)> = Vec::new();
    let mut refs: Vec<(usize, usize)> = Vec::new();
    for (oi, op) in plan.operations.iter().enumerate() {
        if let Some(c) = op.written() {
            for (ti, t) in c.terms().iter().enumerate() {
                items.push((t.language.clone(), t.text.clone()));
                refs.push((oi, ti));
            }
        }
    }

    let verdicts = validator.validate_all(&items);
    let mut flagged: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
    for (((oi, ti), verdict), (language, _)) in refs.into_iter().zip(verdicts).zip(&items) {
        match verdict {
            Verdict::Valid { .. } => {}
            Verdict::Unsupported => {
                plan.unsupported.insert(language.clone());
            }
            Verdict::Invalid { unknown } => {
                let message = format!(
                    "not recognised by the `{language}` analyser: {}",
                    unknown.join(", ")
                );
                flagged.entry(oi).or_default().push((ti, message));
            }
            Verdict::IllegalCharacters { found } => {
                let chars: String = found.into_iter().collect();
                let message = format!("illegal characters `{chars}`");
                flagged.entry(oi).or_default().push((ti, message));
            }
        }
    }

    for (oi, forms) in flagged {
        let Some(concept) = plan.operations[oi].written() else {
            continue;
        };
        let (downgraded, warnings) = downgrade(concept, &forms)?;
        plan.validation.extend(warnings);
        let replacement = match &plan.operations[oi] {
            EditOperation::Update {
                id,
                previous_revision,
                ..
            } => {
                if remote.get(id).is_some_and(|r| r.value_eq(&downgraded)) {
                    EditOperation::noop(id, reason::UNCHANGED_AFTER_VALIDATION)
                } else {
                    EditOperation::Update {
                        id: id.clone(),
                        previous_revision: previous_revision.clone(),
                        concept: downgraded,
                    }
                }
            }
            _ => EditOperation::Create(downgraded),
        };
        plan.operations[oi] = replacement;
    }
    Ok(())
}

fn downgrade(
    concept: &Concept,
    forms: &[(usize, String)],
) -> Result<(Concept, Vec<ValidationWarning>), ReconcileError> {
    let mut terms = concept.terms().to_vec();
    let mut warnings = Vec::with_capacity(forms.len());
    for (ti, message) in forms {
        let Some(term) = terms.get_mut(*ti) else {
            continue;
        };
        let warning = ValidationWarning {
            concept_id: concept.id().to_string(),
            language: term.language.clone(),
            text: term.text.clone(),
            previous_status: term.status,
            message: message.clone(),
        };
        tracing::debug!(
            event = "form_downgraded",
            concept = concept.id(),
            language = %term.language,
            text = %term.text,
        );
        term.status = Status::Unsanctioned;
        term.warnings.push(warning.clone());
        warnings.push(warning);
    }
    let rebuilt = concept.with_content(terms, concept.metadata().clone())?;
    Ok((rebuilt, warnings))
}
