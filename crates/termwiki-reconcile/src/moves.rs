use crate::{reason, EditOperation, ReconcileError};
use termwiki_core::{Collection, Concept, RELATED_PREFIX};

/// Plan the rename of `from` to `to`.
///
/// Without `merge` the target id must be free. With `merge` the source is
/// folded into an existing target: forms are unioned (the target's copy wins
/// on an identical language and text) and the target's metadata wins per key.
/// Concepts that link to `from` are relinked to `to`. Operations come in
/// commit order: the target write, relinks, then the source delete.
pub fn plan_move(
    remote: &Collection,
    from: &str,
    to: &str,
    merge: bool,
) -> Result<Vec<EditOperation>, ReconcileError> {
    let (from, to) = (from.trim(), to.trim());
    if from == to {
        return Err(ReconcileError::SameId(from.to_string()));
    }
    let source = remote
        .get(from)
        .ok_or_else(|| ReconcileError::UnknownConcept(from.to_string()))?;

    let mut ops = Vec::new();
    match remote.get(to) {
        None => ops.push(EditOperation::Create(source.renamed(to)?)),
        Some(_) if !merge => return Err(ReconcileError::TargetExists(to.to_string())),
        Some(target) => {
            let merged = union(target, source)?;
            if merged.value_eq(target) {
                ops.push(EditOperation::noop(to, reason::NO_EFFECTIVE_CHANGE));
            } else {
                ops.push(EditOperation::Update {
                    id: to.to_string(),
                    previous_revision: target.revision().map(str::to_string),
                    concept: merged,
                });
            }
        }
    }

    let old_link = format!("{RELATED_PREFIX}{from}");
    let new_link = format!("{RELATED_PREFIX}{to}");
    for other in remote.sorted() {
        if other.id() == from || other.id() == to {
            continue;
        }
        let Some(relation) = other.metadata().get(&old_link) else {
            continue;
        };
        let mut metadata = other.metadata().clone();
        metadata.remove(&old_link);
        metadata.entry(new_link.clone()).or_insert_with(|| relation.clone());
        ops.push(EditOperation::Update {
            id: other.id().to_string(),
            previous_revision: other.revision().map(str::to_string),
            concept: other.with_content(other.terms().to_vec(), metadata)?,
        });
    }

    ops.push(EditOperation::Delete {
        id: from.to_string(),
        previous_revision: source.revision().map(str::to_string),
    });
    tracing::info!(event = "move_planned", from, to, merge, operations = ops.len());
    Ok(ops)
}

fn union(target: &Concept, source: &Concept) -> Result<Concept, ReconcileError> {
    let mut terms = target.terms().to_vec();
    for t in source.terms() {
        if !target.contains(&t.language, &t.text) {
            terms.push(t.clone());
        }
    }
    let mut metadata = source.metadata().clone();
    metadata.extend(target.metadata().iter().map(|(k, v)| (k.clone(), v.clone())));
    // a merged concept does not link to itself
    metadata.remove(&format!("{RELATED_PREFIX}{}", source.id()));
    metadata.remove(&format!("{RELATED_PREFIX}{}", target.id()));
    Ok(target.with_content(terms, metadata)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termwiki_core::{LanguageCode, Status, TermForm};

    fn concept(id: &str, rev: &str, forms: &[(&str, &str, Status)]) -> Concept {
        let mut b = Concept::builder(id).revision(Some(rev.into()));
        for (l, t, s) in forms {
            b.add_term(TermForm::new(LanguageCode::new(l).unwrap(), t, *s).unwrap())
                .unwrap();
        }
        b.build().unwrap()
    }

    fn remote() -> Collection {
        let a = concept(
            "A:beana",
            "1",
            &[("se", "beana", Status::Sanctioned), ("nb", "hund", Status::Sanctioned)],
        );
        let b = concept(
            "B:beana",
            "2",
            &[
                ("se", "beana", Status::Unsanctioned),
                ("fi", "koira", Status::Sanctioned),
            ],
        );
        let c = Concept::builder("C:gáica")
            .revision(Some("3".into()))
            .metadata("related:A:beana", "cohyponym")
            .term(TermForm::new(LanguageCode::new("se").unwrap(), "gáica", Status::Sanctioned).unwrap())
            .unwrap()
            .build()
            .unwrap();
        [a, b, c].into_iter().collect()
    }

    #[test]
    fn rename_creates_relinks_then_deletes() {
        let ops = plan_move(&remote(), "A:beana", "D:beana", false).unwrap();
        let kinds: Vec<_> = ops.iter().map(|o| (o.kind(), o.id())).collect();
        assert_eq!(
            kinds,
            vec![("create", "D:beana"), ("update", "C:gáica"), ("delete", "A:beana")]
        );
        let created = ops[0].written().unwrap();
        assert_eq!(created.revision(), None);
        let relinked = ops[1].written().unwrap();
        assert_eq!(relinked.metadata().get("related:D:beana").map(String::as_str), Some("cohyponym"));
        assert!(!relinked.metadata().contains_key("related:A:beana"));
        assert!(matches!(&ops[2], EditOperation::Delete { previous_revision: Some(r), .. } if r == "1"));
    }

    #[test]
    fn merge_keeps_target_copy_of_shared_forms() {
        let ops = plan_move(&remote(), "A:beana", "B:beana", true).unwrap();
        let EditOperation::Update { previous_revision, concept, .. } = &ops[0] else {
            panic!("expected update, got {:?}", ops[0]);
        };
        assert_eq!(previous_revision.as_deref(), Some("2"));
        // (se, beana) is on both: the target's unsanctioned copy wins
        let forms: Vec<_> = concept
            .terms()
            .iter()
            .map(|t| (t.language.as_str(), t.text.as_str(), t.status))
            .collect();
        assert_eq!(
            forms,
            vec![
                ("fi", "koira", Status::Sanctioned),
                ("nb", "hund", Status::Sanctioned),
                ("se", "beana", Status::Unsanctioned),
            ]
        );
        assert_eq!(ops.last().map(|o| o.kind()), Some("delete"));
    }

    #[test]
    fn target_without_merge_and_unknown_source_fail() {
        assert!(matches!(
            plan_move(&remote(), "A:beana", "B:beana", false),
            Err(ReconcileError::TargetExists(_))
        ));
        assert!(matches!(
            plan_move(&remote(), "X:y", "Z:y", false),
            Err(ReconcileError::UnknownConcept(_))
        ));
        assert!(matches!(
            plan_move(&remote(), "A:beana", "A:beana", true),
            Err(ReconcileError::SameId(_))
        ));
    }
}
