use crate::EditOperation;
use termwiki_core::Collection;

/// Replay edits onto a local copy, ignoring revisions. Used by the export path,
/// where the "remote" is a spreadsheet rather than the wiki.
pub fn apply_writes(base: &Collection, operations: &[EditOperation]) -> Collection {
    let mut out = base.clone();
    for op in operations {
        match op {
            EditOperation::Create(c) | EditOperation::Update { concept: c, .. } => {
                out.upsert(c.clone().with_revision(None))
            }
            EditOperation::Delete { id, .. } => {
                out.remove(id);
            }
            EditOperation::NoOp { .. } => {}
        }
    }
    out
}
