//! Reconciliation Engine.
//!
//! [`reconcile`] compares a remote snapshot with an incoming one and emits the
//! edits that bring the remote in line, one per concept id, in ascending id
//! order. [`plan_move`] plans a rename or merge of a concept, and
//! [`apply_writes`] replays edits onto a local collection for export.

mod apply;
mod engine;
mod moves;

pub use apply::apply_writes;
pub use engine::{reconcile, Plan};
pub use moves::plan_move;

use serde::{Deserialize, Serialize};
use termwiki_core::{Concept, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("concept `{0}` does not exist")]
    UnknownConcept(String),
    #[error("concept `{0}` already exists; pass --merge to merge into it")]
    TargetExists(String),
    #[error("source and target are both `{0}`")]
    SameId(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One edit against the remote. `Update` carries the full merged concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    Create(Concept),
    Update {
        id: String,
        previous_revision: Option<String>,
        concept: Concept,
    },
    Delete {
        id: String,
        previous_revision: Option<String>,
    },
    #[serde(rename = "noop")]
    NoOp { id: String, reason: String },
}

impl EditOperation {
    pub fn id(&self) -> &str {
        match self {
            EditOperation::Create(c) => c.id(),
            EditOperation::Update { id, .. }
            | EditOperation::Delete { id, .. }
            | EditOperation::NoOp { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EditOperation::Create(_) => "create",
            EditOperation::Update { .. } => "update",
            EditOperation::Delete { .. } => "delete",
            EditOperation::NoOp { .. } => "noop",
        }
    }

    /// Concept written by this operation, if any.
    pub fn written(&self) -> Option<&Concept> {
        match self {
            EditOperation::Create(c) | EditOperation::Update { concept: c, .. } => Some(c),
            _ => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, EditOperation::NoOp { .. })
    }

    fn noop(id: &str, reason: &str) -> Self {
        EditOperation::NoOp {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub mod reason {
    pub const UNCHANGED: &str = "unchanged";
    pub const NO_EFFECTIVE_CHANGE: &str = "no effective change";
    pub const UNCHANGED_AFTER_VALIDATION: &str = "unchanged after validation";
    pub const NOT_PRESENT: &str = "not present";
}
