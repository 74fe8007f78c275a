use crate::retry::{with_retry_if, RetryConfig};
use crate::transport::{TransportError, WikiTransport};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use termwiki_parsers_wiki::render_concept;
use termwiki_reconcile::EditOperation;

/// Cooperative cancellation, checked before each operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied { revision: Option<String> },
    Skipped { reason: String },
    Conflict { expected: Option<String>, found: Option<String> },
    Failed { error: String, attempts: u32 },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied { .. } => "applied",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Conflict { .. } => "conflict",
            Outcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// Position of the operation in the plan.
    pub index: usize,
    pub id: String,
    pub kind: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: Vec<OperationResult>,
    /// First operation not attempted because the run was cancelled.
    pub resume_from: Option<usize>,
}

impl ExecutionReport {
    pub fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.count("conflict") == 0 && self.count("failed") == 0
    }
}

/// Applies edit operations one at a time against a [`WikiTransport`].
pub struct Executor<'a> {
    transport: &'a dyn WikiTransport,
    retry: RetryConfig,
    summary: String,
}

impl<'a> Executor<'a> {
    pub fn new(transport: &'a dyn WikiTransport, retry: RetryConfig, summary: impl Into<String>) -> Self {
        Self {
            transport,
            retry,
            summary: summary.into(),
        }
    }

    /// Apply `operations[start..]` in order. Conflicts and failures are
    /// recorded and the run goes on; cancellation stops before the next
    /// operation and sets `resume_from`.
    pub fn apply(
        &self,
        operations: &[EditOperation],
        start: usize,
        cancel: &CancelToken,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        for (index, op) in operations.iter().enumerate().skip(start) {
            if cancel.is_cancelled() {
                tracing::warn!(event = "execution_cancelled", resume_from = index);
                report.resume_from = Some(index);
                break;
            }
            let outcome = self.apply_one(op);
            log_outcome(index, op, &outcome);
            report.results.push(OperationResult {
                index,
                id: op.id().to_string(),
                kind: op.kind().to_string(),
                outcome,
            });
        }
        report
    }

    fn apply_one(&self, op: &EditOperation) -> Outcome {
        if let EditOperation::NoOp { reason, .. } = op {
            return Outcome::Skipped {
                reason: reason.clone(),
            };
        }
        let name = format!("{} {}", op.kind(), op.id());
        let (result, attempts) =
            with_retry_if(&self.retry, &name, || self.attempt(op), TransportError::is_transient);
        match result {
            Ok(revision) => Outcome::Applied { revision },
            Err(TransportError::Conflict { expected, found, .. }) => Outcome::Conflict { expected, found },
            Err(TransportError::NotFound(_)) => Outcome::Conflict {
                expected: expected_revision(op).map(str::to_string),
                found: None,
            },
            Err(e) => Outcome::Failed {
                error: e.to_string(),
                attempts,
            },
        }
    }

    /// Re-read the page, check it is still where the plan left it, then write.
    fn attempt(&self, op: &EditOperation) -> Result<Option<String>, TransportError> {
        let id = op.id();
        let expected = expected_revision(op);
        let current = self.transport.fetch_concept(id)?;
        let found = current.as_ref().map(|p| p.revision.as_str());
        if found != expected {
            return Err(TransportError::Conflict {
                id: id.to_string(),
                expected: expected.map(str::to_string),
                found: found.map(str::to_string),
            });
        }
        match op {
            EditOperation::Create(concept) | EditOperation::Update { concept, .. } => {
                let raw = render_concept(concept);
                self.transport
                    .save_page(id, &raw, expected, &self.summary)
                    .map(Some)
            }
            EditOperation::Delete { .. } => {
                self.transport.delete_page(id, expected, &self.summary)?;
                Ok(None)
            }
            EditOperation::NoOp { .. } => Ok(None),
        }
    }
}

fn expected_revision(op: &EditOperation) -> Option<&str> {
    match op {
        EditOperation::Update {
            previous_revision, ..
        }
        | EditOperation::Delete {
            previous_revision, ..
        } => previous_revision.as_deref(),
        _ => None,
    }
}

fn log_outcome(index: usize, op: &EditOperation, outcome: &Outcome) {
    let id = op.id();
    let kind = op.kind();
    match outcome {
        Outcome::Applied { revision } => {
            tracing::info!(event = "operation_applied", index, id, kind, revision = ?revision)
        }
        Outcome::Skipped { reason } => {
            tracing::debug!(event = "operation_skipped", index, id, kind, reason = %reason)
        }
        Outcome::Conflict { expected, found } => tracing::warn!(
            event = "operation_conflict",
            index,
            id,
            kind,
            expected = ?expected,
            found = ?found
        ),
        Outcome::Failed { error, attempts } => tracing::error!(
            event = "operation_failed",
            index,
            id,
            kind,
            attempts,
            error = %error
        ),
    }
}
