use thiserror::Error;

/// A page as stored on the remote, with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage {
    pub raw: String,
    pub revision: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Title prefix, including the namespace (`Boazodoallu:`).
    pub prefix: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("edit conflict on `{id}` (expected revision {expected:?}, found {found:?})")]
    Conflict {
        id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    #[error("transient transport failure: {0}")]
    Transient(String),
    #[error("page `{0}` not found")]
    NotFound(String),
    #[error("transport failure: {0}")]
    Fatal(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// What the engine needs from a wiki. Authentication happens when the
/// transport is built, never through this trait.
pub trait WikiTransport {
    /// `None` when the page does not exist.
    fn fetch_concept(&self, id: &str) -> Result<Option<RemotePage>, TransportError>;

    /// Write a page and return its new revision. `expected_revision == None`
    /// means create: an existing page is a conflict. Otherwise the page must
    /// still be at `expected_revision`.
    fn save_page(
        &self,
        id: &str,
        raw: &str,
        expected_revision: Option<&str>,
        summary: &str,
    ) -> Result<String, TransportError>;

    fn delete_page(
        &self,
        id: &str,
        expected_revision: Option<&str>,
        reason: &str,
    ) -> Result<(), TransportError>;

    fn list_concept_ids(&self, filter: &ListFilter) -> Result<Vec<String>, TransportError>;
}
