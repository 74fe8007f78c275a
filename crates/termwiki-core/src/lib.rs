//! Canonical term model shared by parsers, the reconciliation engine and the
//! executor. Pure data plus invariant checks; no I/O lives here.

mod metadata;
mod model;
mod normalize;
pub mod source;

pub use metadata::{
    canonical_collections, canonical_key, canonical_metadata, COLLECTION_KEY, LEGACY_INFO_LANGUAGES,
};
pub use model::{
    Collection, Concept, ConceptBuilder, LanguageCode, Status, TermForm, ValidationWarning,
};
pub use normalize::{normalize, normalize_for};
pub use source::{ParseError, ParseWarning, Parsed, SourceParser, SourceSerializer};

use thiserror::Error;

/// Metadata key prefix for links to other concepts: `related:<id>` = relation.
pub const RELATED_PREFIX: &str = "related:";

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Invariant violations of the canonical model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("duplicate form {language}:{text}")]
    DuplicateForm { language: String, text: String },
    #[error("term text is empty after normalization")]
    EmptyText,
    #[error("invalid language code `{0}`")]
    InvalidLanguage(String),
    #[error("concept `{0}` has no term forms")]
    NoTerms(String),
    #[error("concept id is empty")]
    EmptyId,
    #[error("duplicate concept id `{0}`")]
    DuplicateConcept(String),
}
