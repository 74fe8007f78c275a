//! The capability every external representation implements: wiki pages and
//! spreadsheet rows both parse into, and serialize from, a [`Collection`].

use crate::Collection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A record that was skipped (or partially kept) while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    /// Concept id or page title the problem belongs to.
    pub record: String,
    /// 1-based line or row number when the source has one.
    pub line: Option<usize>,
    pub message: String,
}

impl ParseWarning {
    pub fn new(record: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            line,
            message: message.into(),
        }
    }
}

/// Failure of a whole input. Individual bad records are warnings instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed header: {0}")]
    Header(String),
    #[error("malformed input: {0}")]
    Format(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of a tolerant parse: everything usable, plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub collection: Collection,
    pub warnings: Vec<ParseWarning>,
}

pub trait SourceParser {
    type Raw: ?Sized;
    fn parse(&self, raw: &Self::Raw) -> Result<Parsed, ParseError>;
}

pub trait SourceSerializer {
    type Raw;
    fn serialize(&self, collection: &Collection) -> Result<Self::Raw, ParseError>;
}
