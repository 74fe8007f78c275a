//! Wiki side of the term exchange: one page per concept, the page title is the
//! concept id and the body is a sequence of `{{...}}` templates.

mod dump;
mod parse;
mod template;
mod write;

pub use dump::{read_dump, read_dump_file};
pub use parse::{parse_page, WikiParser};
pub use write::{render_concept, WikiSerializer};

pub(crate) use termwiki_core::RELATED_PREFIX;

/// A raw page as fetched from the wiki or read from a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub title: String,
    pub text: String,
    pub revision: Option<String>,
}

impl WikiPage {
    pub fn new(title: impl Into<String>, text: impl Into<String>, revision: Option<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            revision,
        }
    }
}
