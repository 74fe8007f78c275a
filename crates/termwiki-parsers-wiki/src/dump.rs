use crate::WikiPage;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;
use std::path::Path;
use termwiki_core::ParseError;

/// Namespaces in a termwiki export that never hold concepts.
const SKIPPED_PREFIXES: &[&str] = &["Expression:", "Collection:"];

#[derive(Default)]
struct PageAcc {
    title: String,
    text: String,
    revision: Option<String>,
}

/// Read a MediaWiki XML export. Only the latest `<revision>` of each page is
/// kept; expression and collection pages are dropped.
pub fn read_dump<R: BufRead>(input: R) -> Result<Vec<WikiPage>, ParseError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<PageAcc> = None;
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "page" => current = Some(PageAcc::default()),
                    // a later revision replaces the text of an earlier one
                    "revision" => {
                        if let Some(p) = current.as_mut() {
                            p.text.clear();
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::End(e)) => {
                stack.pop();
                if e.local_name().as_ref() == b"page" {
                    if let Some(p) = current.take() {
                        let title = p.title.trim();
                        if title.is_empty() || SKIPPED_PREFIXES.iter().any(|s| title.starts_with(s)) {
                            tracing::trace!(event = "dump_page_ignored", title);
                        } else {
                            out.push(WikiPage::new(title, p.text, p.revision));
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let value = e
                    .unescape()
                    .map_err(|err| ParseError::Format(format!("dump text: {err}")))?;
                push_text(&stack, current.as_mut(), &value);
            }
            Ok(Event::CData(e)) => {
                let value = String::from_utf8_lossy(&e.into_inner()).to_string();
                push_text(&stack, current.as_mut(), &value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Format(format!(
                    "dump at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn push_text(stack: &[String], page: Option<&mut PageAcc>, value: &str) {
    let Some(page) = page else { return };
    let n = stack.len();
    let parent = if n >= 2 { stack[n - 2].as_str() } else { "" };
    match (parent, stack.last().map(String::as_str)) {
        ("page", Some("title")) => page.title.push_str(value),
        ("revision", Some("id")) => page.revision = Some(value.trim().to_string()),
        ("revision", Some("text")) => page.text.push_str(value),
        _ => {}
    }
}

pub fn read_dump_file(path: &Path) -> Result<Vec<WikiPage>, ParseError> {
    let file = std::fs::File::open(path)?;
    read_dump(std::io::BufReader::new(file))
}
