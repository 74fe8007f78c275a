use crate::retry::{with_retry_if, RetryConfig};
use crate::transport::{TransportError, WikiTransport};
use crate::Result;
use termwiki_core::{ParseWarning, Parsed, SourceParser};
use termwiki_parsers_wiki::{WikiPage, WikiParser};

/// Fetch and parse the remote concepts for `ids`.
///
/// Missing pages are simply absent from the snapshot. A page that keeps
/// failing with a transient error becomes a warning; any other transport
/// failure aborts, since without the remote state no safe plan exists.
pub fn fetch_remote<'i>(
    transport: &dyn WikiTransport,
    ids: impl IntoIterator<Item = &'i str>,
    retry: &RetryConfig,
) -> Result<Parsed> {
    let mut pages = Vec::new();
    let mut warnings = Vec::new();
    for id in ids {
        let (res, attempts) = with_retry_if(
            retry,
            "fetch",
            || transport.fetch_concept(id),
            TransportError::is_transient,
        );
        match res {
            Ok(Some(page)) => pages.push(WikiPage::new(id, page.raw, Some(page.revision))),
            Ok(None) => {}
            Err(e @ TransportError::Transient(_)) => {
                tracing::warn!(event = "fetch_failed", id, attempts, error = %e);
                warnings.push(ParseWarning::new(id, None, format!("not fetched: {e}")));
            }
            Err(e) => return Err(e.into()),
        }
    }
    let mut parsed = WikiParser.parse(&pages)?;
    warnings.append(&mut parsed.warnings);
    parsed.warnings = warnings;
    tracing::info!(
        event = "remote_fetched",
        concepts = parsed.collection.len(),
        warnings = parsed.warnings.len()
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirTransport;

    #[test]
    fn skips_missing_pages_and_reports_bad_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let t = DirTransport::new(tmp.path()).unwrap();
        t.save_page(
            "X:a",
            "{{Related expression\n|language=se\n|expression=beana\n|sanctioned=Yes\n}}\n{{Concept}}\n",
            None,
            "",
        )
        .unwrap();
        t.save_page("X:b", "#REDIRECT [[X:a]]", None, "").unwrap();
        let parsed = fetch_remote(&t, ["X:a", "X:b", "X:c"], &RetryConfig::default()).unwrap();
        assert_eq!(parsed.collection.len(), 1);
        assert_eq!(parsed.collection.get("X:a").unwrap().revision(), Some("1"));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].record, "X:b");
    }
}
