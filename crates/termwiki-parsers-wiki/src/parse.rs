use crate::template::{blocks, Block, Kind};
use crate::{WikiPage, RELATED_PREFIX};
use termwiki_core::{
    canonical_collections, Concept, ConceptBuilder, LanguageCode, ParseError, ParseWarning, Parsed,
    SourceParser, Status, TermForm, COLLECTION_KEY,
};

const REDIRECT_MARKERS: &[&str] = &["#REDIRECT", "#STIVREN", "#OMDIRIGERING"];

/// Parses fetched pages into concepts; pages that cannot be read become warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct WikiParser;

impl SourceParser for WikiParser {
    type Raw = [WikiPage];

    fn parse(&self, pages: &[WikiPage]) -> Result<Parsed, ParseError> {
        let mut out = Parsed::default();
        for page in pages {
            match parse_page(page) {
                Ok(concept) => {
                    if let Err(e) = out.collection.insert(concept) {
                        out.warnings.push(ParseWarning::new(&page.title, None, e.to_string()));
                    }
                }
                Err(w) => {
                    tracing::debug!(event = "page_skipped", title = %page.title, reason = %w.message);
                    out.warnings.push(w);
                }
            }
        }
        Ok(out)
    }
}

/// Parse one page. The error is the reason the page was skipped.
pub fn parse_page(page: &WikiPage) -> Result<Concept, ParseWarning> {
    let title = page.title.trim();
    let warn = |line: Option<usize>, msg: String| ParseWarning::new(title, line, msg);

    if title.is_empty() {
        return Err(warn(None, "page has no title".into()));
    }
    let first = page.text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let upper = first.to_uppercase();
    if REDIRECT_MARKERS.iter().any(|m| upper.starts_with(m)) {
        return Err(warn(Some(1), "redirect page".into()));
    }
    if !page.text.contains("{{Concept") {
        return Err(warn(None, "not a concept page".into()));
    }

    let blocks = blocks(&page.text).map_err(|e| warn(None, e))?;
    let mut builder = ConceptBuilder::new(title).revision(page.revision.clone());
    let mut collections: Vec<String> = Vec::new();

    for block in &blocks {
        match block.kind {
            Kind::Concept => read_concept(block, &mut builder, &mut collections),
            Kind::ConceptInfo => {
                let lang = block_language(block).map_err(|m| warn(Some(block.line), m))?;
                for (k, v) in &block.fields {
                    if k != "language" {
                        builder.set_metadata(format!("{k}:{lang}"), v.clone());
                    }
                }
            }
            Kind::RelatedExpression => {
                let form = read_expression(block, &mut collections)
                    .map_err(|m| warn(Some(block.line), m))?;
                builder
                    .add_term(form)
                    .map_err(|e| warn(Some(block.line), e.to_string()))?;
            }
            Kind::RelatedConcept => {
                let Some(target) = block.get("concept") else {
                    return Err(warn(Some(block.line), "related concept without `concept`".into()));
                };
                let relation = block.get("relation").unwrap_or_default();
                builder.set_metadata(format!("{RELATED_PREFIX}{target}"), relation);
            }
        }
    }

    if !collections.is_empty() {
        let joined = canonical_collections(collections.iter().map(String::as_str));
        builder.set_metadata(COLLECTION_KEY, joined);
    }
    if builder.is_empty() {
        return Err(warn(None, "concept has no related expressions".into()));
    }
    builder.build().map_err(|e| warn(None, e.to_string()))
}

fn read_concept(block: &Block, builder: &mut ConceptBuilder, collections: &mut Vec<String>) {
    for (k, v) in &block.fields {
        if k == "language" {
            continue;
        }
        if k == COLLECTION_KEY {
            collections.push(v.clone());
            continue;
        }
        // legacy `field_lang` keys are rewritten by the builder
        builder.set_metadata(k.clone(), v.clone());
    }
}

fn block_language(block: &Block) -> Result<LanguageCode, String> {
    let raw = block
        .get("language")
        .ok_or_else(|| "template without `language`".to_string())?;
    LanguageCode::new(raw).map_err(|e| e.to_string())
}

fn read_expression(block: &Block, collections: &mut Vec<String>) -> Result<TermForm, String> {
    let language = block_language(block)?;
    let text = block
        .get("expression")
        .ok_or_else(|| "related expression without `expression`".to_string())?;
    let status = match block.get("sanctioned") {
        Some(raw) => Status::parse(raw).ok_or_else(|| format!("unknown sanctioned value `{raw}`"))?,
        None => Status::Unknown,
    };
    if let Some(c) = block.get("collection") {
        collections.push(c.replace('_', " "));
    }
    let form = TermForm::new(language, text, status).map_err(|e| e.to_string())?;
    Ok(form.with_source(block.get("source").map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> WikiPage {
        WikiPage::new("Boazodoallu:beana", text, Some("42".into()))
    }

    #[test]
    fn parses_expressions_info_and_relations() {
        let text = "{{Concept info\n|language=se\n|definition=elli mii ciellá\n}}\n{{Related expression\n|language=se\n|expression=beana\n|sanctioned=Yes\n|source=SÁM\n}}\n{{Related expression\n|language=fi\n|expression=koira\n|sanctioned=No\n}}\n{{Related concept\n|concept=Boazodoallu:gáica\n|relation=cohyponym\n}}\n{{Concept\n|collection=Boazu@@ Collection:Ealli\n}}\n";
        let c = parse_page(&page(text)).unwrap();
        assert_eq!(c.id(), "Boazodoallu:beana");
        assert_eq!(c.revision(), Some("42"));
        assert_eq!(c.terms().len(), 2);
        assert_eq!(c.terms()[0].language.as_str(), "fi");
        assert_eq!(c.terms()[0].status, Status::Unsanctioned);
        assert_eq!(c.terms()[1].source.as_deref(), Some("SÁM"));
        let md = c.metadata();
        assert_eq!(md["definition:se"], "elli mii ciellá");
        assert_eq!(md["related:Boazodoallu:gáica"], "cohyponym");
        assert_eq!(md["collection"], "Collection:Boazu@@ Collection:Ealli");
    }

    #[test]
    fn legacy_concept_keys_become_info() {
        let text = "{{Related expression\n|language=se\n|expression=beana\n}}\n{{Concept\n|definition_se=elli\n|more_info=x\n}}";
        let c = parse_page(&page(text)).unwrap();
        assert_eq!(c.metadata()["definition:se"], "elli");
        assert_eq!(c.metadata()["more_info"], "x");
        assert_eq!(c.terms()[0].status, Status::Unknown);
    }

    #[test]
    fn redirects_and_plain_pages_are_skipped() {
        let w = parse_page(&page("#STIVREN [[Boazodoallu:boazu]]")).unwrap_err();
        assert_eq!(w.message, "redirect page");
        let w = parse_page(&page("just prose")).unwrap_err();
        assert_eq!(w.message, "not a concept page");
    }

    #[test]
    fn bad_expressions_skip_the_page() {
        let missing = "{{Related expression\n|language=se\n}}\n{{Concept}}";
        assert!(parse_page(&page(missing)).is_err());
        let bad_lang = "{{Related expression\n|language=Sámegiella\n|expression=beana\n}}\n{{Concept}}";
        assert!(parse_page(&page(bad_lang)).is_err());
        let dup = "{{Related expression\n|language=se\n|expression=beana\n}}\n{{Related expression\n|language=se\n|expression= beana\n}}\n{{Concept}}";
        let w = parse_page(&page(dup)).unwrap_err();
        assert!(w.message.contains("duplicate"), "{}", w.message);
        assert_eq!(w.line, Some(5));
        let empty = "{{Concept\n|collection=Boazu\n}}";
        assert!(parse_page(&page(empty)).is_err());
    }

    #[test]
    fn one_bad_page_does_not_block_the_rest() {
        let good = page("{{Related expression\n|language=se\n|expression=beana\n}}\n{{Concept}}");
        let mut bad = page("{{Concept\n|collection=x\n");
        bad.title = "Boazodoallu:boazu".into();
        let parsed = WikiParser.parse(&[bad, good]).unwrap();
        assert_eq!(parsed.collection.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].record, "Boazodoallu:boazu");
    }
}
