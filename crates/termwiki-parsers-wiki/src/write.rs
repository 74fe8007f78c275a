use crate::{WikiPage, RELATED_PREFIX};
use std::collections::BTreeMap;
use termwiki_core::{Collection, Concept, LanguageCode, ParseError, SourceSerializer};

#[derive(Debug, Default, Clone, Copy)]
pub struct WikiSerializer;

impl SourceSerializer for WikiSerializer {
    type Raw = Vec<WikiPage>;

    fn serialize(&self, collection: &Collection) -> Result<Vec<WikiPage>, ParseError> {
        Ok(collection
            .sorted()
            .into_iter()
            .map(|c| WikiPage::new(c.id(), render_concept(c), c.revision().map(str::to_string)))
            .collect())
    }
}

/// Page body for a concept: info blocks, expressions, related concepts, and
/// the `{{Concept}}` block last.
pub fn render_concept(concept: &Concept) -> String {
    let mut info: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    let mut related: Vec<(&str, &str)> = Vec::new();
    let mut fields: Vec<(&str, &str)> = Vec::new();

    for (key, value) in concept.metadata() {
        if let Some(target) = key.strip_prefix(RELATED_PREFIX) {
            related.push((target, value));
            continue;
        }
        match key.rsplit_once(':') {
            Some((field, lang)) if !field.is_empty() && LanguageCode::new(lang).is_ok() => {
                info.entry(lang).or_default().push((field, value));
            }
            _ => fields.push((key, value)),
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for (lang, entries) in &info {
        lines.push("{{Concept info".into());
        lines.push(format!("|language={lang}"));
        for (field, value) in entries {
            lines.push(format!("|{field}={value}"));
        }
        lines.push("}}".into());
    }

    for term in concept.terms() {
        lines.push("{{Related expression".into());
        lines.push(format!("|language={}", term.language));
        lines.push(format!("|expression={}", term.text));
        if let Some(s) = term.status.as_wiki() {
            lines.push(format!("|sanctioned={s}"));
        }
        if let Some(source) = &term.source {
            lines.push(format!("|source={source}"));
        }
        if !term.warnings.is_empty() {
            lines.push("|is_typo=Yes".into());
        }
        lines.push("}}".into());
    }

    for (target, relation) in related {
        lines.push("{{Related concept".into());
        lines.push(format!("|concept={target}"));
        lines.push(format!("|relation={relation}"));
        lines.push("}}".into());
    }

    if fields.is_empty() {
        lines.push("{{Concept}}".into());
    } else {
        lines.push("{{Concept".into());
        for (k, v) in fields {
            lines.push(format!("|{k}={v}"));
        }
        lines.push("}}".into());
    }
    lines.join("\n")
}
