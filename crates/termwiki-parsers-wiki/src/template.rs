//! Line-oriented reader for the semantic-form templates used on term pages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Concept,
    ConceptInfo,
    RelatedExpression,
    RelatedConcept,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Concept => "Concept",
            Kind::ConceptInfo => "Concept info",
            Kind::RelatedExpression => "Related expression",
            Kind::RelatedConcept => "Related concept",
        }
    }

    fn of_line(line: &str) -> Option<Kind> {
        // order matters: every template name starts with one of the others
        if line.starts_with("{{Concept info") {
            Some(Kind::ConceptInfo)
        } else if line.starts_with("{{Concept") {
            Some(Kind::Concept)
        } else if line.starts_with("{{Related expression") || line.starts_with("{{Related_expression") {
            Some(Kind::RelatedExpression)
        } else if line.starts_with("{{Related") {
            Some(Kind::RelatedConcept)
        } else {
            None
        }
    }
}

/// Fields that annotate a form on the wiki and never round-trip into the model.
const IGNORED: &[&str] = &[
    "|reviewed=",
    "|is_typo",
    "|has_illegal_char",
    "|in_header",
    "|no picture",
];

#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub kind: Kind,
    /// 1-based line of the opening `{{`.
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl Block {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &str, value: String) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    fn append(&mut self, key: &str, more: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => {
                slot.1.push('\n');
                slot.1.push_str(more);
            }
            None => self.fields.push((key.to_string(), more.to_string())),
        }
    }
}

/// Split a page body into its templates. Text outside templates is ignored.
pub(crate) fn blocks(text: &str) -> Result<Vec<Block>, String> {
    let text = text.replace('\u{a0}', " ");
    let mut lines = text.lines().enumerate();
    let mut out = Vec::new();

    while let Some((idx, raw)) = lines.next() {
        let line = raw.trim();
        let Some(kind) = Kind::of_line(line) else {
            continue;
        };
        let mut block = Block {
            kind,
            line: idx + 1,
            fields: Vec::new(),
        };
        if line.ends_with("}}") {
            // one-line template such as `{{Concept}}`
            if kind == Kind::Concept {
                out.push(block);
            }
            continue;
        }

        let mut key: Option<String> = None;
        let mut closed = false;
        for (_, raw) in lines.by_ref() {
            let line = raw.trim();
            if line == "}}" {
                closed = true;
                break;
            }
            if IGNORED.iter().any(|p| line.starts_with(p)) {
                key = None;
                continue;
            }
            if let Some(field) = line.strip_prefix('|') {
                let Some((k, v)) = field.split_once('=') else {
                    key = None;
                    continue;
                };
                let k = k.trim();
                let v = v.trim();
                if !v.is_empty() {
                    block.set(k, v.to_string());
                }
                key = Some(k.to_string());
            } else if let Some(k) = &key {
                if !line.is_empty() {
                    block.append(k, line);
                }
            }
        }
        if !closed {
            return Err(format!(
                "unterminated {{{{{}}}}} template at line {}",
                kind.name(),
                block.line
            ));
        }
        out.push(block);
    }
    Ok(out)
}
