use crate::{FIXED_COLUMNS, SOURCE_COLUMN};
use std::collections::HashMap;
use std::path::Path;
use termwiki_core::{
    ConceptBuilder, LanguageCode, ParseError, ParseWarning, Parsed, SourceParser, Status, TermForm,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct SheetParser;

struct Group {
    builder: ConceptBuilder,
    line: Option<usize>,
}

impl SourceParser for SheetParser {
    type Raw = str;

    fn parse(&self, raw: &str) -> Result<Parsed, ParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| ParseError::Header(e.to_string()))?
            .clone();
        if headers.len() < FIXED_COLUMNS.len() {
            return Err(ParseError::Header(format!(
                "expected at least {} columns, found {}",
                FIXED_COLUMNS.len(),
                headers.len()
            )));
        }
        for (i, want) in FIXED_COLUMNS.iter().enumerate() {
            let got = headers.get(i).unwrap_or_default();
            if !got.eq_ignore_ascii_case(want) {
                return Err(ParseError::Header(format!(
                    "column {} must be `{want}`, found `{got}`",
                    i + 1
                )));
            }
        }
        let source_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(SOURCE_COLUMN));
        let meta_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .skip(FIXED_COLUMNS.len())
            .filter(|(i, h)| Some(*i) != source_col && !h.is_empty())
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut out = Parsed::default();
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Group> = HashMap::new();

        for (n, rec) in rdr.records().enumerate() {
            let rec = match rec {
                Ok(r) => r,
                Err(e) => {
                    out.warnings.push(ParseWarning::new("", Some(n + 2), e.to_string()));
                    continue;
                }
            };
            let line = rec.position().map(|p| p.line() as usize).or(Some(n + 2));
            let cell = |i: usize| rec.get(i).unwrap_or_default();
            let id = cell(0);
            if id.is_empty() {
                out.warnings.push(ParseWarning::new("", line, "row without concept_id"));
                continue;
            }
            let group = groups.entry(id.to_string()).or_insert_with(|| {
                order.push(id.to_string());
                Group {
                    builder: ConceptBuilder::new(id),
                    line,
                }
            });

            let form = match row_form(cell(1), cell(2), cell(3)) {
                Ok(f) => f.with_source(source_col.map(|i| cell(i).to_string())),
                Err(msg) => {
                    out.warnings.push(ParseWarning::new(id, line, msg));
                    continue;
                }
            };
            if let Err(e) = group.builder.add_term(form) {
                out.warnings.push(ParseWarning::new(id, line, e.to_string()));
                continue;
            }
            for (i, name) in &meta_cols {
                let value = cell(*i);
                if value.is_empty() {
                    continue;
                }
                match group.builder.get_metadata(name) {
                    None => group.builder.set_metadata(name.as_str(), value),
                    Some(prev) if prev != value => out.warnings.push(ParseWarning::new(
                        id,
                        line,
                        format!("conflicting `{name}` value `{value}`, keeping `{prev}`"),
                    )),
                    Some(_) => {}
                }
            }
        }

        for id in order {
            let Some(group) = groups.remove(&id) else { continue };
            match group.builder.build() {
                Ok(concept) => {
                    if let Err(e) = out.collection.insert(concept) {
                        out.warnings.push(ParseWarning::new(&id, group.line, e.to_string()));
                    }
                }
                Err(e) => out.warnings.push(ParseWarning::new(&id, group.line, e.to_string())),
            }
        }
        tracing::debug!(
            event = "sheet_parsed",
            concepts = out.collection.len(),
            warnings = out.warnings.len()
        );
        Ok(out)
    }
}

fn row_form(language: &str, text: &str, status: &str) -> Result<TermForm, String> {
    let language = LanguageCode::new(language).map_err(|e| e.to_string())?;
    let status = Status::parse(status).ok_or_else(|| format!("unknown status `{status}`"))?;
    TermForm::new(language, text, status).map_err(|e| e.to_string())
}

pub fn read_sheet(path: &Path) -> Result<Parsed, ParseError> {
    let text = std::fs::read_to_string(path)?;
    SheetParser.parse(&text)
}
