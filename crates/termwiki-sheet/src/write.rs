use crate::{FIXED_COLUMNS, SOURCE_COLUMN};
use std::collections::BTreeSet;
use std::io::Write;
use termwiki_core::{canonical_key, Collection, ParseError, SourceSerializer};

/// Writes one row per form. `metadata_columns` are always present in the
/// header, even when no concept has a value for them.
#[derive(Debug, Default, Clone)]
pub struct SheetSerializer {
    pub metadata_columns: Vec<String>,
}

impl SourceSerializer for SheetSerializer {
    type Raw = String;

    fn serialize(&self, collection: &Collection) -> Result<String, ParseError> {
        let mut buf = Vec::new();
        write_sheet(&mut buf, collection, &self.metadata_columns)?;
        String::from_utf8(buf).map_err(|e| ParseError::Format(e.to_string()))
    }
}

pub fn write_sheet<W: Write>(
    writer: W,
    collection: &Collection,
    extra_columns: &[String],
) -> Result<(), ParseError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let columns: BTreeSet<String> = collection
        .iter()
        .flat_map(|c| c.metadata().keys().cloned())
        .chain(extra_columns.iter().map(|c| canonical_key(c)))
        .collect();

    let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
    header.push(SOURCE_COLUMN);
    header.extend(columns.iter().map(String::as_str));
    wtr.write_record(&header).map_err(csv_err)?;

    for concept in collection.sorted() {
        for term in concept.terms() {
            let mut row: Vec<&str> = vec![
                concept.id(),
                term.language.as_str(),
                term.text.as_str(),
                term.status.as_str(),
                term.source.as_deref().unwrap_or(""),
            ];
            for col in &columns {
                row.push(concept.metadata().get(col).map(String::as_str).unwrap_or(""));
            }
            wtr.write_record(&row).map_err(csv_err)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn csv_err(e: csv::Error) -> ParseError {
    ParseError::Format(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termwiki_core::{Concept, LanguageCode, Status, TermForm};

    #[test]
    fn writes_sorted_rows_with_repeated_metadata() {
        let se = LanguageCode::new("se").unwrap();
        let mk = |id: &str, texts: &[&str]| {
            let mut b = Concept::builder(id).metadata("collection", "Collection:Boazu");
            for t in texts {
                b.add_term(TermForm::new(se.clone(), t, Status::Sanctioned).unwrap())
                    .unwrap();
            }
            b.build().unwrap()
        };
        let col: Collection = [mk("C2", &["boazu"]), mk("C1", &["beana", "bena"])]
            .into_iter()
            .collect();
        let out = SheetSerializer {
            metadata_columns: vec!["definition_se".into()],
        }
        .serialize(&col)
        .unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "concept_id,language,text,status,source,collection,definition:se");
        assert_eq!(lines[1], "C1,se,beana,sanctioned,,Collection:Boazu,");
        assert_eq!(lines[2], "C1,se,bena,sanctioned,,Collection:Boazu,");
        assert_eq!(lines[3], "C2,se,boazu,sanctioned,,Collection:Boazu,");
    }
}
