use crate::{canonical_metadata, normalize_for, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// ISO-639 style language tag: two or three lowercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: &str) -> Result<Self, ModelError> {
        let code = code.trim();
        let ok = (2..=3).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_lowercase());
        if ok {
            Ok(Self(code.to_string()))
        } else {
            Err(ModelError::InvalidLanguage(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LanguageCode {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Approval status of a term form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Sanctioned,
    Unsanctioned,
    #[default]
    Unknown,
}

impl Status {
    /// Accepts the wiki spellings (`Yes`/`No`), the legacy booleans and the
    /// spreadsheet words. Case-insensitive; empty input means `Unknown`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "true" | "sanctioned" => Some(Self::Sanctioned),
            "no" | "false" | "unsanctioned" => Some(Self::Unsanctioned),
            "" | "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sanctioned => "sanctioned",
            Self::Unsanctioned => "unsanctioned",
            Self::Unknown => "unknown",
        }
    }

    /// Value written into `|sanctioned=`; `None` means the field is omitted.
    pub fn as_wiki(&self) -> Option<&'static str> {
        match self {
            Self::Sanctioned => Some("Yes"),
            Self::Unsanctioned => Some("No"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A morphology mismatch recorded against a form that was downgraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub concept_id: String,
    pub language: LanguageCode,
    pub text: String,
    pub previous_status: Status,
    pub message: String,
}

/// One language's spelling of a concept.
///
/// `warnings` are annotations produced during reconciliation; they are not part
/// of the form's value and are ignored by equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermForm {
    pub language: LanguageCode,
    pub text: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

impl TermForm {
    /// Build a form, normalizing `text` for its language.
    pub fn new(language: LanguageCode, text: &str, status: Status) -> Result<Self, ModelError> {
        let text = normalize_for(language.as_str(), text);
        if text.is_empty() {
            return Err(ModelError::EmptyText);
        }
        Ok(Self {
            language,
            text,
            status,
            source: None,
            warnings: Vec::new(),
        })
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Uniqueness key inside a concept.
    pub fn key(&self) -> (&LanguageCode, &str) {
        (&self.language, self.text.as_str())
    }

    fn value_key(&self) -> (&LanguageCode, &str, Status, Option<&str>) {
        (
            &self.language,
            self.text.as_str(),
            self.status,
            self.source.as_deref(),
        )
    }
}

impl PartialEq for TermForm {
    fn eq(&self, other: &Self) -> bool {
        self.value_key() == other.value_key()
    }
}

impl Eq for TermForm {}

/// A unit of meaning: term forms across languages plus free-form metadata.
///
/// Fields are private so that every instance upholds: non-empty id, at least
/// one form, unique `(language, text)`, forms ordered by language then insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ConceptRepr", into = "ConceptRepr")]
pub struct Concept {
    id: String,
    terms: Vec<TermForm>,
    metadata: BTreeMap<String, String>,
    revision: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ConceptRepr {
    id: String,
    terms: Vec<TermForm>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
}

impl TryFrom<ConceptRepr> for Concept {
    type Error = ModelError;
    fn try_from(r: ConceptRepr) -> Result<Self, Self::Error> {
        let mut b = ConceptBuilder::new(&r.id).revision(r.revision);
        for (k, v) in r.metadata {
            b = b.metadata(k, v);
        }
        for t in r.terms {
            let mut form = TermForm::new(t.language, &t.text, t.status)?.with_source(t.source);
            form.warnings = t.warnings;
            b.add_term(form)?;
        }
        b.build()
    }
}

impl From<Concept> for ConceptRepr {
    fn from(c: Concept) -> Self {
        Self {
            id: c.id,
            terms: c.terms,
            metadata: c.metadata,
            revision: c.revision,
        }
    }
}

impl Concept {
    pub fn builder(id: &str) -> ConceptBuilder {
        ConceptBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn terms(&self) -> &[TermForm] {
        &self.terms
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn languages(&self) -> BTreeSet<&LanguageCode> {
        self.terms.iter().map(|t| &t.language).collect()
    }

    pub fn terms_for<'a>(&'a self, language: &'a LanguageCode) -> impl Iterator<Item = &'a TermForm> {
        self.terms.iter().filter(move |t| &t.language == language)
    }

    pub fn contains(&self, language: &LanguageCode, text: &str) -> bool {
        self.terms
            .iter()
            .any(|t| &t.language == language && t.text == text)
    }

    /// Value equality: forms as a set plus metadata. Identity (`id`,
    /// `revision`) and form annotations do not participate.
    pub fn value_eq(&self, other: &Concept) -> bool {
        let a: BTreeSet<_> = self.terms.iter().map(TermForm::value_key).collect();
        let b: BTreeSet<_> = other.terms.iter().map(TermForm::value_key).collect();
        a == b && self.metadata == other.metadata
    }

    /// New concept with `form` added. Fails on a duplicate `(language, text)`.
    pub fn with_term(&self, form: TermForm) -> Result<Concept, ModelError> {
        let mut b = self.to_builder();
        b.add_term(form)?;
        b.build()
    }

    /// New concept with the same identity and the given forms and metadata.
    pub fn with_content(
        &self,
        terms: Vec<TermForm>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Concept, ModelError> {
        let mut b = ConceptBuilder::new(&self.id).revision(self.revision.clone());
        b.metadata = metadata;
        for t in terms {
            b.add_term(t)?;
        }
        b.build()
    }

    /// Copy under another id. The revision is dropped: it belonged to the old page.
    pub fn renamed(&self, id: &str) -> Result<Concept, ModelError> {
        let mut b = self.to_builder();
        b.id = id.trim().to_string();
        b.revision = None;
        b.build()
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Concept {
        self.revision = revision;
        self
    }

    fn to_builder(&self) -> ConceptBuilder {
        ConceptBuilder {
            id: self.id.clone(),
            terms: self.terms.clone(),
            metadata: self.metadata.clone(),
            revision: self.revision.clone(),
        }
    }
}

/// Accumulates forms and metadata; `build` checks the concept invariants.
#[derive(Debug, Clone, Default)]
pub struct ConceptBuilder {
    id: String,
    terms: Vec<TermForm>,
    metadata: BTreeMap<String, String>,
    revision: Option<String>,
}

impl ConceptBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Add a form; `DuplicateForm` if the `(language, text)` pair is taken.
    pub fn add_term(&mut self, form: TermForm) -> Result<&mut Self, ModelError> {
        if self.terms.iter().any(|t| t.key() == form.key()) {
            return Err(ModelError::DuplicateForm {
                language: form.language.to_string(),
                text: form.text,
            });
        }
        self.terms.push(form);
        Ok(self)
    }

    pub fn term(mut self, form: TermForm) -> Result<Self, ModelError> {
        self.add_term(form)?;
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn build(mut self) -> Result<Concept, ModelError> {
        if self.id.is_empty() {
            return Err(ModelError::EmptyId);
        }
        if self.terms.is_empty() {
            return Err(ModelError::NoTerms(self.id));
        }
        // stable: insertion order survives within a language
        self.terms.sort_by(|a, b| a.language.cmp(&b.language));
        Ok(Concept {
            id: self.id,
            terms: self.terms,
            metadata: canonical_metadata(self.metadata),
            revision: self.revision,
        })
    }
}

/// One snapshot of concepts, unique by id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    concepts: Vec<Concept>,
    index: HashMap<String, usize>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept: Concept) -> Result<(), ModelError> {
        if self.index.contains_key(concept.id()) {
            return Err(ModelError::DuplicateConcept(concept.id().to_string()));
        }
        self.index.insert(concept.id().to_string(), self.concepts.len());
        self.concepts.push(concept);
        Ok(())
    }

    /// Insert or overwrite by id, keeping the original position on overwrite.
    pub fn upsert(&mut self, concept: Concept) {
        match self.index.get(concept.id()) {
            Some(&i) => self.concepts[i] = concept,
            None => {
                self.index.insert(concept.id().to_string(), self.concepts.len());
                self.concepts.push(concept);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Concept> {
        let i = self.index.remove(id)?;
        let removed = self.concepts.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Concept> {
        self.index.get(id).map(|&i| &self.concepts[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Concept> {
        self.concepts.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.concepts.iter().map(|c| c.id())
    }

    /// Concepts in ascending id order.
    pub fn sorted(&self) -> Vec<&Concept> {
        let mut out: Vec<&Concept> = self.concepts.iter().collect();
        out.sort_by(|a, b| a.id().cmp(b.id()));
        out
    }

    /// Same ids, and every concept value-equal to its counterpart.
    pub fn value_eq(&self, other: &Collection) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|c| other.get(c.id()).is_some_and(|o| c.value_eq(o)))
    }
}

impl FromIterator<Concept> for Collection {
    /// Later duplicates overwrite earlier ones.
    fn from_iter<I: IntoIterator<Item = Concept>>(iter: I) -> Self {
        let mut c = Collection::new();
        for concept in iter {
            c.upsert(concept);
        }
        c
    }
}

impl IntoIterator for Collection {
    type Item = Concept;
    type IntoIter = std::vec::IntoIter<Concept>;
    fn into_iter(self) -> Self::IntoIter {
        self.concepts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Concept;
    type IntoIter = std::slice::Iter<'a, Concept>;
    fn into_iter(self) -> Self::IntoIter {
        self.concepts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(c: &str) -> LanguageCode {
        LanguageCode::new(c).unwrap()
    }

    fn form(l: &str, t: &str, s: Status) -> TermForm {
        TermForm::new(lang(l), t, s).unwrap()
    }

    #[test]
    fn language_code_format() {
        assert!(LanguageCode::new("se").is_ok());
        assert!(LanguageCode::new("sma").is_ok());
        assert!(LanguageCode::new("SE").is_err());
        assert!(LanguageCode::new("nob1").is_err());
        assert!(LanguageCode::new("").is_err());
    }

    #[test]
    fn status_accepts_wiki_and_sheet_spellings() {
        assert_eq!(Status::parse("Yes"), Some(Status::Sanctioned));
        assert_eq!(Status::parse("False"), Some(Status::Unsanctioned));
        assert_eq!(Status::parse("UNSANCTIONED"), Some(Status::Unsanctioned));
        assert_eq!(Status::parse(""), Some(Status::Unknown));
        assert_eq!(Status::parse("maybe"), None);
    }

    #[test]
    fn duplicate_form_is_rejected_after_normalization() {
        let mut b = Concept::builder("C1");
        b.add_term(form("se", "beana", Status::Sanctioned)).unwrap();
        let err = b
            .add_term(form("se", "  beana ", Status::Unsanctioned))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateForm { .. }));
        // same text in another language is fine
        b.add_term(form("sma", "beana", Status::Unknown)).unwrap();
    }

    #[test]
    fn empty_concept_and_empty_text_fail() {
        assert_eq!(
            Concept::builder("C1").build().unwrap_err(),
            ModelError::NoTerms("C1".into())
        );
        assert_eq!(
            TermForm::new(lang("fi"), " \t ", Status::Unknown).unwrap_err(),
            ModelError::EmptyText
        );
    }

    #[test]
    fn terms_are_ordered_by_language_then_insertion() {
        let c = Concept::builder("C1")
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap()
            .term(form("fi", "koira", Status::Unsanctioned))
            .unwrap()
            .term(form("se", "bena", Status::Unknown))
            .unwrap()
            .build()
            .unwrap();
        let seq: Vec<_> = c.terms().iter().map(|t| (t.language.as_str(), t.text.as_str())).collect();
        assert_eq!(seq, vec![("fi", "koira"), ("se", "beana"), ("se", "bena")]);
    }

    #[test]
    fn value_equality_ignores_identity_order_and_warnings() {
        let a = Concept::builder("C1")
            .revision(Some("r1".into()))
            .metadata("collection", "Collection:Boazu")
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap()
            .term(form("se", "bena", Status::Unknown))
            .unwrap()
            .build()
            .unwrap();
        let mut flagged = form("se", "bena", Status::Unknown);
        flagged.warnings.push(ValidationWarning {
            concept_id: "C1".into(),
            language: lang("se"),
            text: "bena".into(),
            previous_status: Status::Unknown,
            message: "unknown".into(),
        });
        let b = Concept::builder("other")
            .metadata("collection", "Collection:Boazu")
            .term(flagged)
            .unwrap()
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap()
            .build()
            .unwrap();
        assert!(a.value_eq(&b));

        let c = b.with_term(form("fi", "koira", Status::Unknown)).unwrap();
        assert!(!a.value_eq(&c));
    }

    #[test]
    fn metadata_participates_in_value_equality() {
        let base = Concept::builder("C1")
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap();
        let a = base.clone().build().unwrap();
        let b = base.metadata("definition:se", "elli").build().unwrap();
        assert!(!a.value_eq(&b));
    }

    #[test]
    fn metadata_is_canonical_whatever_the_source_spelling() {
        let legacy = Concept::builder("C1")
            .metadata("collection", "Boazu")
            .metadata("note_se", "n")
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(legacy.metadata()["collection"], "Collection:Boazu");
        assert_eq!(legacy.metadata()["note:se"], "n");

        let canonical = Concept::builder("C1")
            .metadata("collection", "Collection:Boazu")
            .metadata("note:se", "n")
            .term(form("se", "beana", Status::Sanctioned))
            .unwrap()
            .build()
            .unwrap();
        assert!(legacy.value_eq(&canonical));
    }

    #[test]
    fn collection_rejects_duplicate_ids_and_removes_by_id() {
        let c1 = Concept::builder("B")
            .term(form("se", "x", Status::Unknown))
            .unwrap()
            .build()
            .unwrap();
        let c2 = c1.renamed("A").unwrap();
        let mut col = Collection::new();
        col.insert(c1.clone()).unwrap();
        col.insert(c2).unwrap();
        assert_eq!(
            col.insert(c1).unwrap_err(),
            ModelError::DuplicateConcept("B".into())
        );
        let sorted: Vec<_> = col.sorted().iter().map(|c| c.id().to_string()).collect();
        assert_eq!(sorted, vec!["A", "B"]);
        assert!(col.remove("B").is_some());
        assert!(col.get("A").is_some());
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn concept_json_is_validated_on_the_way_in() {
        let ok = r#"{"id":"C1","terms":[{"language":"se","text":" beana ","status":"sanctioned"}],"revision":"7"}"#;
        let c: Concept = serde_json::from_str(ok).unwrap();
        assert_eq!(c.terms()[0].text, "beana");
        assert_eq!(c.revision(), Some("7"));

        let no_terms = r#"{"id":"C1","terms":[]}"#;
        assert!(serde_json::from_str::<Concept>(no_terms).is_err());
        let bad_lang = r#"{"id":"C1","terms":[{"language":"Sami","text":"x"}]}"#;
        assert!(serde_json::from_str::<Concept>(bad_lang).is_err());
    }

    #[test]
    fn concept_json_normalizes_before_uniqueness() {
        let spaced = r#"{"id":"C1","terms":[{"language":"se","text":" beana  x "}]}"#;
        let c: Concept = serde_json::from_str(spaced).unwrap();
        assert_eq!(c.terms()[0].text, "beana x");

        let empty = r#"{"id":"C1","terms":[{"language":"se","text":""}]}"#;
        assert!(serde_json::from_str::<Concept>(empty).is_err());

        let dup = r#"{"id":"C1","terms":[{"language":"se","text":"beana"},{"language":"se","text":" beana "}]}"#;
        assert!(serde_json::from_str::<Concept>(dup).is_err());
    }
}
