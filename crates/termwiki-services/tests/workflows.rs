use std::cell::Cell;
use std::path::Path;
use std::time::Duration;
use termwiki_morph::{AnalyzerCache, LexiconLoader, Validator};
use termwiki_services::bot_update::bot_update;
use termwiki_services::export::{export_sheet, ExportOptions};
use termwiki_services::import::{import_sheet, ImportOptions};
use termwiki_services::moves::move_concept;
use termwiki_services::{
    CancelToken, DirTransport, ListFilter, RemotePage, RetryConfig, Session, TransportError,
    WikiTransport,
};

const SHEET: &str = "concept_id,language,text,status,collection\n\
                     Boazu:beana,se,beana,sanctioned,Collection:Boazu\n\
                     Boazu:beana,fi,koira,unsanctioned,\n\
                     Boazu:boazu,se,boazu,sanctioned,\n\
                     Boazu:boazu,nb,rein,sanctioned,\n";

fn quick() -> RetryConfig {
    RetryConfig::new(3, Duration::ZERO)
}

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, body).unwrap();
    p
}

#[test]
fn import_creates_then_reimport_is_all_noops() {
    let tmp = tempfile::tempdir().unwrap();
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let session = Session::new(&wiki).with_retry(quick());

    let first = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
    assert_eq!(first.created, vec!["Boazu:beana", "Boazu:boazu"]);
    assert!(first.is_success());
    let page = wiki.fetch_concept("Boazu:beana").unwrap().unwrap();
    assert!(page.raw.contains("|expression=koira"));
    assert!(page.raw.contains("Collection:Boazu"));

    let second = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
    assert!(second.created.is_empty() && second.updated.is_empty());
    assert_eq!(second.skipped.len(), 2);
    assert_eq!(wiki.fetch_concept("Boazu:beana").unwrap().unwrap().revision, "1");
}

#[test]
fn unprefixed_collections_and_legacy_keys_reimport_as_noops() {
    let tmp = tempfile::tempdir().unwrap();
    let sheet = write(
        tmp.path(),
        "terms.csv",
        "concept_id,language,text,status,collection,note_se\n\
         X:a,se,beana,sanctioned,Boazu,n\n",
    );
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let session = Session::new(&wiki).with_retry(quick());

    let first = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
    assert_eq!(first.created, vec!["X:a"]);
    let raw = wiki.fetch_concept("X:a").unwrap().unwrap().raw;
    assert!(raw.contains("|collection=Collection:Boazu"), "{raw}");
    assert!(raw.contains("|note=n"), "{raw}");

    for _ in 0..2 {
        let again = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
        assert!(again.updated.is_empty(), "{:?}", again.updated);
        assert_eq!(again.skipped, vec!["X:a"]);
    }
    assert_eq!(wiki.fetch_concept("X:a").unwrap().unwrap().revision, "1");
}

#[test]
fn unknown_forms_reach_the_wiki_unsanctioned() {
    let tmp = tempfile::tempdir().unwrap();
    let lex = tmp.path().join("lexicons");
    std::fs::create_dir_all(&lex).unwrap();
    write(&lex, "se.tsv", "beana\tbeana\tN+Sg+Nom\n");
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let session = Session::new(&wiki).with_retry(quick());
    let cache = AnalyzerCache::new(LexiconLoader::new(&lex));
    let validator = Validator::new(&cache);

    let run = import_sheet(&session, &sheet, Some(&validator), &ImportOptions::default()).unwrap();
    assert!(run.is_success());
    let validation: Vec<_> = run.warnings.iter().filter(|w| w.kind == "validation").collect();
    assert_eq!(validation.len(), 1);
    assert_eq!(validation[0].text.as_deref(), Some("boazu"));
    assert!(run.warnings.iter().any(|w| w.kind == "unsupported" && w.record == "fi"));

    let raw = wiki.fetch_concept("Boazu:boazu").unwrap().unwrap().raw;
    assert!(raw.contains("|expression=boazu\n|sanctioned=No"), "{raw}");
    assert!(raw.contains("|is_typo=Yes"));
}

#[test]
fn stale_plan_conflicts_and_leaves_the_page_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let session = Session::new(&wiki).with_retry(quick());
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();

    let changed = write(
        tmp.path(),
        "changed.csv",
        "concept_id,language,text,status\nBoazu:beana,se,beatnagat,sanctioned\n",
    );
    let plan_path = tmp.path().join("plan.json");
    let opts = ImportOptions {
        dry_run: true,
        plan_out: Some(plan_path.clone()),
        ..ImportOptions::default()
    };
    import_sheet(&session, &changed, None, &opts).unwrap();

    // someone edits the page between planning and applying
    let current = wiki.fetch_concept("Boazu:beana").unwrap().unwrap();
    wiki.save_page("Boazu:beana", &current.raw, Some("1"), "manual").unwrap();
    let edited = wiki.fetch_concept("Boazu:beana").unwrap().unwrap();

    let run = bot_update(&session, &plan_path, 0).unwrap();
    assert_eq!(run.conflicted, vec!["Boazu:beana"]);
    assert!(!run.is_success());
    assert_eq!(wiki.fetch_concept("Boazu:beana").unwrap().unwrap(), edited);
}

struct Flaky {
    inner: DirTransport,
    failures_left: Cell<u32>,
}

impl WikiTransport for Flaky {
    fn fetch_concept(&self, id: &str) -> Result<Option<RemotePage>, TransportError> {
        self.inner.fetch_concept(id)
    }

    fn save_page(
        &self,
        id: &str,
        raw: &str,
        expected: Option<&str>,
        summary: &str,
    ) -> Result<String, TransportError> {
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(TransportError::Transient("503 Service Unavailable".into()));
        }
        self.inner.save_page(id, raw, expected, summary)
    }

    fn delete_page(&self, id: &str, expected: Option<&str>, reason: &str) -> Result<(), TransportError> {
        self.inner.delete_page(id, expected, reason)
    }

    fn list_concept_ids(&self, filter: &ListFilter) -> Result<Vec<String>, TransportError> {
        self.inner.list_concept_ids(filter)
    }
}

#[test]
fn transient_failures_are_retried_then_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    let flaky = Flaky {
        inner: DirTransport::new(tmp.path().join("wiki")).unwrap(),
        failures_left: Cell::new(2),
    };
    let session = Session::new(&flaky).with_retry(quick());
    let run = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
    assert_eq!(run.created.len(), 2, "{:?}", run.operations);

    let down = Flaky {
        inner: DirTransport::new(tmp.path().join("other")).unwrap(),
        failures_left: Cell::new(u32::MAX),
    };
    let session = Session::new(&down).with_retry(quick());
    let run = import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();
    // the first failure does not stop the second operation
    assert_eq!(run.failed, vec!["Boazu:beana", "Boazu:boazu"]);
    assert!(run.operations[0]
        .detail
        .as_deref()
        .unwrap()
        .contains("after 3 attempts"));
}

struct CancelAfterFirstSave {
    inner: DirTransport,
    token: CancelToken,
}

impl WikiTransport for CancelAfterFirstSave {
    fn fetch_concept(&self, id: &str) -> Result<Option<RemotePage>, TransportError> {
        self.inner.fetch_concept(id)
    }

    fn save_page(
        &self,
        id: &str,
        raw: &str,
        expected: Option<&str>,
        summary: &str,
    ) -> Result<String, TransportError> {
        let rev = self.inner.save_page(id, raw, expected, summary)?;
        self.token.cancel();
        Ok(rev)
    }

    fn delete_page(&self, id: &str, expected: Option<&str>, reason: &str) -> Result<(), TransportError> {
        self.inner.delete_page(id, expected, reason)
    }

    fn list_concept_ids(&self, filter: &ListFilter) -> Result<Vec<String>, TransportError> {
        self.inner.list_concept_ids(filter)
    }
}

#[test]
fn cancelled_run_resumes_from_first_unapplied_operation() {
    let tmp = tempfile::tempdir().unwrap();
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    let plan_path = tmp.path().join("plan.json");
    let token = CancelToken::new();
    let t = CancelAfterFirstSave {
        inner: DirTransport::new(tmp.path().join("wiki")).unwrap(),
        token: token.clone(),
    };
    let mut session = Session::new(&t).with_retry(quick());
    session.cancel = token;
    let opts = ImportOptions {
        plan_out: Some(plan_path.clone()),
        ..ImportOptions::default()
    };
    let run = import_sheet(&session, &sheet, None, &opts).unwrap();
    assert_eq!(run.created, vec!["Boazu:beana"]);
    assert_eq!(run.resume_from, Some(1));

    let plain = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let resumed = bot_update(&Session::new(&plain).with_retry(quick()), &plan_path, 1).unwrap();
    assert_eq!(resumed.created, vec!["Boazu:boazu"]);
    assert!(resumed.resume_from.is_none());
    assert!(plain.fetch_concept("Boazu:beana").unwrap().is_some());
}

#[test]
fn export_writes_and_merges_into_existing_sheet() {
    let tmp = tempfile::tempdir().unwrap();
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    let session = Session::new(&wiki).with_retry(quick());
    let sheet = write(tmp.path(), "terms.csv", SHEET);
    import_sheet(&session, &sheet, None, &ImportOptions::default()).unwrap();

    let out = tmp.path().join("out.csv");
    let opts = ExportOptions {
        filter: ListFilter {
            prefix: Some("Boazu:".into()),
            category: None,
        },
        ..ExportOptions::default()
    };
    let run = export_sheet(Some(&session), &out, &opts).unwrap();
    assert_eq!(run.created.len(), 2);
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("concept_id,language,text,status,source,collection\n"));
    assert!(text.contains("Boazu:beana,fi,koira,unsanctioned,,Collection:Boazu"));

    let existing = write(
        tmp.path(),
        "existing.csv",
        "concept_id,language,text,status\n\
         Boazu:beana,sv,hund,sanctioned\n\
         Other:x,se,x,unknown\n",
    );
    let merged_out = tmp.path().join("merged.csv");
    let opts = ExportOptions {
        into: Some(existing),
        ..opts
    };
    let run = export_sheet(Some(&session), &merged_out, &opts).unwrap();
    assert_eq!(run.updated, vec!["Boazu:beana"]);
    assert_eq!(run.created, vec!["Boazu:boazu"]);
    let text = std::fs::read_to_string(&merged_out).unwrap();
    assert!(text.contains("Boazu:beana,sv,hund,sanctioned"));
    assert!(text.contains("Boazu:beana,se,beana,sanctioned"));
    assert!(text.contains("Other:x,se,x,unknown"));
}

#[test]
fn move_renames_and_relinks() {
    let tmp = tempfile::tempdir().unwrap();
    let wiki = DirTransport::new(tmp.path().join("wiki")).unwrap();
    wiki.save_page(
        "Boazu:bena",
        "{{Related expression\n|language=se\n|expression=beana\n|sanctioned=Yes\n}}\n{{Concept}}\n",
        None,
        "",
    )
    .unwrap();
    wiki.save_page(
        "Boazu:gáica",
        "{{Related expression\n|language=se\n|expression=gáica\n|sanctioned=Yes\n}}\n\
         {{Related concept\n|concept=Boazu:bena\n|relation=cohyponym\n}}\n{{Concept}}\n",
        None,
        "",
    )
    .unwrap();
    let session = Session::new(&wiki).with_retry(quick());

    let dry = move_concept(&session, "Boazu:bena", "Boazu:beana", false, true).unwrap();
    assert_eq!(dry.plan.as_ref().unwrap().writes(), 3);
    assert!(wiki.fetch_concept("Boazu:beana").unwrap().is_none());

    let run = move_concept(&session, "Boazu:bena", "Boazu:beana", false, false).unwrap();
    assert!(run.is_success(), "{:?}", run.operations);
    assert_eq!(run.created, vec!["Boazu:beana"]);
    assert_eq!(run.updated, vec!["Boazu:gáica"]);
    assert_eq!(run.deleted, vec!["Boazu:bena"]);
    assert!(wiki.fetch_concept("Boazu:bena").unwrap().is_none());
    let linked = wiki.fetch_concept("Boazu:gáica").unwrap().unwrap().raw;
    assert!(linked.contains("|concept=Boazu:beana"));

    let err = move_concept(&session, "Boazu:gáica", "Boazu:beana", false, false).unwrap_err();
    assert!(err.to_string().contains("already exists"));
}
