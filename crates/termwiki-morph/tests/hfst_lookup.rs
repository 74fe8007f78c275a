#![cfg(unix)]

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use termwiki_core::LanguageCode;
use termwiki_morph::{AnalyzerCache, HfstLoader, Validator, Verdict};

/// A stand-in for `hfst-lookup`: knows `beana` and `boazu`, answers `+?` for
/// the rest, and appends a line to `runs.log` each time it starts.
fn fake_lookup(dir: &Path) -> std::path::PathBuf {
    let bin = dir.join("fake-hfst-lookup");
    let log = dir.join("runs.log");
    let script = format!(
        "#!/bin/sh\necho run >> '{}'\nwhile read w; do\n  case \"$w\" in\n    beana|boazu) printf '%s\\t%s+N+Sg+Nom\\t0,000000\\n\\n' \"$w\" \"$w\" ;;\n    *) printf '%s\\t%s+?\\tinf\\n\\n' \"$w\" \"$w\" ;;\n  esac\ndone\n",
        log.display()
    );
    std::fs::write(&bin, script).unwrap();
    let mut perms = std::fs::metadata(&bin).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&bin, perms).unwrap();
    bin
}

#[test]
fn hfst_loader_runs_lookup_binary_for_mapped_language() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = fake_lookup(tmp.path());
    let fst_dir = tmp.path().join("giella").join("sme");
    std::fs::create_dir_all(&fst_dir).unwrap();
    std::fs::write(fst_dir.join("analyser-gt-norm.hfstol"), b"").unwrap();

    let map: BTreeMap<String, String> = [("se".to_string(), "sme".to_string())].into_iter().collect();
    let mut loader = HfstLoader::new(tmp.path().join("giella"), map);
    loader.lookup_bin = bin;
    let cache = AnalyzerCache::new(loader);
    let validator = Validator::new(&cache);

    let se = LanguageCode::new("se").unwrap();
    assert!(matches!(validator.validate(&se, "beana"), Verdict::Valid { .. }));
    assert!(validator.validate(&se, "bena").is_invalid());
    // no fst installed for fi
    let fi = LanguageCode::new("fi").unwrap();
    assert_eq!(validator.validate(&fi, "koira"), Verdict::Unsupported);
    assert_eq!(cache.loaded(), vec![(fi, false), (se, true)]);
}

#[test]
fn validate_all_starts_one_lookup_per_language() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = fake_lookup(tmp.path());
    let fst_dir = tmp.path().join("giella").join("se");
    std::fs::create_dir_all(&fst_dir).unwrap();
    std::fs::write(fst_dir.join("analyser-gt-norm.hfstol"), b"").unwrap();

    let mut loader = HfstLoader::new(tmp.path().join("giella"), BTreeMap::new());
    loader.lookup_bin = bin;
    let cache = AnalyzerCache::new(loader);
    let validator = Validator::new(&cache).with_workers(2);

    let se = LanguageCode::new("se").unwrap();
    let items: Vec<_> = ["beana", "boazu beana", "bena", "boazu"]
        .iter()
        .map(|t| (se.clone(), t.to_string()))
        .collect();
    let out = validator.validate_all(&items);
    assert!(matches!(out[0], Verdict::Valid { .. }));
    assert!(matches!(out[1], Verdict::Valid { .. }));
    assert!(out[2].is_invalid());
    assert!(matches!(out[3], Verdict::Valid { .. }));

    let runs = std::fs::read_to_string(tmp.path().join("runs.log")).unwrap();
    assert_eq!(runs.lines().count(), 1);
}
