use crate::RELATED_PREFIX;
use std::collections::{BTreeMap, BTreeSet};

/// Metadata key holding the `@@`-separated collection list.
pub const COLLECTION_KEY: &str = "collection";

/// Languages recognised in legacy keys such as `definition_se`.
pub const LEGACY_INFO_LANGUAGES: &[&str] = &[
    "se", "sv", "fi", "en", "nb", "nn", "sma", "smj", "smn", "sms", "lat",
];

/// `@@`-separated collection list, each entry namespaced with `Collection:`,
/// sorted and deduplicated.
pub fn canonical_collections<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let set: BTreeSet<String> = values
        .into_iter()
        .flat_map(|v| v.split("@@"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            if c.contains("Collection:") {
                c.to_string()
            } else {
                format!("Collection:{c}")
            }
        })
        .collect();
    set.into_iter().collect::<Vec<_>>().join("@@ ")
}

/// `definition_se` becomes `definition:se`; every other key is kept.
pub fn canonical_key(key: &str) -> String {
    let key = key.trim();
    if key.starts_with(RELATED_PREFIX) {
        return key.to_string();
    }
    match key.rsplit_once('_') {
        Some((field, lang)) if !field.is_empty() && LEGACY_INFO_LANGUAGES.contains(&lang) => {
            format!("{field}:{lang}")
        }
        _ => key.to_string(),
    }
}

/// Rewrite a metadata map into the one spelling every source agrees on.
/// Keys that collide after rewriting keep the value of the canonical spelling.
pub fn canonical_metadata(metadata: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut legacy = Vec::new();
    for (key, value) in metadata {
        let canon = canonical_key(&key);
        if canon == key {
            out.insert(key, value);
        } else {
            legacy.push((canon, value));
        }
    }
    for (key, value) in legacy {
        out.entry(key).or_insert(value);
    }
    if let Some(raw) = out.remove(COLLECTION_KEY) {
        let joined = canonical_collections([raw.as_str()]);
        if !joined.is_empty() {
            out.insert(COLLECTION_KEY.to_string(), joined);
        }
    }
    out
}
