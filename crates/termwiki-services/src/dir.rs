use crate::transport::{ListFilter, RemotePage, TransportError, WikiTransport};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A wiki kept as files: `<dir>/<id>.wiki` with the page text and
/// `<dir>/<id>.rev` with an integer revision bumped on every save.
///
/// Used for offline work and as the wiki in tests.
#[derive(Debug, Clone)]
pub struct DirTransport {
    root: PathBuf,
}

impl DirTransport {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, id: &str) -> (PathBuf, PathBuf) {
        let stem = escape(id);
        (
            self.root.join(format!("{stem}.wiki")),
            self.root.join(format!("{stem}.rev")),
        )
    }

    fn check(
        &self,
        id: &str,
        expected: Option<&str>,
    ) -> Result<Option<RemotePage>, TransportError> {
        let current = self.fetch_concept(id)?;
        let found = current.as_ref().map(|p| p.revision.as_str());
        if found != expected {
            return Err(TransportError::Conflict {
                id: id.to_string(),
                expected: expected.map(str::to_string),
                found: found.map(str::to_string),
            });
        }
        Ok(current)
    }
}

fn io_err(e: std::io::Error) -> TransportError {
    TransportError::Fatal(e.to_string())
}

impl WikiTransport for DirTransport {
    fn fetch_concept(&self, id: &str) -> Result<Option<RemotePage>, TransportError> {
        let (wiki, rev) = self.paths(id);
        let raw = match std::fs::read_to_string(&wiki) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(e)),
        };
        let revision = std::fs::read_to_string(&rev)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "1".to_string());
        Ok(Some(RemotePage { raw, revision }))
    }

    fn save_page(
        &self,
        id: &str,
        raw: &str,
        expected_revision: Option<&str>,
        _summary: &str,
    ) -> Result<String, TransportError> {
        let current = self.check(id, expected_revision)?;
        let next = match current {
            Some(p) => p.revision.parse::<u64>().unwrap_or(0) + 1,
            None => 1,
        }
        .to_string();
        let (wiki, rev) = self.paths(id);
        std::fs::write(&wiki, raw).map_err(io_err)?;
        std::fs::write(&rev, &next).map_err(io_err)?;
        tracing::debug!(event = "dir_saved", id, revision = %next);
        Ok(next)
    }

    fn delete_page(
        &self,
        id: &str,
        expected_revision: Option<&str>,
        _reason: &str,
    ) -> Result<(), TransportError> {
        if self.check(id, expected_revision)?.is_none() {
            return Err(TransportError::NotFound(id.to_string()));
        }
        let (wiki, rev) = self.paths(id);
        std::fs::remove_file(&wiki).map_err(io_err)?;
        if rev.exists() {
            std::fs::remove_file(&rev).map_err(io_err)?;
        }
        Ok(())
    }

    fn list_concept_ids(&self, filter: &ListFilter) -> Result<Vec<String>, TransportError> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().map(|e| e != "wiki").unwrap_or(true) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = unescape(stem);
            if let Some(prefix) = &filter.prefix {
                if !id.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(category) = &filter.category {
                let text = std::fs::read_to_string(path).map_err(io_err)?;
                if !text.contains(category.as_str()) {
                    continue;
                }
            }
            ids.push(id);
        }
        ids.sort();
        Ok(ids)
    }
}

const RESERVED: &[char] = &['%', '/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Concept ids contain `:` and sometimes `/`; keep file names portable.
fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if RESERVED.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut rest = stem;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 1..pos + 3);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(b) => {
                out.push(b as char);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
