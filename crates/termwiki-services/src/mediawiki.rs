use crate::transport::{ListFilter, RemotePage, TransportError, WikiTransport};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("termwiki/", env!("CARGO_PKG_VERSION"));
/// Seconds of replication lag the bot tolerates before the server asks it to wait.
const MAXLAG: &str = "5";

/// MediaWiki Action API client.
///
/// Logs in once at construction (bot password) and keeps the session cookie
/// and CSRF token for the lifetime of the transport.
pub struct MediaWikiTransport {
    client: Client,
    api_url: String,
    csrf: String,
    namespaces: HashMap<String, i64>,
}

impl MediaWikiTransport {
    pub fn connect(
        api_url: &str,
        credentials: Option<(&str, &str)>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Fatal(e.to_string()))?;
        let mut t = Self {
            client,
            api_url: api_url.to_string(),
            csrf: "+\\".to_string(),
            namespaces: HashMap::new(),
        };
        if let Some((user, password)) = credentials {
            t.login(user, password)?;
            t.csrf = t.token("csrf")?;
        }
        t.namespaces = t.load_namespaces()?;
        tracing::info!(event = "wiki_connected", api = %t.api_url, logged_in = credentials.is_some());
        Ok(t)
    }

    fn login(&self, user: &str, password: &str) -> Result<(), TransportError> {
        let token = self.token("login")?;
        let v = self.post(&[
            ("action", "login"),
            ("lgname", user),
            ("lgpassword", password),
            ("lgtoken", token.as_str()),
        ])?;
        match v.pointer("/login/result").and_then(Value::as_str) {
            Some("Success") => Ok(()),
            other => Err(TransportError::Fatal(format!(
                "login as `{user}` failed: {}",
                other.unwrap_or("no result")
            ))),
        }
    }

    fn token(&self, kind: &str) -> Result<String, TransportError> {
        let v = self.get(&[("action", "query"), ("meta", "tokens"), ("type", kind)])?;
        v.pointer(&format!("/query/tokens/{kind}token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TransportError::Fatal(format!("no {kind} token in response")))
    }

    fn load_namespaces(&self) -> Result<HashMap<String, i64>, TransportError> {
        let v = self.get(&[
            ("action", "query"),
            ("meta", "siteinfo"),
            ("siprop", "namespaces"),
        ])?;
        let mut out = HashMap::new();
        if let Some(map) = v.pointer("/query/namespaces").and_then(Value::as_object) {
            for ns in map.values() {
                let Some(id) = ns.get("id").and_then(Value::as_i64) else {
                    continue;
                };
                for key in ["name", "canonical"] {
                    if let Some(name) = ns.get(key).and_then(Value::as_str) {
                        out.insert(name.to_string(), id);
                    }
                }
            }
        }
        Ok(out)
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<Value, TransportError> {
        let res = self
            .client
            .get(&self.api_url)
            .query(&common())
            .query(params)
            .send()
            .map_err(request_err)?;
        decode(res)
    }

    fn post(&self, params: &[(&str, &str)]) -> Result<Value, TransportError> {
        let mut form: Vec<(&str, &str)> = common().to_vec();
        form.extend_from_slice(params);
        let res = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .map_err(request_err)?;
        decode(res)
    }

    /// Follow `continue` blocks until the listing is exhausted.
    fn list_all(&self, params: &[(&str, &str)], list: &str) -> Result<Vec<String>, TransportError> {
        let mut out = Vec::new();
        let mut cont: Vec<(String, String)> = Vec::new();
        loop {
            let mut p: Vec<(&str, &str)> = params.to_vec();
            p.extend(cont.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let v = self.get(&p)?;
            if let Some(items) = v.pointer(&format!("/query/{list}")).and_then(Value::as_array) {
                out.extend(
                    items
                        .iter()
                        .filter_map(|i| i.get("title").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }
            let Some(next) = v.get("continue").and_then(Value::as_object) else {
                break;
            };
            cont = next
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
        }
        Ok(out)
    }
}

fn common() -> [(&'static str, &'static str); 3] {
    [("format", "json"), ("formatversion", "2"), ("maxlag", MAXLAG)]
}

fn request_err(e: reqwest::Error) -> TransportError {
    if e.is_timeout() || e.is_connect() {
        TransportError::Transient(e.to_string())
    } else {
        TransportError::Fatal(e.to_string())
    }
}

fn decode(res: Response) -> Result<Value, TransportError> {
    let status = res.status();
    if status.is_server_error() || status.as_u16() == 429 {
        return Err(TransportError::Transient(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(TransportError::Fatal(format!("HTTP {status}")));
    }
    let v: Value = res.json().map_err(|e| TransportError::Fatal(e.to_string()))?;
    if let Some(err) = v.get("error") {
        let code = err.get("code").and_then(Value::as_str).unwrap_or("unknown");
        let info = err.get("info").and_then(Value::as_str).unwrap_or("");
        return Err(api_error(code, info));
    }
    Ok(v)
}

/// Map API error codes. Conflicts are filled in by the caller, which knows the
/// page and the revision it expected.
fn api_error(code: &str, info: &str) -> TransportError {
    match code {
        "maxlag" | "ratelimited" | "readonly" | "internal_api_error_DBQueryError" => {
            TransportError::Transient(format!("{code}: {info}"))
        }
        "editconflict" | "articleexists" | "missingtitle" | "pagedeleted" => TransportError::Conflict {
            id: String::new(),
            expected: None,
            found: None,
        },
        _ => TransportError::Fatal(format!("{code}: {info}")),
    }
}

fn with_page(e: TransportError, id: &str, expected: Option<&str>) -> TransportError {
    match e {
        TransportError::Conflict { found, .. } => TransportError::Conflict {
            id: id.to_string(),
            expected: expected.map(str::to_string),
            found,
        },
        other => other,
    }
}

impl WikiTransport for MediaWikiTransport {
    fn fetch_concept(&self, id: &str) -> Result<Option<RemotePage>, TransportError> {
        let v = self.get(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("titles", id),
            ("rvprop", "ids|content"),
            ("rvslots", "main"),
        ])?;
        let Some(page) = v.pointer("/query/pages/0") else {
            return Ok(None);
        };
        if page.get("missing").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        let Some(rev) = page.pointer("/revisions/0") else {
            return Ok(None);
        };
        let revision = rev
            .get("revid")
            .and_then(Value::as_i64)
            .map(|r| r.to_string())
            .ok_or_else(|| TransportError::Fatal(format!("no revision id for `{id}`")))?;
        let raw = rev
            .pointer("/slots/main/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Some(RemotePage { raw, revision }))
    }

    fn save_page(
        &self,
        id: &str,
        raw: &str,
        expected_revision: Option<&str>,
        summary: &str,
    ) -> Result<String, TransportError> {
        let mut params: Vec<(&str, &str)> = vec![
            ("action", "edit"),
            ("title", id),
            ("text", raw),
            ("summary", summary),
            ("bot", "1"),
            ("token", self.csrf.as_str()),
        ];
        match expected_revision {
            Some(rev) => {
                params.push(("baserevid", rev));
                params.push(("nocreate", "1"));
            }
            None => params.push(("createonly", "1")),
        }
        let v = self
            .post(&params)
            .map_err(|e| with_page(e, id, expected_revision))?;
        let edit = v
            .get("edit")
            .ok_or_else(|| TransportError::Fatal(format!("no edit result for `{id}`")))?;
        if edit.get("result").and_then(Value::as_str) != Some("Success") {
            return Err(TransportError::Fatal(format!("edit of `{id}` failed: {edit}")));
        }
        if let Some(rev) = edit.get("newrevid").and_then(Value::as_i64) {
            return Ok(rev.to_string());
        }
        // `nochange`: the page already had this text
        Ok(expected_revision.unwrap_or_default().to_string())
    }

    fn delete_page(
        &self,
        id: &str,
        expected_revision: Option<&str>,
        reason: &str,
    ) -> Result<(), TransportError> {
        self.post(&[
            ("action", "delete"),
            ("title", id),
            ("reason", reason),
            ("token", self.csrf.as_str()),
        ])
        .map_err(|e| with_page(e, id, expected_revision))?;
        Ok(())
    }

    fn list_concept_ids(&self, filter: &ListFilter) -> Result<Vec<String>, TransportError> {
        let mut ids = if let Some(category) = &filter.category {
            let title = if category.starts_with("Category:") {
                category.clone()
            } else {
                format!("Category:{category}")
            };
            self.list_all(
                &[
                    ("action", "query"),
                    ("list", "categorymembers"),
                    ("cmtitle", title.as_str()),
                    ("cmlimit", "max"),
                ],
                "categorymembers",
            )?
        } else if let Some(prefix) = &filter.prefix {
            let (ns, rest) = match prefix.split_once(':') {
                Some((ns, rest)) if self.namespaces.contains_key(ns) => (self.namespaces[ns], rest),
                _ => (0, prefix.as_str()),
            };
            let ns = ns.to_string();
            self.list_all(
                &[
                    ("action", "query"),
                    ("list", "allpages"),
                    ("apnamespace", ns.as_str()),
                    ("apprefix", rest),
                    ("aplimit", "max"),
                ],
                "allpages",
            )?
        } else {
            return Err(TransportError::Fatal(
                "listing concepts needs a prefix or a category".into(),
            ));
        };
        if let Some(prefix) = &filter.prefix {
            ids.retain(|id| id.starts_with(prefix.as_str()));
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_codes_are_classified() {
        assert!(api_error("maxlag", "Waiting for db").is_transient());
        assert!(matches!(api_error("editconflict", ""), TransportError::Conflict { .. }));
        assert!(matches!(api_error("permissiondenied", ""), TransportError::Fatal(_)));
    }

    #[test]
    fn conflicts_get_page_context() {
        let e = with_page(api_error("editconflict", ""), "X:a", Some("12"));
        let TransportError::Conflict { id, expected, .. } = e else {
            panic!("not a conflict");
        };
        assert_eq!(id, "X:a");
        assert_eq!(expected.as_deref(), Some("12"));
    }
}
