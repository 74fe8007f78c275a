use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// A per-record message collected during a run. `kind` is one of
/// `parse`, `validation`, `unsupported`, `plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationMsg {
    pub schema_version: u32,
    pub kind: String,
    pub record: String,
    pub language: Option<String>,
    pub text: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl ValidationMsg {
    pub fn new(kind: &str, record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            kind: kind.to_string(),
            record: record.into(),
            language: None,
            text: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn with_form(mut self, language: &str, text: &str) -> Self {
        self.language = Some(language.to_string());
        self.text = Some(text.to_string());
        self
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }
}

/// Operation counts of a reconciliation plan before it is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub noops: usize,
    pub unsupported_languages: Vec<String>,
}

impl PlanSummary {
    pub fn writes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OperationLine {
    pub index: usize,
    pub id: String,
    pub kind: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// Final report of an import, export, bot-update or move run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub schema_version: u32,
    pub mode: String,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
    pub conflicted: Vec<String>,
    pub failed: Vec<String>,
    pub operations: Vec<OperationLine>,
    pub warnings: Vec<ValidationMsg>,
    pub plan: Option<PlanSummary>,
    /// Index of the first operation that was not attempted, when cancelled.
    pub resume_from: Option<usize>,
}

impl RunReport {
    pub fn new(mode: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            mode: mode.to_string(),
            ..Self::default()
        }
    }

    /// Conflicts and failures make a run unsuccessful; warnings do not.
    pub fn is_success(&self) -> bool {
        self.conflicted.is_empty() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_ignores_warnings_but_not_conflicts() {
        let mut r = RunReport::new("import");
        r.warnings
            .push(ValidationMsg::new("validation", "C1", "unknown form").with_form("se", "x"));
        r.created.push("C1".into());
        assert!(r.is_success());
        r.conflicted.push("C2".into());
        assert!(!r.is_success());
    }

    #[test]
    fn report_json_carries_schema_version() {
        let r = RunReport::new("export");
        let v: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(v["schema_version"], SCHEMA_VERSION);
        assert_eq!(v["mode"], "export");
        assert!(v["resume_from"].is_null());
    }
}
