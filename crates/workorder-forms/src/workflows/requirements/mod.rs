//! Job-scope driven document requirements for LKS/LKH submissions.
//!
//! The matrix maps each job scope label to the supporting documents a contractor has to attach.
//! A submission may select several scopes; the effective requirement list is the union of the
//! selected scopes in matrix order.

mod standard;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Category of work that determines which supporting documents are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct JobScope(String);

impl JobScope {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobScope {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for JobScope {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<JobScope> for String {
    fn from(value: JobScope) -> Self {
        value.0
    }
}

impl fmt::Display for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supporting document a job scope asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub id: String,
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Requirement list configured for one job scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequirements {
    pub scope: JobScope,
    pub documents: Vec<DocumentRequirement>,
}

#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("unable to read requirement matrix {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("requirement matrix is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("requirement matrix contains an empty job scope label")]
    EmptyScope,
    #[error("job scope '{0}' is declared more than once")]
    DuplicateScope(String),
    #[error("document '{id}' is listed twice under job scope '{scope}'")]
    DuplicateDocument { scope: String, id: String },
}

/// Static job scope -> document requirement table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementMatrix {
    scopes: Vec<ScopeRequirements>,
}

impl RequirementMatrix {
    /// Table used by the field teams when no override is configured.
    pub fn standard() -> Self {
        Self {
            scopes: standard::standard_scope_requirements(),
        }
    }

    pub fn new(scopes: Vec<ScopeRequirements>) -> Result<Self, MatrixError> {
        let mut seen_scopes = BTreeSet::new();
        for entry in &scopes {
            if entry.scope.label().is_empty() {
                return Err(MatrixError::EmptyScope);
            }
            if !seen_scopes.insert(entry.scope.clone()) {
                return Err(MatrixError::DuplicateScope(entry.scope.to_string()));
            }

            let mut seen_documents = BTreeSet::new();
            for document in &entry.documents {
                if !seen_documents.insert(document.id.as_str()) {
                    return Err(MatrixError::DuplicateDocument {
                        scope: entry.scope.to_string(),
                        id: document.id.clone(),
                    });
                }
            }
        }

        Ok(Self { scopes })
    }

    pub fn from_json(raw: &str) -> Result<Self, MatrixError> {
        let scopes: Vec<ScopeRequirements> = serde_json::from_str(raw)?;
        Self::new(scopes)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatrixError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| MatrixError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &JobScope> {
        self.scopes.iter().map(|entry| &entry.scope)
    }

    pub fn entries(&self) -> &[ScopeRequirements] {
        &self.scopes
    }

    /// Union of the requirement lists of every selected scope, de-duplicated by id.
    ///
    /// Ordering follows the matrix, so the caller's scope order never changes the result.
    /// Unknown scope labels contribute nothing.
    pub fn required_documents<'a, I>(&self, scopes: I) -> Vec<&DocumentRequirement>
    where
        I: IntoIterator<Item = &'a JobScope>,
    {
        let selected: BTreeSet<&JobScope> = scopes.into_iter().collect();
        let mut seen = BTreeSet::new();

        self.scopes
            .iter()
            .filter(|entry| selected.contains(&entry.scope))
            .flat_map(|entry| entry.documents.iter())
            .filter(|document| seen.insert(document.id.as_str()))
            .collect()
    }

    /// Look up a document slot within the selected scopes.
    pub fn document_for<'a, I>(&self, scopes: I, id: &str) -> Option<&DocumentRequirement>
    where
        I: IntoIterator<Item = &'a JobScope>,
    {
        self.required_documents(scopes)
            .into_iter()
            .find(|document| document.id == id)
    }

    /// First declaration of a document id anywhere in the table.
    pub fn find_document(&self, id: &str) -> Option<&DocumentRequirement> {
        self.scopes
            .iter()
            .flat_map(|entry| entry.documents.iter())
            .find(|document| document.id == id)
    }
}

impl Default for RequirementMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(labels: &[&str]) -> Vec<JobScope> {
        labels.iter().map(|label| JobScope::new(label)).collect()
    }

    fn ids(documents: Vec<&DocumentRequirement>) -> Vec<&str> {
        documents
            .into_iter()
            .map(|document| document.id.as_str())
            .collect()
    }

    #[test]
    fn pencawang_requires_single_line_diagram() {
        let matrix = RequirementMatrix::standard();
        let documents = matrix.required_documents(&scopes(&["Pencawang"]));

        let required: Vec<&str> = documents
            .iter()
            .filter(|document| document.required)
            .map(|document| document.id.as_str())
            .collect();
        assert_eq!(required, vec!["single-line-diagram"]);
    }

    #[test]
    fn union_deduplicates_shared_documents() {
        let matrix = RequirementMatrix::standard();
        let documents = ids(matrix.required_documents(&scopes(&["Civil", "HDD"])));

        let as_built = documents
            .iter()
            .filter(|id| **id == "as-built-drawing")
            .count();
        assert_eq!(as_built, 1);
    }

    #[test]
    fn result_follows_matrix_order_not_caller_order() {
        let matrix = RequirementMatrix::standard();
        let forward = ids(matrix.required_documents(&scopes(&["Pencawang", "HDD"])));
        let reverse = ids(matrix.required_documents(&scopes(&["HDD", "Pencawang"])));
        assert_eq!(forward, reverse);
        assert_eq!(forward.first(), Some(&"single-line-diagram"));
    }

    #[test]
    fn union_is_monotonic_over_scope_subsets() {
        let matrix = RequirementMatrix::standard();
        let all: Vec<JobScope> = matrix.scopes().cloned().collect();

        for split in 0..=all.len() {
            let subset = ids(matrix.required_documents(&all[..split]));
            let superset = ids(matrix.required_documents(&all));
            assert!(
                subset.iter().all(|id| superset.contains(id)),
                "documents of {:?} must be contained in the full union",
                &all[..split]
            );
        }
    }

    #[test]
    fn unknown_scopes_contribute_nothing() {
        let matrix = RequirementMatrix::standard();
        assert!(matrix
            .required_documents(&scopes(&["Landscaping"]))
            .is_empty());
        assert_eq!(
            ids(matrix.required_documents(&scopes(&["Landscaping", "Pencawang"]))),
            ids(matrix.required_documents(&scopes(&["Pencawang"])))
        );
    }

    #[test]
    fn scope_labels_are_trimmed() {
        let matrix = RequirementMatrix::standard();
        assert_eq!(
            ids(matrix.required_documents(&scopes(&["  Pencawang "]))),
            ids(matrix.required_documents(&scopes(&["Pencawang"])))
        );
    }

    #[test]
    fn loads_json_tables() {
        let matrix = RequirementMatrix::from_json(
            r#"[
                {"scope": "Pencawang", "documents": [
                    {"id": "single-line-diagram", "name": "Single Line Diagram", "required": true}
                ]},
                {"scope": "Civil", "documents": [
                    {"id": "civil-drawing", "name": "Civil Drawing", "required": true,
                     "description": "Signed by the resident engineer"}
                ]}
            ]"#,
        )
        .expect("valid matrix");

        let documents = matrix.required_documents(&scopes(&["Civil"]));
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].description.as_deref(),
            Some("Signed by the resident engineer")
        );
    }

    #[test]
    fn rejects_duplicate_scopes_and_documents() {
        let duplicate_scope = RequirementMatrix::from_json(
            r#"[{"scope": "Civil", "documents": []}, {"scope": " Civil", "documents": []}]"#,
        );
        assert!(matches!(
            duplicate_scope,
            Err(MatrixError::DuplicateScope(scope)) if scope == "Civil"
        ));

        let duplicate_document = RequirementMatrix::from_json(
            r#"[{"scope": "Civil", "documents": [
                {"id": "a", "name": "A", "required": true},
                {"id": "a", "name": "A again", "required": false}
            ]}]"#,
        );
        assert!(matches!(
            duplicate_document,
            Err(MatrixError::DuplicateDocument { .. })
        ));

        let empty_scope = RequirementMatrix::from_json(r#"[{"scope": "  ", "documents": []}]"#);
        assert!(matches!(empty_scope, Err(MatrixError::EmptyScope)));

        assert!(matches!(
            RequirementMatrix::from_json("{not json"),
            Err(MatrixError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_files() {
        let err = RequirementMatrix::load("/nonexistent/requirements.json")
            .expect_err("missing file fails");
        assert!(matches!(err, MatrixError::Io { .. }));
    }
}
