//! Required-document validation for the document upload step.

mod uploads;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::requirements::{JobScope, RequirementMatrix};

pub use uploads::{UploadOutcome, UploadPolicy, UploadRejection, DEFAULT_MAX_FILE_BYTES};

/// File handed over by the upload widget (or an API client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: content.len() as u64,
            media_type: media_type.into(),
            content,
        }
    }

    /// Metadata-only handle for files whose bytes live elsewhere.
    pub fn descriptor(
        name: impl Into<String>,
        media_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            media_type: media_type.into(),
            content: Vec::new(),
        }
    }
}

/// Uploaded files keyed by document requirement id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedDocumentSet {
    slots: BTreeMap<String, Vec<UploadedFile>>,
}

impl UploadedDocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self, requirement_id: &str) -> &[UploadedFile] {
        self.slots
            .get(requirement_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_files(&self, requirement_id: &str) -> bool {
        !self.files(requirement_id).is_empty()
    }

    pub fn push(&mut self, requirement_id: impl Into<String>, file: UploadedFile) {
        self.slots.entry(requirement_id.into()).or_default().push(file);
    }

    pub fn extend<I>(&mut self, requirement_id: impl Into<String>, files: I)
    where
        I: IntoIterator<Item = UploadedFile>,
    {
        let slot = self.slots.entry(requirement_id.into()).or_default();
        slot.extend(files);
    }

    /// Remove one file from a slot; the slot disappears once it is empty.
    pub fn remove(&mut self, requirement_id: &str, index: usize) -> Option<UploadedFile> {
        let slot = self.slots.get_mut(requirement_id)?;
        if index >= slot.len() {
            return None;
        }
        let removed = slot.remove(index);
        if slot.is_empty() {
            self.slots.remove(requirement_id);
        }
        Some(removed)
    }

    /// Drop every slot rejected by `keep`, returning the purged ids.
    pub fn retain_slots<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let purged: Vec<String> = self
            .slots
            .keys()
            .filter(|id| !keep(id.as_str()))
            .cloned()
            .collect();
        for id in &purged {
            self.slots.remove(id);
        }
        purged
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &[UploadedFile])> {
        self.slots
            .iter()
            .map(|(id, files)| (id.as_str(), files.as_slice()))
    }

    pub fn file_count(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }
}

/// Outcome of checking uploads against the selected job scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub missing_documents: Vec<String>,
}

/// Every required document of the selected scopes needs at least one upload.
///
/// Missing ids are reported in matrix order. Zero-byte files still count as present.
pub fn validate_required_documents<'a, I>(
    matrix: &RequirementMatrix,
    scopes: I,
    uploads: &UploadedDocumentSet,
) -> ValidationReport
where
    I: IntoIterator<Item = &'a JobScope>,
{
    let missing_documents: Vec<String> = matrix
        .required_documents(scopes)
        .into_iter()
        .filter(|document| document.required && !uploads.has_files(&document.id))
        .map(|document| document.id.clone())
        .collect();

    ValidationReport {
        is_valid: missing_documents.is_empty(),
        missing_documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pencawang() -> Vec<JobScope> {
        vec![JobScope::new("Pencawang")]
    }

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[test]
    fn no_uploads_reports_every_required_document() {
        let matrix = RequirementMatrix::standard();
        let scopes = vec![JobScope::new("Civil"), JobScope::new("HDD")];

        let report = validate_required_documents(&matrix, &scopes, &UploadedDocumentSet::new());

        let expected: Vec<String> = matrix
            .required_documents(&scopes)
            .into_iter()
            .filter(|document| document.required)
            .map(|document| document.id.clone())
            .collect();
        assert!(!report.is_valid);
        assert_eq!(report.missing_documents, expected);
    }

    #[test]
    fn uploads_clear_missing_entries() {
        let matrix = RequirementMatrix::standard();
        let mut uploads = UploadedDocumentSet::new();
        uploads.push("single-line-diagram", pdf("sld.pdf"));

        let report = validate_required_documents(&matrix, &pencawang(), &uploads);
        assert!(report.is_valid);
        assert!(report.missing_documents.is_empty());
    }

    #[test]
    fn zero_byte_files_count_as_present() {
        let matrix = RequirementMatrix::standard();
        let mut uploads = UploadedDocumentSet::new();
        uploads.push(
            "single-line-diagram",
            UploadedFile::new("empty.pdf", "application/pdf", Vec::new()),
        );

        assert!(validate_required_documents(&matrix, &pencawang(), &uploads).is_valid);
    }

    #[test]
    fn optional_documents_never_block() {
        let matrix = RequirementMatrix::standard();
        let mut uploads = UploadedDocumentSet::new();
        uploads.push("single-line-diagram", pdf("sld.pdf"));

        let report = validate_required_documents(&matrix, &pencawang(), &uploads);
        assert!(!report
            .missing_documents
            .contains(&"equipment-test-report".to_string()));
    }

    #[test]
    fn validation_is_idempotent() {
        let matrix = RequirementMatrix::standard();
        let scopes = vec![JobScope::new("Cable Laying"), JobScope::new("Pencawang")];
        let mut uploads = UploadedDocumentSet::new();
        uploads.push("permit-to-dig", pdf("permit.pdf"));

        let first = validate_required_documents(&matrix, &scopes, &uploads);
        let second = validate_required_documents(&matrix, &scopes, &uploads);
        assert_eq!(first, second);
        assert_eq!(
            first.missing_documents,
            vec!["single-line-diagram", "cable-route-plan", "cable-test-report"]
        );
    }

    #[test]
    fn removing_last_file_empties_the_slot() {
        let mut uploads = UploadedDocumentSet::new();
        uploads.push("single-line-diagram", pdf("sld.pdf"));

        assert!(uploads.remove("single-line-diagram", 1).is_none());
        let removed = uploads
            .remove("single-line-diagram", 0)
            .expect("file removed");
        assert_eq!(removed.name, "sld.pdf");
        assert!(!uploads.has_files("single-line-diagram"));
        assert!(uploads.is_empty());
    }

    #[test]
    fn retain_slots_reports_purged_ids() {
        let mut uploads = UploadedDocumentSet::new();
        uploads.push("single-line-diagram", pdf("sld.pdf"));
        uploads.push("civil-drawing", pdf("civil.pdf"));

        let purged = uploads.retain_slots(|id| id == "civil-drawing");
        assert_eq!(purged, vec!["single-line-diagram".to_string()]);
        assert_eq!(uploads.file_count(), 1);
    }
}
