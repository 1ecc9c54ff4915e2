use mime::Mime;
use serde::Serialize;

use super::UploadedFile;

pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Reason a selected file was refused at the point of selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UploadRejection {
    #[error("{name} is {} which exceeds the {} upload limit", megabytes(.size), megabytes(.limit))]
    Oversize { name: String, size: u64, limit: u64 },
    #[error("{name} has unsupported file type '{media_type}' (accepted: {accepted})")]
    UnsupportedType {
        name: String,
        media_type: String,
        accepted: String,
    },
}

impl UploadRejection {
    pub fn file_name(&self) -> &str {
        match self {
            UploadRejection::Oversize { name, .. } => name,
            UploadRejection::UnsupportedType { name, .. } => name,
        }
    }
}

fn megabytes(bytes: &u64) -> String {
    format!("{:.1} MB", *bytes as f64 / (1024.0 * 1024.0))
}

/// Result of admitting a batch of files; accepted files survive even when siblings fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub accepted: Vec<UploadedFile>,
    pub rejected: Vec<UploadRejection>,
}

impl UploadOutcome {
    pub fn messages(&self) -> Vec<String> {
        self.rejected.iter().map(ToString::to_string).collect()
    }
}

/// File size cap and accepted media types for uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    max_file_bytes: u64,
    accepted_media_types: Vec<Mime>,
}

impl UploadPolicy {
    pub fn new(max_file_bytes: u64, accepted_media_types: Vec<Mime>) -> Self {
        let max_file_bytes = if max_file_bytes == 0 {
            DEFAULT_MAX_FILE_BYTES
        } else {
            max_file_bytes
        };

        Self {
            max_file_bytes,
            accepted_media_types,
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn accepted_media_types(&self) -> &[Mime] {
        &self.accepted_media_types
    }

    /// Same size cap, restricted to the image types of this policy.
    pub fn images_only(&self) -> Self {
        Self {
            max_file_bytes: self.max_file_bytes,
            accepted_media_types: self
                .accepted_media_types
                .iter()
                .filter(|media_type| media_type.type_() == mime::IMAGE)
                .cloned()
                .collect(),
        }
    }

    pub fn check(&self, file: &UploadedFile) -> Result<(), UploadRejection> {
        if !self.accepts_media_type(&file.media_type) {
            return Err(UploadRejection::UnsupportedType {
                name: file.name.clone(),
                media_type: file.media_type.clone(),
                accepted: self.accepted_label(),
            });
        }

        if file.size > self.max_file_bytes {
            return Err(UploadRejection::Oversize {
                name: file.name.clone(),
                size: file.size,
                limit: self.max_file_bytes,
            });
        }

        Ok(())
    }

    pub fn admit<I>(&self, files: I) -> UploadOutcome
    where
        I: IntoIterator<Item = UploadedFile>,
    {
        let mut outcome = UploadOutcome::default();
        for file in files {
            match self.check(&file) {
                Ok(()) => outcome.accepted.push(file),
                Err(rejection) => outcome.rejected.push(rejection),
            }
        }
        outcome
    }

    fn accepts_media_type(&self, raw: &str) -> bool {
        let Ok(parsed) = raw.trim().parse::<Mime>() else {
            return false;
        };

        self.accepted_media_types.iter().any(|accepted| {
            accepted.type_() == parsed.type_() && accepted.subtype() == parsed.subtype()
        })
    }

    fn accepted_label(&self) -> String {
        self.accepted_media_types
            .iter()
            .map(|media_type| media_type.essence_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_BYTES,
            vec![mime::APPLICATION_PDF, mime::IMAGE_JPEG, mime::IMAGE_PNG],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEGABYTE: u64 = 1024 * 1024;

    #[test]
    fn rejects_files_over_the_cap() {
        let policy = UploadPolicy::default();
        let file = UploadedFile::descriptor("drawing.pdf", "application/pdf", 15 * MEGABYTE);

        let rejection = policy.check(&file).expect_err("15MB exceeds the cap");
        assert!(matches!(rejection, UploadRejection::Oversize { .. }));
        let message = rejection.to_string();
        assert!(message.contains("15.0 MB"), "{message}");
        assert!(message.contains("10.0 MB"), "{message}");
    }

    #[test]
    fn accepts_file_exactly_at_the_cap() {
        let policy = UploadPolicy::default();
        let file = UploadedFile::descriptor("drawing.pdf", "application/pdf", 10 * MEGABYTE);
        assert!(policy.check(&file).is_ok());
    }

    #[test]
    fn rejects_unsupported_media_types() {
        let policy = UploadPolicy::default();
        let file = UploadedFile::descriptor("notes.docx", "application/msword", 1024);

        match policy.check(&file) {
            Err(UploadRejection::UnsupportedType {
                name, accepted, ..
            }) => {
                assert_eq!(name, "notes.docx");
                assert!(accepted.contains("application/pdf"));
            }
            other => panic!("expected unsupported type, got {other:?}"),
        }
    }

    #[test]
    fn media_type_parameters_are_ignored() {
        let policy = UploadPolicy::default();
        let file = UploadedFile::descriptor("photo.jpg", "image/jpeg; q=0.9", 1024);
        assert!(policy.check(&file).is_ok());

        let garbage = UploadedFile::descriptor("photo.jpg", "not a mime", 1024);
        assert!(policy.check(&garbage).is_err());
    }

    #[test]
    fn admit_keeps_accepted_files_from_a_mixed_batch() {
        let policy = UploadPolicy::default();
        let outcome = policy.admit(vec![
            UploadedFile::descriptor("ok.pdf", "application/pdf", MEGABYTE),
            UploadedFile::descriptor("huge.pdf", "application/pdf", 15 * MEGABYTE),
            UploadedFile::descriptor("scan.png", "image/png", MEGABYTE),
            UploadedFile::descriptor("macro.xlsm", "application/vnd.ms-excel", MEGABYTE),
        ]);

        let accepted: Vec<&str> = outcome
            .accepted
            .iter()
            .map(|file| file.name.as_str())
            .collect();
        assert_eq!(accepted, vec!["ok.pdf", "scan.png"]);
        let rejected: Vec<&str> = outcome
            .rejected
            .iter()
            .map(UploadRejection::file_name)
            .collect();
        assert_eq!(rejected, vec!["huge.pdf", "macro.xlsm"]);
        assert_eq!(outcome.messages().len(), 2);
    }

    #[test]
    fn images_only_drops_documents() {
        let policy = UploadPolicy::default().images_only();
        assert_eq!(policy.max_file_bytes(), DEFAULT_MAX_FILE_BYTES);
        assert!(policy
            .check(&UploadedFile::descriptor("a.pdf", "application/pdf", 1))
            .is_err());
        assert!(policy
            .check(&UploadedFile::descriptor("a.png", "image/png", 1))
            .is_ok());
    }

    #[test]
    fn zero_cap_falls_back_to_default() {
        let policy = UploadPolicy::new(0, vec![mime::APPLICATION_PDF]);
        assert_eq!(policy.max_file_bytes(), DEFAULT_MAX_FILE_BYTES);
    }
}
