use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::workflows::requirements::JobScope;
use crate::workflows::validation::{UploadedDocumentSet, UploadedFile};

/// Which paperwork a form instance collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    /// Submission bundling project info, supporting documents and stage photos.
    Lks,
    /// Work report tied to a purchase-order line item.
    Lkh,
}

const LKS_STEPS: [FormStep; 4] = [
    FormStep::ProjectInfo,
    FormStep::DocumentUpload,
    FormStep::LocationImages,
    FormStep::SignatureAndSubmission,
];

const LKH_STEPS: [FormStep; 6] = [
    FormStep::ProjectInfo,
    FormStep::WorkLineItem,
    FormStep::WorkLog,
    FormStep::DocumentUpload,
    FormStep::SafetyDeclaration,
    FormStep::SignatureAndSubmission,
];

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            FormKind::Lks => "LKS submission",
            FormKind::Lkh => "LKH work report",
        }
    }

    pub fn steps(self) -> &'static [FormStep] {
        match self {
            FormKind::Lks => &LKS_STEPS,
            FormKind::Lkh => &LKH_STEPS,
        }
    }

    pub fn has_step(self, step: FormStep) -> bool {
        self.steps().contains(&step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    ProjectInfo,
    DocumentUpload,
    WorkLineItem,
    WorkLog,
    LocationImages,
    SafetyDeclaration,
    SignatureAndSubmission,
}

impl FormStep {
    pub const fn label(self) -> &'static str {
        match self {
            FormStep::ProjectInfo => "Project Info",
            FormStep::DocumentUpload => "Document Upload",
            FormStep::WorkLineItem => "Work Line Item",
            FormStep::WorkLog => "Work Log",
            FormStep::LocationImages => "Location Images",
            FormStep::SafetyDeclaration => "Safety Declaration",
            FormStep::SignatureAndSubmission => "Signature & Submission",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub purchase_order: String,
    pub project_name: String,
    pub contractor: String,
    pub location: String,
    pub job_scopes: Vec<JobScope>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
}

impl ProjectInfo {
    /// Replace the scope selection, keeping first-selection order and dropping repeats.
    pub fn set_job_scopes<I>(&mut self, scopes: I)
    where
        I: IntoIterator<Item = JobScope>,
    {
        let mut selected: Vec<JobScope> = Vec::new();
        for scope in scopes {
            if scope.label().is_empty() || selected.contains(&scope) {
                continue;
            }
            selected.push(scope);
        }
        self.job_scopes = selected;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStage {
    Before,
    During,
    After,
}

impl ImageStage {
    pub const ALL: [ImageStage; 3] = [ImageStage::Before, ImageStage::During, ImageStage::After];

    pub const fn label(self) -> &'static str {
        match self {
            ImageStage::Before => "before",
            ImageStage::During => "during",
            ImageStage::After => "after",
        }
    }
}

/// Site photo with the capture metadata the field app attaches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageImage {
    pub file: Option<UploadedFile>,
    pub captured_at: Option<NaiveDateTime>,
    pub gps: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationImages {
    pub before: StageImage,
    pub during: StageImage,
    pub after: StageImage,
}

impl LocationImages {
    pub fn stage(&self, stage: ImageStage) -> &StageImage {
        match stage {
            ImageStage::Before => &self.before,
            ImageStage::During => &self.during,
            ImageStage::After => &self.after,
        }
    }

    pub fn stage_mut(&mut self, stage: ImageStage) -> &mut StageImage {
        match stage {
            ImageStage::Before => &mut self.before,
            ImageStage::During => &mut self.during,
            ImageStage::After => &mut self.after,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub position: String,
    pub date: Option<NaiveDate>,
    pub remarks: String,
    /// Encoded signature pad image.
    pub signature_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLineItem {
    pub line_item: String,
    pub description: String,
    pub quantity: Option<u32>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLogEntry {
    pub date: NaiveDate,
    pub activity: String,
    pub manpower: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLog {
    pub entries: Vec<WorkLogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDeclaration {
    pub ppe_worn: bool,
    pub permit_to_work: bool,
    pub site_cleared: bool,
    pub remarks: String,
}

/// In-progress submission owned by one form instance until it is handed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFormState {
    pub kind: FormKind,
    pub project_info: ProjectInfo,
    pub uploaded_documents: UploadedDocumentSet,
    pub location_images: LocationImages,
    pub signature: Signature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_line_item: Option<WorkLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_log: Option<WorkLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_declaration: Option<SafetyDeclaration>,
}

impl SubmissionFormState {
    pub fn new(kind: FormKind) -> Self {
        let lkh = matches!(kind, FormKind::Lkh);
        Self {
            kind,
            project_info: ProjectInfo::default(),
            uploaded_documents: UploadedDocumentSet::new(),
            location_images: LocationImages::default(),
            signature: Signature::default(),
            work_line_item: lkh.then(WorkLineItem::default),
            work_log: lkh.then(WorkLog::default),
            safety_declaration: lkh.then(SafetyDeclaration::default),
        }
    }
}
