use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{
    FormStep, ImageStage, LocationImages, ProjectInfo, SafetyDeclaration, Signature,
    WorkLineItem, WorkLog, WorkLogEntry,
};
use crate::workflows::requirements::JobScope;

/// Partial update for one named section of the form state.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum FormUpdate {
    ProjectInfo(ProjectInfoPatch),
    Signature(SignaturePatch),
    LocationImage(StageImagePatch),
    WorkLineItem(WorkLineItemPatch),
    WorkLog(WorkLogPatch),
    SafetyDeclaration(SafetyDeclarationPatch),
}

impl FormUpdate {
    /// Step that owns the section this update touches.
    pub fn step(&self) -> FormStep {
        match self {
            FormUpdate::ProjectInfo(_) => FormStep::ProjectInfo,
            FormUpdate::Signature(_) => FormStep::SignatureAndSubmission,
            FormUpdate::LocationImage(_) => FormStep::LocationImages,
            FormUpdate::WorkLineItem(_) => FormStep::WorkLineItem,
            FormUpdate::WorkLog(_) => FormStep::WorkLog,
            FormUpdate::SafetyDeclaration(_) => FormStep::SafetyDeclaration,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfoPatch {
    pub purchase_order: Option<String>,
    pub project_name: Option<String>,
    pub contractor: Option<String>,
    pub location: Option<String>,
    pub job_scopes: Option<Vec<JobScope>>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
}

impl ProjectInfoPatch {
    /// Whether applying the patch changes the job scope selection.
    pub fn touches_job_scopes(&self) -> bool {
        self.job_scopes.is_some()
    }

    pub fn apply(self, target: &mut ProjectInfo) {
        merge(&mut target.purchase_order, self.purchase_order);
        merge(&mut target.project_name, self.project_name);
        merge(&mut target.contractor, self.contractor);
        merge(&mut target.location, self.location);
        if let Some(scopes) = self.job_scopes {
            target.set_job_scopes(scopes);
        }
        merge_option(&mut target.start_date, self.start_date);
        merge_option(&mut target.completion_date, self.completion_date);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturePatch {
    pub name: Option<String>,
    pub position: Option<String>,
    pub date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub signature_data: Option<String>,
}

impl SignaturePatch {
    pub fn apply(self, target: &mut Signature) {
        merge(&mut target.name, self.name);
        merge(&mut target.position, self.position);
        merge_option(&mut target.date, self.date);
        merge(&mut target.remarks, self.remarks);
        merge(&mut target.signature_data, self.signature_data);
    }
}

/// Capture metadata for a stage photo; the file itself goes through upload admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageImagePatch {
    pub stage: ImageStage,
    #[serde(default)]
    pub captured_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub gps: Option<String>,
}

impl StageImagePatch {
    pub fn apply(self, target: &mut LocationImages) {
        let image = target.stage_mut(self.stage);
        merge_option(&mut image.captured_at, self.captured_at);
        merge_option(&mut image.gps, self.gps);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkLineItemPatch {
    pub line_item: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
}

impl WorkLineItemPatch {
    pub fn apply(self, target: &mut WorkLineItem) {
        merge(&mut target.line_item, self.line_item);
        merge(&mut target.description, self.description);
        merge_option(&mut target.quantity, self.quantity);
        merge(&mut target.unit, self.unit);
    }
}

/// `replace` swaps the whole log before `append` entries are added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkLogPatch {
    pub replace: Option<Vec<WorkLogEntry>>,
    pub append: Vec<WorkLogEntry>,
}

impl WorkLogPatch {
    pub fn apply(self, target: &mut WorkLog) {
        if let Some(entries) = self.replace {
            target.entries = entries;
        }
        target.entries.extend(self.append);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyDeclarationPatch {
    pub ppe_worn: Option<bool>,
    pub permit_to_work: Option<bool>,
    pub site_cleared: Option<bool>,
    pub remarks: Option<String>,
}

impl SafetyDeclarationPatch {
    pub fn apply(self, target: &mut SafetyDeclaration) {
        merge(&mut target.ppe_worn, self.ppe_worn);
        merge(&mut target.permit_to_work, self.permit_to_work);
        merge(&mut target.site_cleared, self.site_cleared);
        merge(&mut target.remarks, self.remarks);
    }
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn merge_option<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}
