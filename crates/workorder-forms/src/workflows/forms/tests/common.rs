use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::forms::domain::{FormKind, SubmissionFormState};
use crate::workflows::forms::handlers::{HandlerError, SubmissionHandlers};
use crate::workflows::forms::patch::{
    FormUpdate, ProjectInfoPatch, SafetyDeclarationPatch, SignaturePatch,
};
use crate::workflows::forms::{form_router, FormController, FormService};
use crate::workflows::requirements::{JobScope, RequirementMatrix};
use crate::workflows::validation::{UploadPolicy, UploadedFile};

pub(super) const MEGABYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HandlerCall {
    Draft,
    Submit,
    Export,
}

#[derive(Default, Clone)]
pub(super) struct RecordingHandlers {
    calls: Arc<Mutex<Vec<(HandlerCall, SubmissionFormState)>>>,
}

impl RecordingHandlers {
    pub(super) fn calls(&self) -> Vec<(HandlerCall, SubmissionFormState)> {
        self.calls.lock().expect("handler mutex poisoned").clone()
    }

    pub(super) fn count(&self, call: HandlerCall) -> usize {
        self.calls()
            .iter()
            .filter(|(recorded, _)| *recorded == call)
            .count()
    }

    fn record(&self, call: HandlerCall, state: &SubmissionFormState) {
        self.calls
            .lock()
            .expect("handler mutex poisoned")
            .push((call, state.clone()));
    }
}

impl SubmissionHandlers for RecordingHandlers {
    fn save_draft(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        self.record(HandlerCall::Draft, state);
        Ok(())
    }

    fn submit(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        self.record(HandlerCall::Submit, state);
        Ok(())
    }

    fn export_pdf(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        self.record(HandlerCall::Export, state);
        Ok(())
    }
}

pub(super) struct OfflineHandlers;

impl SubmissionHandlers for OfflineHandlers {
    fn save_draft(&self, _state: &SubmissionFormState) -> Result<(), HandlerError> {
        Err(HandlerError::Unavailable("network offline".to_string()))
    }

    fn submit(&self, _state: &SubmissionFormState) -> Result<(), HandlerError> {
        Err(HandlerError::Unavailable("network offline".to_string()))
    }

    fn export_pdf(&self, _state: &SubmissionFormState) -> Result<(), HandlerError> {
        Err(HandlerError::Rejected("template missing".to_string()))
    }
}

pub(super) fn matrix() -> Arc<RequirementMatrix> {
    Arc::new(RequirementMatrix::standard())
}

pub(super) fn controller(
    kind: FormKind,
) -> (FormController<RecordingHandlers>, Arc<RecordingHandlers>) {
    let handlers = Arc::new(RecordingHandlers::default());
    let controller = FormController::new(
        kind,
        matrix(),
        UploadPolicy::default(),
        handlers.clone(),
    );
    (controller, handlers)
}

pub(super) fn move_to_last_step<H: SubmissionHandlers>(form: &mut FormController<H>) {
    let last = form.step_count();
    form.go_to(last).expect("last step in range");
}

pub(super) fn pdf(name: &str) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", b"%PDF-1.7 test".to_vec())
}

pub(super) fn jpeg(name: &str) -> UploadedFile {
    UploadedFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

pub(super) fn scopes_update(labels: &[&str]) -> FormUpdate {
    FormUpdate::ProjectInfo(ProjectInfoPatch {
        purchase_order: Some("PO-2025-00418".to_string()),
        project_name: Some("PPU Seksyen 13 upgrade".to_string()),
        contractor: Some("Syarikat Elektrik Jaya".to_string()),
        location: Some("Shah Alam".to_string()),
        job_scopes: Some(labels.iter().map(|label| JobScope::new(label)).collect()),
        start_date: NaiveDate::from_ymd_opt(2025, 2, 3),
        completion_date: NaiveDate::from_ymd_opt(2025, 3, 14),
    })
}

pub(super) fn signature_update() -> FormUpdate {
    FormUpdate::Signature(SignaturePatch {
        name: Some("Aminah binti Yusof".to_string()),
        position: Some("Site Supervisor".to_string()),
        date: NaiveDate::from_ymd_opt(2025, 3, 15),
        remarks: Some("Handover completed".to_string()),
        signature_data: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
    })
}

pub(super) fn safety_confirmed() -> FormUpdate {
    FormUpdate::SafetyDeclaration(SafetyDeclarationPatch {
        ppe_worn: Some(true),
        permit_to_work: Some(true),
        site_cleared: Some(true),
        remarks: None,
    })
}

pub(super) fn build_service() -> (Arc<FormService<RecordingHandlers>>, Arc<RecordingHandlers>) {
    let handlers = Arc::new(RecordingHandlers::default());
    let service = Arc::new(FormService::new(
        RequirementMatrix::standard(),
        UploadPolicy::default(),
        handlers.clone(),
    ));
    (service, handlers)
}

pub(super) fn router_with_service(service: Arc<FormService<RecordingHandlers>>) -> axum::Router {
    form_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
