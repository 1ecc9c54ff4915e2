use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use workorder_forms::workflows::forms::{
    FormController, FormError, FormKind, FormStep, FormUpdate, HandlerError, ImageStage,
    ProjectInfoPatch, SignaturePatch, SubmissionFormState, SubmissionHandlers, SubmissionSummary,
};
use workorder_forms::workflows::requirements::{JobScope, RequirementMatrix};
use workorder_forms::workflows::validation::{UploadPolicy, UploadedFile};

#[derive(Default)]
struct OutboxHandlers {
    submitted: Mutex<Vec<SubmissionFormState>>,
}

impl OutboxHandlers {
    fn submitted(&self) -> Vec<SubmissionFormState> {
        self.submitted.lock().expect("outbox mutex poisoned").clone()
    }
}

impl SubmissionHandlers for OutboxHandlers {
    fn save_draft(&self, _state: &SubmissionFormState) -> Result<(), HandlerError> {
        Ok(())
    }

    fn submit(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        self.submitted
            .lock()
            .expect("outbox mutex poisoned")
            .push(state.clone());
        Ok(())
    }

    fn export_pdf(&self, _state: &SubmissionFormState) -> Result<(), HandlerError> {
        Ok(())
    }
}

fn lks_form() -> (FormController<OutboxHandlers>, Arc<OutboxHandlers>) {
    let handlers = Arc::new(OutboxHandlers::default());
    let controller = FormController::new(
        FormKind::Lks,
        Arc::new(RequirementMatrix::standard()),
        UploadPolicy::default(),
        handlers.clone(),
    );
    (controller, handlers)
}

fn pdf(name: &str) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
}

fn site_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid site date")
}

#[test]
fn lks_form_walks_from_project_info_to_hand_off() {
    let (mut form, handlers) = lks_form();
    assert_eq!(form.current_step(), FormStep::ProjectInfo);

    form.update(FormUpdate::ProjectInfo(ProjectInfoPatch {
        purchase_order: Some("PO-2025-0142".to_string()),
        project_name: Some("PPU Taman Melati".to_string()),
        job_scopes: Some(vec![JobScope::new("Civil"), JobScope::new("HDD")]),
        ..ProjectInfoPatch::default()
    }))
    .expect("project info applies");

    form.next();
    assert_eq!(form.current_step(), FormStep::DocumentUpload);
    let required: Vec<&str> = form
        .required_documents()
        .into_iter()
        .map(|document| document.id.as_str())
        .collect();
    assert_eq!(
        required,
        vec![
            "civil-drawing",
            "as-built-drawing",
            "material-delivery-order",
            "hdd-bore-profile",
            "permit-to-dig",
        ]
    );

    for id in [
        "civil-drawing",
        "as-built-drawing",
        "hdd-bore-profile",
        "permit-to-dig",
    ] {
        let outcome = form
            .attach_documents(id, vec![pdf(&format!("{id}.pdf"))])
            .expect("requirement is listed");
        assert_eq!(outcome.accepted.len(), 1);
    }
    assert!(form.validate().is_valid);

    form.next();
    assert_eq!(form.current_step(), FormStep::LocationImages);
    form.attach_stage_image(
        ImageStage::Before,
        UploadedFile::new("before.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
        site_date().and_hms_opt(8, 30, 0),
        Some("3.0733, 101.5185".to_string()),
    )
    .expect("jpeg accepted for stage photo");

    form.next();
    assert!(form.is_last_step());
    match form.submit() {
        Err(FormError::Incomplete {
            missing_documents,
            missing_fields,
        }) => {
            assert!(missing_documents.is_empty());
            assert_eq!(
                missing_fields,
                vec!["signature name", "signature position", "signature image"]
            );
        }
        other => panic!("expected incomplete submission, got {other:?}"),
    }

    form.update(FormUpdate::Signature(SignaturePatch {
        name: Some("Aisyah Rahman".to_string()),
        position: Some("Site Supervisor".to_string()),
        date: Some(site_date()),
        signature_data: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
        ..SignaturePatch::default()
    }))
    .expect("signature applies");

    form.submit().expect("complete form submits");
    assert!(form.is_submitted());
    assert!(matches!(form.submit(), Err(FormError::AlreadySubmitted)));

    let submitted = handlers.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].project_info.purchase_order, "PO-2025-0142");
    assert_eq!(
        submitted[0].uploaded_documents.files("permit-to-dig").len(),
        1
    );
}

#[test]
fn summary_reports_outstanding_documents() {
    let (mut form, _) = lks_form();
    form.update(FormUpdate::ProjectInfo(ProjectInfoPatch {
        purchase_order: Some("PO-2025-0199".to_string()),
        job_scopes: Some(vec![JobScope::new("Pencawang")]),
        ..ProjectInfoPatch::default()
    }))
    .expect("project info applies");

    let matrix = RequirementMatrix::standard();
    let summary = SubmissionSummary::new(form.state(), &matrix).to_string();
    assert!(summary.contains("PO-2025-0199"));
    assert!(summary.contains("Pencawang"));
    assert!(summary.contains("Single Line Diagram"));
}
