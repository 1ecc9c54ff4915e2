use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{FormKind, FormStep, ImageStage, SubmissionFormState};
use super::handlers::{HandlerError, SubmissionHandlers};
use super::patch::FormUpdate;
use crate::workflows::requirements::{DocumentRequirement, RequirementMatrix};
use crate::workflows::validation::{
    validate_required_documents, UploadOutcome, UploadPolicy, UploadRejection, UploadedFile,
    ValidationReport,
};

/// Required document still lacking an upload, with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDocument {
    pub id: String,
    pub name: String,
}

/// Errors raised by form transitions.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("{}", incomplete_message(.missing_documents, .missing_fields))]
    Incomplete {
        missing_documents: Vec<MissingDocument>,
        missing_fields: Vec<&'static str>,
    },
    #[error("form has already been submitted")]
    AlreadySubmitted,
    #[error("submission is only available from step {last}; the form is on step {step}")]
    NotOnFinalStep { step: usize, last: usize },
    #[error("step {requested} is outside 1..={last}")]
    StepOutOfRange { requested: usize, last: usize },
    #[error("document '{0}' is not requested by the selected job scopes")]
    UnknownDocument(String),
    #[error("{} forms have no {} section", .kind.label(), .step.label())]
    SectionNotAvailable { kind: FormKind, step: FormStep },
    #[error(transparent)]
    Upload(#[from] UploadRejection),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

fn incomplete_message(documents: &[MissingDocument], fields: &[&'static str]) -> String {
    let mut parts = Vec::new();
    if !documents.is_empty() {
        let names: Vec<&str> = documents.iter().map(|doc| doc.name.as_str()).collect();
        parts.push(format!("missing required documents: {}", names.join(", ")));
    }
    if !fields.is_empty() {
        parts.push(format!("missing fields: {}", fields.join(", ")));
    }
    format!("submission is incomplete ({})", parts.join("; "))
}

/// Everything `submit` checks before handing the state to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub documents: ValidationReport,
    pub missing_fields: Vec<&'static str>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.documents.is_valid && self.missing_fields.is_empty()
    }
}

/// Multi-step controller owning one in-progress submission.
pub struct FormController<H> {
    state: SubmissionFormState,
    step: usize,
    matrix: Arc<RequirementMatrix>,
    policy: UploadPolicy,
    handlers: Arc<H>,
    submitted: bool,
}

impl<H> FormController<H>
where
    H: SubmissionHandlers,
{
    pub fn new(
        kind: FormKind,
        matrix: Arc<RequirementMatrix>,
        policy: UploadPolicy,
        handlers: Arc<H>,
    ) -> Self {
        Self {
            state: SubmissionFormState::new(kind),
            step: 1,
            matrix,
            policy,
            handlers,
            submitted: false,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.state.kind
    }

    pub fn state(&self) -> &SubmissionFormState {
        &self.state
    }

    pub fn into_state(self) -> SubmissionFormState {
        self.state
    }

    /// 1-based index of the current step.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_count(&self) -> usize {
        self.kind().steps().len()
    }

    pub fn current_step(&self) -> FormStep {
        self.kind().steps()[self.step - 1]
    }

    pub fn is_last_step(&self) -> bool {
        self.step == self.step_count()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn next(&mut self) -> usize {
        if self.step < self.step_count() {
            self.step += 1;
            debug!(form_kind = ?self.kind(), step = self.step, "advanced form step");
        }
        self.step
    }

    pub fn prev(&mut self) -> usize {
        if self.step > 1 {
            self.step -= 1;
            debug!(form_kind = ?self.kind(), step = self.step, "returned to form step");
        }
        self.step
    }

    pub fn go_to(&mut self, step: usize) -> Result<usize, FormError> {
        let last = self.step_count();
        if step == 0 || step > last {
            return Err(FormError::StepOutOfRange {
                requested: step,
                last,
            });
        }
        self.step = step;
        Ok(self.step)
    }

    /// Merge a partial section update into the state. The current step is untouched.
    pub fn update(&mut self, update: FormUpdate) -> Result<(), FormError> {
        self.ensure_open()?;
        self.ensure_section(update.step())?;

        match update {
            FormUpdate::ProjectInfo(patch) => {
                let touches_scopes = patch.touches_job_scopes();
                patch.apply(&mut self.state.project_info);
                if touches_scopes {
                    self.purge_stale_uploads();
                }
            }
            FormUpdate::Signature(patch) => patch.apply(&mut self.state.signature),
            FormUpdate::LocationImage(patch) => patch.apply(&mut self.state.location_images),
            FormUpdate::WorkLineItem(patch) => {
                patch.apply(self.state.work_line_item.get_or_insert_with(Default::default))
            }
            FormUpdate::WorkLog(patch) => {
                patch.apply(self.state.work_log.get_or_insert_with(Default::default))
            }
            FormUpdate::SafetyDeclaration(patch) => {
                patch.apply(self.state.safety_declaration.get_or_insert_with(Default::default))
            }
        }

        Ok(())
    }

    /// Documents requested by the current scope selection, required and optional.
    pub fn required_documents(&self) -> Vec<&DocumentRequirement> {
        self.matrix
            .required_documents(&self.state.project_info.job_scopes)
    }

    /// Admit a batch of files into a document slot. Rejected files are reported, the rest kept.
    pub fn attach_documents(
        &mut self,
        requirement_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<UploadOutcome, FormError> {
        self.ensure_open()?;
        self.ensure_section(FormStep::DocumentUpload)?;
        if self
            .matrix
            .document_for(&self.state.project_info.job_scopes, requirement_id)
            .is_none()
        {
            return Err(FormError::UnknownDocument(requirement_id.to_string()));
        }

        let outcome = self.policy.admit(files);
        for rejection in &outcome.rejected {
            warn!(requirement_id, file = rejection.file_name(), %rejection, "upload rejected");
        }
        self.state
            .uploaded_documents
            .extend(requirement_id, outcome.accepted.iter().cloned());

        Ok(outcome)
    }

    /// `Ok(None)` when the slot has no file at `index`.
    pub fn remove_document(
        &mut self,
        requirement_id: &str,
        index: usize,
    ) -> Result<Option<UploadedFile>, FormError> {
        self.ensure_open()?;
        let removed = self.state.uploaded_documents.remove(requirement_id, index);
        if let Some(file) = &removed {
            debug!(requirement_id, file = %file.name, "upload removed");
        }
        Ok(removed)
    }

    pub fn attach_stage_image(
        &mut self,
        stage: ImageStage,
        file: UploadedFile,
        captured_at: Option<NaiveDateTime>,
        gps: Option<String>,
    ) -> Result<(), FormError> {
        self.ensure_open()?;
        self.ensure_section(FormStep::LocationImages)?;
        self.policy.images_only().check(&file).map_err(|rejection| {
            warn!(stage = stage.label(), %rejection, "stage image rejected");
            FormError::from(rejection)
        })?;

        let image = self.state.location_images.stage_mut(stage);
        image.file = Some(file);
        if captured_at.is_some() {
            image.captured_at = captured_at;
        }
        if gps.is_some() {
            image.gps = gps;
        }
        Ok(())
    }

    pub fn validate(&self) -> ValidationReport {
        validate_required_documents(
            &self.matrix,
            &self.state.project_info.job_scopes,
            &self.state.uploaded_documents,
        )
    }

    pub fn readiness(&self) -> Readiness {
        let signature = &self.state.signature;
        let mut missing_fields = Vec::new();
        if is_blank(&signature.name) {
            missing_fields.push("signature name");
        }
        if is_blank(&signature.position) {
            missing_fields.push("signature position");
        }
        if is_blank(&signature.signature_data) {
            missing_fields.push("signature image");
        }

        if self.kind().has_step(FormStep::SafetyDeclaration) {
            let safety = self.state.safety_declaration.clone().unwrap_or_default();
            if !safety.ppe_worn {
                missing_fields.push("safety: PPE worn");
            }
            if !safety.permit_to_work {
                missing_fields.push("safety: permit to work");
            }
            if !safety.site_cleared {
                missing_fields.push("safety: site cleared");
            }
        }

        Readiness {
            documents: self.validate(),
            missing_fields,
        }
    }

    /// Drafts skip validation entirely.
    pub fn save_draft(&self) -> Result<(), FormError> {
        self.handlers.save_draft(&self.state).map_err(|err| {
            warn!(form_kind = ?self.kind(), error = %err, "draft handler failed");
            FormError::from(err)
        })?;
        info!(form_kind = ?self.kind(), step = self.step, "draft saved");
        Ok(())
    }

    /// Hand the state to the submit handler once every gate passes.
    ///
    /// Only the last step may submit. A successful submission latches the form; later calls
    /// and further edits return `AlreadySubmitted`.
    pub fn submit(&mut self) -> Result<(), FormError> {
        self.ensure_open()?;
        if !self.is_last_step() {
            return Err(FormError::NotOnFinalStep {
                step: self.step,
                last: self.step_count(),
            });
        }

        let readiness = self.readiness();
        if !readiness.is_ready() {
            let missing_documents = self.describe_missing(&readiness.documents);
            info!(
                form_kind = ?self.kind(),
                missing_documents = missing_documents.len(),
                missing_fields = readiness.missing_fields.len(),
                "submission refused"
            );
            return Err(FormError::Incomplete {
                missing_documents,
                missing_fields: readiness.missing_fields,
            });
        }

        self.handlers.submit(&self.state).map_err(|err| {
            warn!(form_kind = ?self.kind(), error = %err, "submit handler failed");
            FormError::from(err)
        })?;
        self.submitted = true;
        info!(
            form_kind = ?self.kind(),
            purchase_order = %self.state.project_info.purchase_order,
            "submission handed off"
        );
        Ok(())
    }

    pub fn export_pdf(&self) -> Result<(), FormError> {
        self.handlers.export_pdf(&self.state).map_err(|err| {
            warn!(form_kind = ?self.kind(), error = %err, "export handler failed");
            FormError::from(err)
        })
    }

    fn ensure_open(&self) -> Result<(), FormError> {
        if self.submitted {
            Err(FormError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    fn ensure_section(&self, step: FormStep) -> Result<(), FormError> {
        if self.kind().has_step(step) {
            Ok(())
        } else {
            Err(FormError::SectionNotAvailable {
                kind: self.kind(),
                step,
            })
        }
    }

    /// Uploads for documents the new scope selection no longer lists are dropped.
    fn purge_stale_uploads(&mut self) {
        let listed: Vec<String> = self
            .required_documents()
            .into_iter()
            .map(|document| document.id.clone())
            .collect();
        let purged = self
            .state
            .uploaded_documents
            .retain_slots(|id| listed.iter().any(|listed_id| listed_id == id));
        if !purged.is_empty() {
            info!(?purged, "purged uploads for deselected job scopes");
        }
    }

    fn describe_missing(&self, report: &ValidationReport) -> Vec<MissingDocument> {
        report
            .missing_documents
            .iter()
            .map(|id| MissingDocument {
                id: id.clone(),
                name: self
                    .matrix
                    .find_document(id)
                    .map(|document| document.name.clone())
                    .unwrap_or_else(|| id.clone()),
            })
            .collect()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
