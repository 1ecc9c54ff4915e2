use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::controller::{FormController, FormError};
use super::domain::{FormKind, ImageStage, SubmissionFormState};
use super::handlers::SubmissionHandlers;
use super::patch::FormUpdate;
use crate::workflows::requirements::RequirementMatrix;
use crate::workflows::validation::{UploadOutcome, UploadPolicy, UploadedFile, ValidationReport};

/// Identifier wrapper for open form sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static FORM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_form_id() -> FormId {
    let id = FORM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FormId(format!("form-{id:06}"))
}

/// Snapshot of a form session returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub form_id: FormId,
    pub kind: FormKind,
    pub step: usize,
    pub step_count: usize,
    pub step_label: &'static str,
    pub steps: Vec<&'static str>,
    pub validation: ValidationReport,
    pub missing_fields: Vec<&'static str>,
    pub submitted: bool,
    pub state: SubmissionFormState,
}

impl FormView {
    fn from_controller<H: SubmissionHandlers>(id: &FormId, controller: &FormController<H>) -> Self {
        let readiness = controller.readiness();
        Self {
            form_id: id.clone(),
            kind: controller.kind(),
            step: controller.step(),
            step_count: controller.step_count(),
            step_label: controller.current_step().label(),
            steps: controller
                .kind()
                .steps()
                .iter()
                .map(|step| step.label())
                .collect(),
            validation: readiness.documents,
            missing_fields: readiness.missing_fields,
            submitted: controller.is_submitted(),
            state: controller.state().clone(),
        }
    }
}

/// Error raised by the form session facade.
#[derive(Debug, thiserror::Error)]
pub enum FormServiceError {
    #[error("form {0} not found")]
    NotFound(FormId),
    #[error(transparent)]
    Form(#[from] FormError),
}

/// Keeps one `FormController` per open form so HTTP clients can drive them step by step.
pub struct FormService<H> {
    matrix: Arc<RequirementMatrix>,
    policy: UploadPolicy,
    handlers: Arc<H>,
    sessions: Mutex<HashMap<FormId, FormController<H>>>,
}

impl<H> FormService<H>
where
    H: SubmissionHandlers + 'static,
{
    pub fn new(matrix: RequirementMatrix, policy: UploadPolicy, handlers: Arc<H>) -> Self {
        Self {
            matrix: Arc::new(matrix),
            policy,
            handlers,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn matrix(&self) -> &RequirementMatrix {
        &self.matrix
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn start(&self, kind: FormKind) -> FormView {
        let id = next_form_id();
        let controller = FormController::new(
            kind,
            self.matrix.clone(),
            self.policy.clone(),
            self.handlers.clone(),
        );
        let view = FormView::from_controller(&id, &controller);
        self.sessions().insert(id.clone(), controller);
        info!(form_id = %id, form_kind = ?kind, "form started");
        view
    }

    pub fn view(&self, id: &FormId) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| Ok(FormView::from_controller(id, controller)))
    }

    pub fn next(&self, id: &FormId) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| {
            controller.next();
            Ok(FormView::from_controller(id, controller))
        })
    }

    pub fn prev(&self, id: &FormId) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| {
            controller.prev();
            Ok(FormView::from_controller(id, controller))
        })
    }

    pub fn go_to(&self, id: &FormId, step: usize) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| {
            controller.go_to(step)?;
            Ok(FormView::from_controller(id, controller))
        })
    }

    pub fn update(&self, id: &FormId, update: FormUpdate) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| {
            controller.update(update)?;
            Ok(FormView::from_controller(id, controller))
        })
    }

    pub fn attach_documents(
        &self,
        id: &FormId,
        requirement_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<UploadOutcome, FormServiceError> {
        self.with_session(id, |controller| {
            controller.attach_documents(requirement_id, files)
        })
    }

    pub fn remove_document(
        &self,
        id: &FormId,
        requirement_id: &str,
        index: usize,
    ) -> Result<Option<UploadedFile>, FormServiceError> {
        self.with_session(id, |controller| {
            controller.remove_document(requirement_id, index)
        })
    }

    pub fn attach_stage_image(
        &self,
        id: &FormId,
        stage: ImageStage,
        file: UploadedFile,
        captured_at: Option<NaiveDateTime>,
        gps: Option<String>,
    ) -> Result<FormView, FormServiceError> {
        self.with_session(id, |controller| {
            controller.attach_stage_image(stage, file, captured_at, gps)?;
            Ok(FormView::from_controller(id, controller))
        })
    }

    pub fn save_draft(&self, id: &FormId) -> Result<(), FormServiceError> {
        self.with_session(id, |controller| controller.save_draft())
    }

    pub fn export_pdf(&self, id: &FormId) -> Result<(), FormServiceError> {
        self.with_session(id, |controller| controller.export_pdf())
    }

    /// Submit and, on success, release the session: the state now belongs to the backend.
    pub fn submit(&self, id: &FormId) -> Result<SubmissionFormState, FormServiceError> {
        let mut sessions = self.sessions();
        let controller = sessions
            .get_mut(id)
            .ok_or_else(|| FormServiceError::NotFound(id.clone()))?;
        controller.submit()?;

        let state = sessions
            .remove(id)
            .map(FormController::into_state)
            .ok_or_else(|| FormServiceError::NotFound(id.clone()))?;
        info!(form_id = %id, "form session closed after submission");
        Ok(state)
    }

    pub fn discard(&self, id: &FormId) -> Result<(), FormServiceError> {
        self.sessions()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FormServiceError::NotFound(id.clone()))
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<FormId, FormController<H>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<T, F>(&self, id: &FormId, action: F) -> Result<T, FormServiceError>
    where
        F: FnOnce(&mut FormController<H>) -> Result<T, FormError>,
    {
        let mut sessions = self.sessions();
        let controller = sessions
            .get_mut(id)
            .ok_or_else(|| FormServiceError::NotFound(id.clone()))?;
        Ok(action(controller)?)
    }
}
