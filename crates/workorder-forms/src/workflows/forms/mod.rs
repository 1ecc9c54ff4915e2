//! Multi-step LKS/LKH form controller.
//!
//! A `FormController` owns one `SubmissionFormState` from the moment a form is opened until it
//! is handed to the injected `SubmissionHandlers`. Steps advance and retreat within the fixed
//! sequence of the form kind, sections are updated through typed patches, and submission is
//! gated on the document validation report plus the signature fields.

mod controller;
pub mod domain;
pub mod handlers;
pub mod patch;
pub mod router;
pub mod service;
mod summary;

#[cfg(test)]
mod tests;

pub use controller::{FormController, FormError, MissingDocument, Readiness};
pub use domain::{
    FormKind, FormStep, ImageStage, LocationImages, ProjectInfo, SafetyDeclaration, Signature,
    StageImage, SubmissionFormState, WorkLineItem, WorkLog, WorkLogEntry,
};
pub use handlers::{HandlerError, SubmissionHandlers};
pub use patch::{
    FormUpdate, ProjectInfoPatch, SafetyDeclarationPatch, SignaturePatch, StageImagePatch,
    WorkLineItemPatch, WorkLogPatch,
};
pub use router::form_router;
pub use service::{FormId, FormService, FormServiceError, FormView};
pub use summary::SubmissionSummary;
