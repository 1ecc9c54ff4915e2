use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use workorder_forms::workflows::forms::{
    HandlerError, SubmissionFormState, SubmissionHandlers, SubmissionSummary,
};
use workorder_forms::workflows::requirements::RequirementMatrix;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Records kept per handler action; older entries are dropped first.
pub(crate) const RETAINED_RECORDS: usize = 64;

/// Keeps the most recent hand-offs in memory; exports are rendered as plain-text summaries.
#[derive(Clone)]
pub(crate) struct InMemorySubmissionHandlers {
    matrix: Arc<RequirementMatrix>,
    drafts: Arc<Mutex<VecDeque<SubmissionFormState>>>,
    submissions: Arc<Mutex<VecDeque<SubmissionFormState>>>,
    exports: Arc<Mutex<VecDeque<String>>>,
}

fn retain<T>(records: &Mutex<VecDeque<T>>, record: T) -> usize {
    let mut records = records.lock().unwrap_or_else(PoisonError::into_inner);
    if records.len() == RETAINED_RECORDS {
        records.pop_front();
    }
    records.push_back(record);
    records.len()
}

impl InMemorySubmissionHandlers {
    pub(crate) fn new(matrix: Arc<RequirementMatrix>) -> Self {
        Self {
            matrix,
            drafts: Arc::default(),
            submissions: Arc::default(),
            exports: Arc::default(),
        }
    }

    pub(crate) fn drafts(&self) -> usize {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn submissions(&self) -> Vec<SubmissionFormState> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn last_export(&self) -> Option<String> {
        self.exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }
}

impl SubmissionHandlers for InMemorySubmissionHandlers {
    fn save_draft(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        let drafts = retain(&self.drafts, state.clone());
        info!(form_kind = state.kind.label(), drafts, "draft stored");
        Ok(())
    }

    fn submit(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        retain(&self.submissions, state.clone());
        info!(
            form_kind = state.kind.label(),
            purchase_order = %state.project_info.purchase_order,
            "submission stored"
        );
        Ok(())
    }

    fn export_pdf(&self, state: &SubmissionFormState) -> Result<(), HandlerError> {
        let rendered = SubmissionSummary::new(state, &self.matrix).to_string();
        retain(&self.exports, rendered);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
