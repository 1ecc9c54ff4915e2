use std::fmt;

use super::domain::{FormStep, ImageStage, SubmissionFormState};
use crate::workflows::requirements::RequirementMatrix;
use crate::workflows::validation::validate_required_documents;

/// Plain-text rendering of a submission used by export handlers and the CLI.
pub struct SubmissionSummary<'a> {
    state: &'a SubmissionFormState,
    matrix: &'a RequirementMatrix,
}

impl<'a> SubmissionSummary<'a> {
    pub fn new(state: &'a SubmissionFormState, matrix: &'a RequirementMatrix) -> Self {
        Self { state, matrix }
    }
}

impl fmt::Display for SubmissionSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state;
        let info = &state.project_info;

        writeln!(f, "{}", state.kind.label())?;
        writeln!(f, "Purchase order: {}", or_dash(&info.purchase_order))?;
        writeln!(f, "Project: {}", or_dash(&info.project_name))?;
        writeln!(f, "Contractor: {}", or_dash(&info.contractor))?;
        writeln!(f, "Location: {}", or_dash(&info.location))?;
        let scopes: Vec<&str> = info.job_scopes.iter().map(|scope| scope.label()).collect();
        writeln!(f, "Job scopes: {}", or_dash(&scopes.join(", ")))?;
        if let (Some(start), Some(end)) = (info.start_date, info.completion_date) {
            writeln!(f, "Work period: {start} to {end}")?;
        }

        if let Some(item) = &state.work_line_item {
            let quantity = item
                .quantity
                .map(|quantity| format!("{quantity} {}", item.unit))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "Line item: {} {} ({})",
                or_dash(&item.line_item),
                item.description,
                quantity.trim()
            )?;
        }

        if let Some(log) = &state.work_log {
            writeln!(f, "Work log entries: {}", log.entries.len())?;
            for entry in &log.entries {
                writeln!(
                    f,
                    "  {} {} (manpower {})",
                    entry.date, entry.activity, entry.manpower
                )?;
            }
        }

        writeln!(f, "Documents:")?;
        let documents = self.matrix.required_documents(&info.job_scopes);
        if documents.is_empty() {
            writeln!(f, "  none requested")?;
        }
        for document in documents {
            let files = state.uploaded_documents.files(&document.id);
            let marker = if document.required { "required" } else { "optional" };
            let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
            writeln!(
                f,
                "  [{}] {} ({marker}): {}",
                if files.is_empty() { " " } else { "x" },
                document.name,
                if names.is_empty() {
                    "not uploaded".to_string()
                } else {
                    names.join(", ")
                }
            )?;
        }

        if state.kind.has_step(FormStep::LocationImages) {
            writeln!(f, "Location images:")?;
            for stage in ImageStage::ALL {
                let image = state.location_images.stage(stage);
                let file = image
                    .file
                    .as_ref()
                    .map(|file| file.name.as_str())
                    .unwrap_or("missing");
                write!(f, "  {}: {file}", stage.label())?;
                if let Some(gps) = &image.gps {
                    write!(f, " @ {gps}")?;
                }
                if let Some(captured_at) = image.captured_at {
                    write!(f, " ({})", captured_at.format("%Y-%m-%d %H:%M"))?;
                }
                writeln!(f)?;
            }
        }

        if let Some(safety) = &state.safety_declaration {
            writeln!(
                f,
                "Safety: PPE {}, permit to work {}, site cleared {}",
                yes_no(safety.ppe_worn),
                yes_no(safety.permit_to_work),
                yes_no(safety.site_cleared)
            )?;
        }

        let signature = &state.signature;
        writeln!(
            f,
            "Signed by: {} ({})",
            or_dash(&signature.name),
            or_dash(&signature.position)
        )?;
        if let Some(date) = signature.date {
            writeln!(f, "Signed on: {date}")?;
        }
        if !signature.remarks.trim().is_empty() {
            writeln!(f, "Remarks: {}", signature.remarks.trim())?;
        }

        let report =
            validate_required_documents(self.matrix, &info.job_scopes, &state.uploaded_documents);
        if report.is_valid {
            write!(f, "Required documents complete")
        } else {
            write!(
                f,
                "Outstanding documents: {}",
                report.missing_documents.join(", ")
            )
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
