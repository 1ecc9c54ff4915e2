use crate::infra::{parse_date, InMemorySubmissionHandlers};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use workorder_forms::config::AppConfig;
use workorder_forms::error::AppError;
use workorder_forms::workflows::forms::{
    FormController, FormKind, FormUpdate, ImageStage, ProjectInfoPatch, SignaturePatch,
    SubmissionHandlers,
};
use workorder_forms::workflows::requirements::{JobScope, RequirementMatrix};
use workorder_forms::workflows::validation::UploadedFile;

#[derive(Args, Debug, Default)]
pub(crate) struct RequirementsArgs {
    /// Job scope to include; repeat for several. Omit to print the whole table.
    #[arg(long = "scope")]
    pub(crate) scopes: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Purchase order number printed on the submission
    #[arg(long, default_value = "PO-2025-0142")]
    pub(crate) purchase_order: String,
    /// Job scope to select; repeat for several
    #[arg(long = "scope", default_values = ["Pencawang", "Civil"])]
    pub(crate) scopes: Vec<String>,
    /// Attach a local file to a requirement, as REQUIREMENT_ID=PATH
    #[arg(long = "attach", value_parser = parse_attachment)]
    pub(crate) attachments: Vec<(String, PathBuf)>,
    /// Signature date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

fn parse_attachment(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((id, path)) if !id.trim().is_empty() && !path.trim().is_empty() => {
            Ok((id.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected REQUIREMENT_ID=PATH, got '{raw}'")),
    }
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let matrix = config.forms.requirement_matrix()?;

    if args.scopes.is_empty() {
        for entry in matrix.entries() {
            println!("{}", entry.scope);
            for document in &entry.documents {
                println!("  {}", describe_document(document.required, &document.name, &document.id));
            }
        }
        return Ok(());
    }

    let scopes: Vec<JobScope> = args.scopes.iter().map(JobScope::new).collect();
    let unknown: Vec<&JobScope> = scopes
        .iter()
        .filter(|scope| matrix.scopes().all(|known| known != *scope))
        .collect();
    for scope in unknown {
        println!("Unknown job scope '{}' contributes no documents", scope);
    }

    let documents = matrix.required_documents(&scopes);
    if documents.is_empty() {
        println!("No supporting documents required");
    }
    for document in documents {
        println!("{}", describe_document(document.required, &document.name, &document.id));
    }
    Ok(())
}

fn describe_document(required: bool, name: &str, id: &str) -> String {
    let marker = if required { "required" } else { "optional" };
    format!("- {name} [{id}] ({marker})")
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        purchase_order,
        scopes,
        attachments,
        date,
    } = args;
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let config = AppConfig::load()?;
    let matrix = Arc::new(config.forms.requirement_matrix()?);
    let handlers = Arc::new(InMemorySubmissionHandlers::new(matrix.clone()));
    let mut controller = FormController::new(
        FormKind::Lks,
        matrix.clone(),
        config.forms.upload_policy(),
        handlers.clone(),
    );

    println!("{} demo", FormKind::Lks.label());
    print_step(&controller);
    controller.update(FormUpdate::ProjectInfo(ProjectInfoPatch {
        purchase_order: Some(purchase_order),
        project_name: Some("Feeder upgrade, Jalan Kebun".to_string()),
        contractor: Some("Sinar Jaya Engineering".to_string()),
        location: Some("Shah Alam, Selangor".to_string()),
        job_scopes: Some(scopes.into_iter().map(JobScope::from).collect()),
        start_date: Some(date),
        completion_date: Some(date),
    }))?;

    controller.next();
    print_step(&controller);
    let report = controller.validate();
    println!(
        "  Missing before upload: {}",
        display_list(&report.missing_documents)
    );

    let mut attachments: BTreeMap<String, PathBuf> = attachments.into_iter().collect();
    let required: Vec<(String, String)> = controller
        .required_documents()
        .into_iter()
        .filter(|document| document.required)
        .map(|document| (document.id.clone(), document.name.clone()))
        .collect();

    if let Some((first_id, _)) = required.first() {
        let oversized =
            UploadedFile::descriptor("site-survey-scan.pdf", "application/pdf", 15 * 1024 * 1024);
        let outcome = controller.attach_documents(first_id, vec![oversized])?;
        for message in outcome.messages() {
            println!("  Rejected: {message}");
        }
    }

    for (id, name) in &required {
        let file = match attachments.remove(id) {
            Some(path) => read_attachment(&path)?,
            None => placeholder_file(&format!("{id}.pdf")),
        };
        let outcome = controller.attach_documents(id, vec![file])?;
        for file in &outcome.accepted {
            println!("  {name}: {} ({} bytes)", file.name, file.size);
        }
        for message in outcome.messages() {
            println!("  Rejected: {message}");
        }
    }
    for (id, path) in attachments {
        let outcome = controller.attach_documents(&id, vec![read_attachment(&path)?])?;
        println!("  Extra upload for {id}: {} accepted", outcome.accepted.len());
    }

    controller.next();
    print_step(&controller);
    for stage in ImageStage::ALL {
        let file = placeholder_file(&format!("{}.jpg", stage.label().to_ascii_lowercase()));
        let captured_at = date.and_hms_opt(9, 0, 0);
        controller.attach_stage_image(
            stage,
            file,
            captured_at,
            Some("3.0733, 101.5185".to_string()),
        )?;
        println!("  {} photo attached", stage.label());
    }

    controller.next();
    print_step(&controller);
    let readiness = controller.readiness();
    println!(
        "  Outstanding before signing: {}",
        display_list(&readiness.missing_fields)
    );
    controller.update(FormUpdate::Signature(SignaturePatch {
        name: Some("Aisyah Rahman".to_string()),
        position: Some("Site Supervisor".to_string()),
        date: Some(date),
        remarks: Some("Work completed as instructed".to_string()),
        signature_data: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
    }))?;

    controller.save_draft()?;
    controller.export_pdf()?;
    controller.submit()?;

    println!(
        "\nSubmitted {} form(s), {} draft(s) saved",
        handlers.submissions().len(),
        handlers.drafts()
    );
    if let Some(export) = handlers.last_export() {
        println!("\nExported summary\n{export}");
    }
    print_requirement_sources(&matrix, &controller);
    Ok(())
}

fn print_step<H>(controller: &FormController<H>)
where
    H: SubmissionHandlers,
{
    println!(
        "\nStep {}/{}: {}",
        controller.step(),
        controller.step_count(),
        controller.current_step().label()
    );
}

fn print_requirement_sources<H>(matrix: &RequirementMatrix, controller: &FormController<H>)
where
    H: SubmissionHandlers,
{
    let scopes = &controller.state().project_info.job_scopes;
    for entry in matrix
        .entries()
        .iter()
        .filter(|entry| scopes.contains(&entry.scope))
    {
        let ids: Vec<&str> = entry.documents.iter().map(|doc| doc.id.as_str()).collect();
        println!("{} -> {}", entry.scope, ids.join(", "));
    }
}

fn display_list<T: AsRef<str>>(items: &[T]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items
            .iter()
            .map(|item| item.as_ref())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

fn read_attachment(path: &Path) -> Result<UploadedFile, AppError> {
    let content = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(UploadedFile::new(name, media_type.essence_str(), content))
}

fn placeholder_file(name: &str) -> UploadedFile {
    let media_type = mime_guess::from_path(name).first_or_octet_stream();
    UploadedFile::new(
        name,
        media_type.essence_str(),
        format!("placeholder for {name}").into_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attachment_pairs() {
        let (id, path) = parse_attachment("civil-drawing=./drawings/site.pdf").expect("parses");
        assert_eq!(id, "civil-drawing");
        assert_eq!(path, PathBuf::from("./drawings/site.pdf"));
        assert!(parse_attachment("civil-drawing").is_err());
        assert!(parse_attachment("=site.pdf").is_err());
    }

    #[test]
    fn placeholder_media_type_follows_extension() {
        assert_eq!(placeholder_file("before.jpg").media_type, "image/jpeg");
        assert_eq!(placeholder_file("single-line-diagram.pdf").media_type, "application/pdf");
    }

    #[test]
    fn describes_document_requirement_flag() {
        assert_eq!(
            describe_document(false, "Earthing Test Result", "earthing-test-result"),
            "- Earthing Test Result [earthing-test-result] (optional)"
        );
    }
}
