use super::{DocumentRequirement, JobScope, ScopeRequirements};

fn document(
    id: &str,
    name: &str,
    required: bool,
    description: Option<&str>,
) -> DocumentRequirement {
    DocumentRequirement {
        id: id.to_string(),
        name: name.to_string(),
        required,
        description: description.map(str::to_string),
    }
}

pub(super) fn standard_scope_requirements() -> Vec<ScopeRequirements> {
    vec![
        ScopeRequirements {
            scope: JobScope::new("Pencawang"),
            documents: vec![
                document(
                    "single-line-diagram",
                    "Single Line Diagram",
                    true,
                    Some("Approved SLD showing the substation arrangement as installed."),
                ),
                document(
                    "equipment-test-report",
                    "Equipment Test Report",
                    false,
                    Some("Commissioning results for switchgear and transformers."),
                ),
                document(
                    "earthing-test-result",
                    "Earthing Test Result",
                    false,
                    None,
                ),
            ],
        },
        ScopeRequirements {
            scope: JobScope::new("Civil"),
            documents: vec![
                document(
                    "civil-drawing",
                    "Civil Works Drawing",
                    true,
                    Some("Plinth, trench and building works endorsed by the site supervisor."),
                ),
                document(
                    "as-built-drawing",
                    "As-Built Drawing",
                    true,
                    None,
                ),
                document(
                    "material-delivery-order",
                    "Material Delivery Order",
                    false,
                    None,
                ),
            ],
        },
        ScopeRequirements {
            scope: JobScope::new("HDD"),
            documents: vec![
                document(
                    "hdd-bore-profile",
                    "HDD Bore Profile",
                    true,
                    Some("Drilled profile with entry, exit and depth readings."),
                ),
                document(
                    "as-built-drawing",
                    "As-Built Drawing",
                    true,
                    None,
                ),
                document(
                    "permit-to-dig",
                    "Permit to Dig",
                    true,
                    Some("Local authority and utility clearance for excavation."),
                ),
            ],
        },
        ScopeRequirements {
            scope: JobScope::new("Cable Laying"),
            documents: vec![
                document(
                    "cable-route-plan",
                    "Cable Route Plan",
                    true,
                    None,
                ),
                document(
                    "cable-test-report",
                    "Cable Insulation Test Report",
                    true,
                    Some("Insulation resistance and VLF test sheets for every drum laid."),
                ),
                document(
                    "permit-to-dig",
                    "Permit to Dig",
                    true,
                    Some("Local authority and utility clearance for excavation."),
                ),
            ],
        },
        ScopeRequirements {
            scope: JobScope::new("Overhead Line"),
            documents: vec![
                document(
                    "pole-schedule",
                    "Pole Schedule",
                    true,
                    None,
                ),
                document(
                    "line-survey-plan",
                    "Line Survey Plan",
                    false,
                    None,
                ),
            ],
        },
    ]
}
