//! Human-readable and JSON output for plans and reports

use console::Style;

use regkit::error::Result;
use regkit::materializer::MaterializeOutcome;
use regkit::planner::{ComponentStatus, InstallPlan, InstallReport};
use regkit::template::ValueSource;

fn source_label(source: ValueSource) -> &'static str {
    match source {
        ValueSource::Override => "--set",
        ValueSource::Project => "regkit.yaml",
        ValueSource::ManifestDefault => "default",
        ValueSource::Prompt => "prompt",
    }
}

fn heading(text: &str) {
    println!("{}", Style::new().bold().green().apply_to(text));
}

/// Print the dry-run view of a plan
pub fn print_plan(plan: &InstallPlan) {
    heading(&format!(
        "Install plan for {} ({} components, {} files)",
        plan.root,
        plan.ordered_components.len(),
        plan.file_operations.len()
    ));
    println!();

    heading("Components:");
    for (i, name) in plan.ordered_components.iter().enumerate() {
        println!("  {}. {}", i + 1, Style::new().bold().yellow().apply_to(name));
        for op in plan.operations_for(name) {
            println!(
                "       {} {}",
                op.relative_destination,
                Style::new().dim().apply_to(format!("[{}]", op.policy))
            );
        }
    }

    if !plan.omitted_files.is_empty() {
        println!();
        heading("Omitted optional files:");
        for omitted in &plan.omitted_files {
            println!(
                "  {}:{} {}",
                omitted.component,
                omitted.source_path,
                Style::new().dim().apply_to(format!("({})", omitted.reason))
            );
        }
    }

    if !plan.variables.is_empty() {
        println!();
        heading("Template variables:");
        for value in plan.variables.iter() {
            println!(
                "  {} = {} {}",
                Style::new().bold().apply_to(&value.variable_name),
                value.raw_value,
                Style::new().dim().apply_to(format!("({})", source_label(value.source)))
            );
        }
    }

    print_aggregates(plan);

    println!();
    println!(
        "{} {}",
        Style::new().bold().apply_to("Fingerprint:"),
        plan.fingerprint()
    );
}

fn print_aggregates(plan: &InstallPlan) {
    let aggregates = &plan.aggregates;

    if !aggregates.runtime_dependencies.is_empty() {
        println!();
        heading("Runtime dependencies:");
        for dep in &aggregates.runtime_dependencies {
            println!("  {} {}", dep.name, dep.version);
        }
        for conflict in &aggregates.runtime_dependency_conflicts {
            let declarations: Vec<String> = conflict
                .declarations
                .iter()
                .map(|d| format!("{} wants {}", d.component, d.version))
                .collect();
            println!(
                "  {} {}: {} (using {})",
                Style::new().yellow().apply_to("note:"),
                conflict.name,
                declarations.join(", "),
                conflict.chosen
            );
        }
    }

    if !aggregates.environment_variables.is_empty() {
        println!();
        heading("Environment variables:");
        for var in &aggregates.environment_variables {
            let required = if var.required { "required" } else { "optional" };
            match &var.description {
                Some(description) => println!("  {} ({required}) - {description}", var.name),
                None => println!("  {} ({required})", var.name),
            }
        }
    }
}

/// Print the plan as JSON, including its fingerprint
pub fn print_plan_json(plan: &InstallPlan) -> Result<()> {
    let mut value = serde_json::to_value(plan)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("fingerprint".to_string(), plan.fingerprint().into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Print the outcome of an install
pub fn print_report(report: &InstallReport) {
    println!();
    for component in &report.components {
        let (label, style) = match &component.status {
            ComponentStatus::Installed => ("installed".to_string(), Style::new().green()),
            ComponentStatus::Skipped => ("unchanged".to_string(), Style::new().dim()),
            ComponentStatus::Failed { reason } => (format!("failed: {reason}"), Style::new().red()),
            ComponentStatus::NotAttempted {
                blocked_by: Some(dep),
            } => (format!("not attempted ({dep} failed)"), Style::new().yellow()),
            ComponentStatus::NotAttempted { blocked_by: None } => {
                ("not attempted".to_string(), Style::new().yellow())
            }
        };
        println!(
            "  {} {}",
            Style::new().bold().apply_to(&component.name),
            style.apply_to(label)
        );

        for file in &component.files {
            let marker = match file.outcome {
                Some(MaterializeOutcome::Written) => "+",
                Some(MaterializeOutcome::Skipped) => "=",
                Some(MaterializeOutcome::Conflict) => "!",
                None => continue,
            };
            println!("      {marker} {}", file.destination);
        }
    }

    let completed = report.completed().count();
    println!();
    if report.is_success() {
        println!(
            "{}",
            Style::new()
                .bold()
                .green()
                .apply_to(format!("Installed {completed} component(s)."))
        );
        let required: Vec<&str> = report
            .aggregates
            .environment_variables
            .iter()
            .filter(|v| v.required)
            .map(|v| v.name.as_str())
            .collect();
        if !required.is_empty() {
            println!("Set these environment variables: {}", required.join(", "));
        }
    } else {
        let incomplete: Vec<&str> = report.incomplete().map(|c| c.name.as_str()).collect();
        println!(
            "{}",
            Style::new().bold().red().apply_to(format!(
                "{completed} component(s) completed; not installed: {}",
                incomplete.join(", ")
            ))
        );
    }
}
