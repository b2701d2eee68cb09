//! Check command - validate a workflow file offline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use lumy_pipeline::{BuiltinModule, build_reverse_io_mappings, load_workflow_file};
use lumy_types::LumyWorkflow;
use serde_json::json;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Workflow file (YAML or JSON)
    pub path: PathBuf,
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let workflow = load_workflow_file(&args.path)
        .with_context(|| format!("Failed to read workflow {}", args.path.display()))?;
    workflow
        .validate()
        .with_context(|| format!("Invalid workflow {}", args.path.display()))?;

    let unknown = unknown_modules(&workflow);
    let reverse = build_reverse_io_mappings(&workflow);

    // Sorted so output is stable across runs.
    let bindings: BTreeMap<_, _> = reverse
        .iter()
        .map(|(step, io)| {
            let inputs: BTreeMap<_, _> = io.inputs.iter().collect();
            let outputs: BTreeMap<_, _> = io.outputs.iter().collect();
            (step, json!({"inputs": inputs, "outputs": outputs}))
        })
        .collect();

    if ctx.json_output {
        let report = json!({
            "name": workflow.meta.label,
            "pipeline": workflow.processing.workflow.name,
            "pages": workflow.ui.pages.iter().map(|p| &p.id).collect::<Vec<_>>(),
            "unknownModules": unknown,
            "bindings": bindings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();
    let yellow = Style::new().yellow();

    println!(
        "{} {} {}",
        green.apply_to("✓"),
        style(&workflow.meta.label).bold(),
        dim.apply_to(format!("(pipeline {})", workflow.processing.workflow.name))
    );

    for page in &workflow.ui.pages {
        println!("  page {}", style(&page.id).cyan());
        let Some(mapping) = &page.mapping else {
            continue;
        };
        for (arrow, bindings) in [("<-", &mapping.inputs), ("->", &mapping.outputs)] {
            for binding in bindings {
                println!(
                    "    {} {} {}.{}",
                    binding.page_io_id,
                    arrow,
                    binding.engine_step_id(),
                    binding.workflow_io_id
                );
            }
        }
    }

    if ctx.verbose {
        println!("{}", style("Reverse bindings").bold());
        for (step, io) in &bindings {
            println!("  {} {}", style(step).cyan(), dim.apply_to(io.to_string()));
        }
    }

    for module in &unknown {
        println!(
            "{} module '{}' is not built in; the local backend cannot run it",
            yellow.apply_to("!"),
            module
        );
    }
    Ok(())
}

/// Step modules the local engine does not provide.
fn unknown_modules(workflow: &LumyWorkflow) -> Vec<String> {
    let mut unknown: Vec<String> = workflow
        .processing
        .workflow
        .steps
        .iter()
        .filter(|step| BuiltinModule::from_name(&step.module).is_none())
        .map(|step| step.module.clone())
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}
