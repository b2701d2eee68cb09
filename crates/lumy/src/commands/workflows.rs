//! Workflows command - list the workflow catalog.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the workflows command.
#[derive(Args, Debug)]
pub struct WorkflowsArgs {
    /// Include each workflow body (JSON output only)
    #[arg(long)]
    pub body: bool,
}

/// Run the workflows command.
pub async fn run(args: WorkflowsArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog();
    let items = catalog.list(args.body && ctx.json_output);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if ctx.verbose {
        for dir in catalog.dirs() {
            println!("{}", dim.apply_to(format!("Scanning {}", dir.display())));
        }
    }

    if items.is_empty() {
        println!("{}", dim.apply_to("No workflows found"));
        return Ok(());
    }

    println!("{}", style("Workflows").bold());
    for item in &items {
        println!("  {}  {}", style(&item.name).cyan(), dim.apply_to(&item.uri));
    }
    Ok(())
}
