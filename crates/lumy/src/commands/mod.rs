//! CLI command handlers.

pub mod check;
pub mod start;
pub mod workflows;

use lumy_config::LumyConfig;
use lumy_pipeline::WorkflowCatalog;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration (file layers, before CLI overrides).
    pub config: LumyConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Catalog over bundled, configured and user workflow directories.
    pub fn catalog(&self) -> WorkflowCatalog {
        let workflows = self.config.workflows();
        WorkflowCatalog::from_dirs(
            workflows.bundled,
            workflows.dirs,
            lumy_config::user_workflow_dir(),
        )
    }
}
