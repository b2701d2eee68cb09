//! Workflow catalog: workflow files found on disk.
//!
//! Directories are scanned in the order they were added. A typical catalog
//! looks like:
//!
//! ```text
//! <bundled dir>/          # shipped with the installation, listed first
//!   logic_xor.yml
//! <configured dirs>/      # [workflows].dirs
//! <user dir>/             # $LUMY_WORKFLOW_DIR or <data dir>/lumy/workflows
//!   my_analysis.json
//! ```
//!
//! Files ending in `.yml`/`.yaml` are parsed as YAML, `.json` as JSON.
//! Unparsable files are logged and skipped when listing.

use std::path::{Path, PathBuf};

use lumy_types::{LumyWorkflow, WorkflowListItem};
use tracing::{debug, warn};

use crate::error::{BackendError, Result};

/// Read and parse a workflow file, choosing the format by extension.
pub fn load_workflow_file(path: &Path) -> Result<LumyWorkflow> {
    if !path.is_file() {
        return Err(BackendError::WorkflowNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| BackendError::io(path, e))?;
    parse_workflow(path, &content)
}

/// Parse workflow text, choosing the format by the path's extension.
pub fn parse_workflow(path: &Path, content: &str) -> Result<LumyWorkflow> {
    if is_yaml(path) {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}

fn is_workflow_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml" | "yaml" | "json")
        )
}

/// Ordered set of workflow directories.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    dirs: Vec<PathBuf>,
}

impl WorkflowCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog over bundled, configured and user directories, in that order.
    pub fn from_dirs(
        bundled: Option<PathBuf>,
        configured: impl IntoIterator<Item = PathBuf>,
        user: Option<PathBuf>,
    ) -> Self {
        let mut catalog = Self::new();
        for dir in bundled.into_iter().chain(configured).chain(user) {
            catalog.add_dir(dir);
        }
        catalog
    }

    /// Append a directory; repeated directories are ignored.
    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    /// Directories in scan order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// List every parsable workflow.
    ///
    /// Files inside one directory are listed by file name. Missing
    /// directories are skipped.
    pub fn list(&self, include_body: bool) -> Vec<WorkflowListItem> {
        let mut items = Vec::new();

        for dir in &self.dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Skipping workflow directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| is_workflow_file(path))
                .collect();
            paths.sort();

            for path in paths {
                match load_workflow_file(&path) {
                    Ok(workflow) => items.push(WorkflowListItem {
                        uri: path.display().to_string(),
                        name: workflow.meta.label.clone(),
                        body: include_body.then_some(workflow),
                    }),
                    Err(e) => warn!("Failed to parse workflow {}: {}", path.display(), e),
                }
            }
        }

        items
    }

    /// Uri of the catalog workflow whose body equals `workflow`.
    pub fn find_uri(&self, workflow: &LumyWorkflow) -> Option<String> {
        self.list(true)
            .into_iter()
            .find(|item| item.body.as_ref() == Some(workflow))
            .map(|item| item.uri)
    }
}
