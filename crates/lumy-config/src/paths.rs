//! Well-known directories.
//!
//! # Environment Variables
//!
//! - `LUMY_WORKFLOW_DIR` - Override the user workflow directory

use std::path::PathBuf;

use crate::xdg_config_dir;

/// Environment variable overriding the user workflow directory.
const WORKFLOW_DIR_ENV: &str = "LUMY_WORKFLOW_DIR";

/// Application name for platform directory resolution.
const APP_NAME: &str = "lumy";

/// Directory where the user keeps their own workflow files.
///
/// Resolution order:
/// 1. `LUMY_WORKFLOW_DIR` environment variable
/// 2. `<platform data dir>/lumy/workflows`
pub fn user_workflow_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(WORKFLOW_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::data_dir().map(|d| d.join(APP_NAME).join("workflows"))
}

/// Directory for rolling log files: `<config dir>/logs`, or `./logs`.
pub fn log_dir() -> PathBuf {
    xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
