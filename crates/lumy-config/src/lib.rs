//! Configuration system for the Lumy middleware.
//!
//! Provides TOML-based configuration with:
//! - Server settings (`[server]`)
//! - Workflow catalog directories and the start-up workflow (`[workflows]`)
//! - Backend selection (`[backend]`)
//! - Logging settings (`[logging]`)
//! - Config file layering (user config dir + project-local `lumy.toml`)

pub mod discovery;
pub mod error;
pub mod paths;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use paths::{log_dir, user_workflow_dir};
pub use types::*;
