//! CLI command implementations.

pub mod config;
pub mod review;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Resolve the project directory, defaulting to the current directory.
pub(crate) fn project_root(project_dir: Option<&Path>) -> Result<PathBuf> {
    match project_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Load the layered configuration for a project.
pub(crate) fn load_config(project_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    ConfigLoader::load_with(project_dir, explicit)
        .with_context(|| format!("Failed to load configuration for {}", project_dir.display()))
}
