//! Implementation of the `coderefine config` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::{CONFIG_DIR, ENV_PREFIX};

/// Arguments for `coderefine config`
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Project directory holding the .coderefine config directory
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
}

/// Effective configuration and the files it was loaded from
#[derive(Debug, serde::Serialize)]
pub struct ConfigOutput {
    /// Config files that exist and were layered in, lowest precedence first
    pub sources: Vec<String>,
    /// Merged configuration
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.sources.is_empty() {
            lines.push("Sources: defaults only".to_string());
        } else {
            lines.push("Sources:".to_string());
            lines.push("  - defaults".to_string());
            for source in &self.sources {
                lines.push(format!("  - {source}"));
            }
        }
        lines.push(format!("  - {ENV_PREFIX}* environment variables"));
        lines.push(String::new());
        lines.push(
            serde_yaml::to_string(&self.config)
                .unwrap_or_else(|e| format!("<failed to render config: {e}>")),
        );
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn existing_sources(project_dir: &Path, explicit: Option<&Path>) -> Vec<String> {
    let config_dir = project_dir.join(CONFIG_DIR);
    [
        config_dir.join("config.yaml"),
        config_dir.join("local.yaml"),
    ]
    .into_iter()
    .chain(explicit.map(Path::to_path_buf))
    .filter(|path| path.exists())
    .map(|path| path.display().to_string())
    .collect()
}

/// Print the effective configuration.
pub async fn execute(args: ConfigArgs, json_mode: bool, explicit: Option<&Path>) -> Result<()> {
    let project_dir = super::project_root(args.project_dir.as_deref())?;
    let config =
        super::load_config(&project_dir, explicit).context("Effective configuration is invalid")?;

    let output_data = ConfigOutput {
        sources: existing_sources(&project_dir, explicit),
        config,
    };
    output(&output_data, json_mode);
    Ok(())
}
