//! Command-line interface.

pub mod commands;
pub mod output;
pub mod table;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::{output, truncate, CommandOutput};

/// Command-line interface for coderefine
#[derive(Parser)]
#[command(name = "coderefine")]
#[command(about = "Iterative multi-analyzer code refinement", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra configuration file, layered over the project config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Top-level subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Review and iteratively refine a source file
    Review(commands::review::ReviewArgs),

    /// Print the effective configuration
    Config(commands::config::ConfigArgs),
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| err.to_string())
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
