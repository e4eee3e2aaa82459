//! coderefine CLI entry point.

use clap::Parser;

use coderefine::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Review(args) => {
            coderefine::cli::commands::review::execute(args, cli.json, config_path).await
        }
        Commands::Config(args) => {
            coderefine::cli::commands::config::execute(args, cli.json, config_path).await
        }
    };

    if let Err(err) = result {
        coderefine::cli::handle_error(err, cli.json);
    }
}
