//! Collaborator adapters
//!
//! Concrete implementations of the domain ports:
//! - Command-backed quality analyzer, critic, transformer and optimizer
//! - Command-backed static tools driven by the static analysis dispatcher
//! - Built-in passthrough critic and no-op optimizer

pub mod command;
pub mod parsing;
pub mod tool;

use std::sync::Arc;

pub use command::{
    CommandCritic, CommandOptimizer, CommandQualityAnalyzer, CommandRunner, CommandTransformer,
    Credential, NoOptimizer, PassthroughCritic,
};
pub use parsing::{extract_code_block, extract_json_payload};
pub use tool::CommandTool;

use crate::domain::errors::ConfigError;
use crate::domain::models::{Config, StaticToolConfig};
use crate::domain::ports::{Critic, OptimizationSuggester, StaticTool};
use crate::services::orchestrator::Collaborators;
use crate::services::static_dispatcher::StaticAnalysisDispatcher;

/// Build the collaborator set described by the configuration.
///
/// The quality analyzer and transformer are required. Without a critic the
/// findings pass through unchanged; without an optimizer the optimization
/// pass never suggests anything.
pub fn from_config(config: &Config, api_key: Option<String>) -> Result<Collaborators, ConfigError> {
    let credential = Credential::new(config.credentials.api_key_env.clone(), api_key);
    let commands = &config.collaborators;

    let quality = commands
        .quality
        .clone()
        .ok_or_else(|| ConfigError::MissingCollaborator("collaborators.quality".to_string()))?;
    let transformer = commands
        .transformer
        .clone()
        .ok_or_else(|| ConfigError::MissingCollaborator("collaborators.transformer".to_string()))?;

    let critic: Arc<dyn Critic> = match commands.critic.clone() {
        Some(spec) => Arc::new(CommandCritic::new(spec, credential.clone())),
        None => Arc::new(PassthroughCritic),
    };
    let optimizer: Arc<dyn OptimizationSuggester> = match commands.optimizer.clone() {
        Some(spec) => Arc::new(CommandOptimizer::new(spec, credential.clone())),
        None => Arc::new(NoOptimizer),
    };

    let tools: Vec<Arc<dyn StaticTool>> = config
        .static_analysis
        .tools
        .iter()
        .filter(|tool| tool_available(tool))
        .map(|tool| Arc::new(CommandTool::new(tool)) as Arc<dyn StaticTool>)
        .collect();

    tracing::debug!(
        critic = commands.critic.is_some(),
        optimizer = commands.optimizer.is_some(),
        static_tools = tools.len(),
        "Collaborators configured"
    );

    Ok(Collaborators {
        quality: Arc::new(CommandQualityAnalyzer::new(quality, credential.clone())),
        static_analyzer: Arc::new(StaticAnalysisDispatcher::new(
            tools,
            &config.static_analysis,
        )),
        critic,
        transformer: Arc::new(CommandTransformer::new(transformer, credential)),
        optimizer,
    })
}

/// Whether a static tool's program can be found.
fn tool_available(tool: &StaticToolConfig) -> bool {
    match which::which(&tool.program) {
        Ok(path) => {
            tracing::debug!(tool = %tool.name, path = %path.display(), "Static tool found");
            true
        }
        Err(e) => {
            tracing::debug!(
                tool = %tool.name,
                program = %tool.program,
                error = %e,
                "Static tool not installed, skipping"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CommandSpec;

    #[test]
    fn quality_command_is_required() {
        let mut config = Config::default();
        config.collaborators.transformer = Some(CommandSpec::new("fix", vec![]));
        assert_eq!(
            from_config(&config, None).err(),
            Some(ConfigError::MissingCollaborator(
                "collaborators.quality".to_string()
            ))
        );
    }

    #[test]
    fn transformer_command_is_required() {
        let mut config = Config::default();
        config.collaborators.quality = Some(CommandSpec::new("review", vec![]));
        assert!(matches!(
            from_config(&config, None),
            Err(ConfigError::MissingCollaborator(_))
        ));
    }

    #[test]
    fn optional_collaborators_default() {
        let mut config = Config::default();
        config.collaborators.quality = Some(CommandSpec::new("review", vec![]));
        config.collaborators.transformer = Some(CommandSpec::new("fix", vec![]));
        assert!(from_config(&config, Some("key".to_string())).is_ok());
    }

    #[test]
    fn missing_static_tools_are_skipped() {
        let tool = StaticToolConfig {
            name: "ghost".to_string(),
            program: "coderefine-no-such-linter".to_string(),
            args: vec![],
            languages: vec![],
        };
        assert!(!tool_available(&tool));
    }

    #[cfg(unix)]
    #[test]
    fn installed_static_tools_are_kept() {
        let tool = StaticToolConfig {
            name: "shell".to_string(),
            program: "sh".to_string(),
            args: vec![],
            languages: vec![],
        };
        assert!(tool_available(&tool));
    }
}
