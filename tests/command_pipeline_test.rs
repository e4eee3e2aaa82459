//! End-to-end review runs through the command adapters.
//!
//! The collaborators are small `sh` scripts, so these tests need a Unix shell.

#![cfg(unix)]

mod common;

use std::path::Path;

use coderefine::domain::models::{CommandSpec, Config, IssueSource, StaticToolConfig, StopReason};
use coderefine::infrastructure::collaborators;
use coderefine::infrastructure::config::{ConfigLoader, CONFIG_DIR};
use coderefine::infrastructure::report::{ReportStore, RunReport};
use coderefine::services::RefinementOrchestrator;
use coderefine::Language;

use common::python_context;

const KEY_ENV: &str = "CODEREFINE_TEST_PIPELINE_KEY";

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()])
}

/// Quality reviewer that approves `x = 2` and insists the key is exported.
const QUALITY_SCRIPT: &str = r#"[ "$CODEREFINE_TEST_PIPELINE_KEY" = "sk-test" ] || exit 3
if grep -q "x = 2"; then
  echo '{"score": 96, "issues": []}'
else
  printf 'Review:\n```json\n{"score": 55, "issues": [{"line": 1, "issue": "Magic number", "severity": "low"}]}\n```\n'
fi"#;

const TRANSFORMER_SCRIPT: &str = r#"cat > /dev/null
printf 'Here is the fix:\n```python\nx = 2\n```\n'"#;

fn pipeline_config(project_dir: &Path) -> Config {
    common::write_file(
        &project_dir.join(CONFIG_DIR).join("config.yaml"),
        &format!(
            "analysis:\n  max_iterations: 3\ncredentials:\n  api_key_env: {KEY_ENV}\n  required: true\noptimization:\n  enabled: false\n"
        ),
    );
    let mut config = ConfigLoader::load_with(project_dir, None).unwrap();
    config.collaborators.quality = Some(sh(QUALITY_SCRIPT));
    config.collaborators.transformer = Some(sh(TRANSFORMER_SCRIPT));
    config.static_analysis.tools = vec![StaticToolConfig {
        name: "magic".to_string(),
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "echo \"$0:1: warning: magic number\"".to_string(),
            "{file}".to_string(),
        ],
        languages: vec![Language::Python],
    }];
    config
}

#[test]
fn review_through_commands_reaches_clean_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = pipeline_config(dir.path());
    assert_eq!(config.analysis.max_iterations, 3);

    let outcome = temp_env::with_var(KEY_ENV, Some("sk-test"), || {
        let api_key = ConfigLoader::resolve_credential(&config.credentials).unwrap();
        let collaborators = collaborators::from_config(&config, api_key).unwrap();
        tokio_test::block_on(
            RefinementOrchestrator::new(config.clone(), collaborators).run(
                "x = 1\n",
                python_context(),
                vec![],
            ),
        )
    })
    .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::NoIssuesRemaining);
    assert_eq!(outcome.best_code, "x = 2");
    assert!((outcome.best_score - 96.0).abs() < f64::EPSILON);

    let round = &outcome.history.rounds()[0];
    // The reviewer and the linter agreed on one finding.
    assert_eq!(round.issues_fixed, 1);
    assert!(!round.transformer_fallback);
    assert!(outcome
        .history
        .audit()
        .iter()
        .any(|e| e.message.contains("1 merged")));
}

#[test]
fn missing_key_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = pipeline_config(dir.path());

    temp_env::with_var_unset(KEY_ENV, || {
        assert!(ConfigLoader::resolve_credential(&config.credentials).is_err());
        let collaborators = collaborators::from_config(&config, None).unwrap();
        let result = tokio_test::block_on(
            RefinementOrchestrator::new(config.clone(), collaborators).run(
                "x = 1\n",
                python_context(),
                vec![],
            ),
        );
        assert!(result.is_err());
    });
}

#[test]
fn report_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = pipeline_config(dir.path());
    config.credentials.required = false;
    // Without the key the quality script fails and the run degrades.
    let collaborators = collaborators::from_config(&config, None).unwrap();

    let outcome = temp_env::with_var_unset(KEY_ENV, || {
        tokio_test::block_on(
            RefinementOrchestrator::new(config.clone(), collaborators).run(
                "x = 1\n",
                python_context(),
                vec![],
            ),
        )
    })
    .unwrap();

    // Only the linter's finding survives; it is never fixed because the
    // reviewer keeps failing, so every round re-reports it.
    assert!(outcome
        .history
        .rounds()
        .iter()
        .all(|r| r.score.abs() < f64::EPSILON));
    assert!(outcome
        .best_issues
        .iter()
        .all(|i| matches!(i.source, IssueSource::Tool(_))));

    let store = ReportStore::new(dir.path().join("reports").join("run.json"));
    let report = RunReport::new(outcome, Some("app.py".to_string()));
    tokio_test::block_on(store.save(&report)).unwrap();
    let loaded = tokio_test::block_on(store.load()).unwrap();
    assert_eq!(loaded, report);
}
