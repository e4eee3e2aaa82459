use clap::Parser;
use coderefine::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_parse_review_minimal() {
    let cli = Cli::try_parse_from(vec!["coderefine", "review", "app.py"]).unwrap();

    assert!(!cli.json);
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Review(args) => {
            assert_eq!(args.file, PathBuf::from("app.py"));
            assert!(args.max_iterations.is_none());
            assert!(args.min_score.is_none());
            assert!(args.output.is_none());
            assert!(args.report.is_none());
        }
        Commands::Config(_) => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_review_with_overrides() {
    let cli = Cli::try_parse_from(vec![
        "coderefine",
        "review",
        "src/app.py",
        "--max-iterations",
        "3",
        "--min-score",
        "85.5",
        "--output",
        "fixed.py",
        "--report",
        "reports/run.json",
        "--feedback",
        "feedback.json",
        "--context",
        "project.json",
        "--project-dir",
        "/work/project",
    ])
    .unwrap();

    match cli.command {
        Commands::Review(args) => {
            assert_eq!(args.max_iterations, Some(3));
            assert_eq!(args.min_score, Some(85.5));
            assert_eq!(args.output, Some(PathBuf::from("fixed.py")));
            assert_eq!(args.report, Some(PathBuf::from("reports/run.json")));
            assert_eq!(args.feedback, Some(PathBuf::from("feedback.json")));
            assert_eq!(args.context, Some(PathBuf::from("project.json")));
            assert_eq!(args.project_dir, Some(PathBuf::from("/work/project")));
        }
        Commands::Config(_) => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(vec![
        "coderefine",
        "review",
        "app.py",
        "--json",
        "--config",
        "ci.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
}

#[test]
fn test_parse_config_command() {
    let cli = Cli::try_parse_from(vec!["coderefine", "-j", "config"]).unwrap();

    assert!(cli.json);
    assert!(matches!(cli.command, Commands::Config(_)));
}

#[test]
fn test_review_requires_file() {
    assert!(Cli::try_parse_from(vec!["coderefine", "review"]).is_err());
}

#[test]
fn test_rejects_non_numeric_iterations() {
    let result = Cli::try_parse_from(vec![
        "coderefine",
        "review",
        "app.py",
        "--max-iterations",
        "many",
    ]);
    assert!(result.is_err());
}
