//! Project context detection.
//!
//! Looks at the top level of the project directory for the dominant source
//! language and the usual manifest and lint files (`requirements.txt`,
//! `pyproject.toml`, `.eslintrc.json`). The result is forwarded to the
//! quality analyzer. Unreadable or malformed files are logged and skipped.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::models::Language;

const REQUIREMENTS: &str = "requirements.txt";
const PYPROJECT: &str = "pyproject.toml";
const ESLINTRC: &str = ".eslintrc.json";

/// Facts about the project the reviewed file belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectContext {
    /// Most common source language among top-level files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Ecosystems implied by the manifests found
    pub frameworks: Vec<String>,
    /// Declared dependencies, in file order
    pub dependencies: Vec<String>,
    /// Lint and formatter settings keyed by tool
    pub conventions: Map<String, Value>,
}

impl ProjectContext {
    /// Inspect `project_dir`; a missing directory yields an empty context.
    pub async fn detect(project_dir: &Path) -> Self {
        let mut context = Self {
            language: dominant_language(project_dir).await,
            ..Self::default()
        };

        if let Some(raw) = read_optional(&project_dir.join(REQUIREMENTS)).await {
            context.dependencies.extend(parse_requirements(&raw));
            context.add_framework("Python");
        }

        if let Some(raw) = read_optional(&project_dir.join(PYPROJECT)).await {
            match toml::from_str::<toml::Table>(&raw) {
                Ok(pyproject) => context.apply_pyproject(&pyproject),
                Err(e) => {
                    tracing::warn!(file = PYPROJECT, error = %e, "Skipping malformed manifest")
                }
            }
            context.add_framework("Python");
        }

        if let Some(raw) = read_optional(&project_dir.join(ESLINTRC)).await {
            match serde_json::from_str::<Value>(&raw) {
                Ok(eslint) => {
                    let rules = eslint
                        .get("rules")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    context.conventions.insert("eslint".to_string(), rules);
                }
                Err(e) => {
                    tracing::warn!(file = ESLINTRC, error = %e, "Skipping malformed lint config")
                }
            }
            context.add_framework("JavaScript");
        }

        tracing::debug!(
            project = %project_dir.display(),
            language = ?context.language,
            frameworks = ?context.frameworks,
            dependency_count = context.dependencies.len(),
            "Project context detected"
        );
        context
    }

    /// Whether nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.frameworks.is_empty()
            && self.dependencies.is_empty()
            && self.conventions.is_empty()
    }

    /// Combine with an explicit context; explicit keys win.
    ///
    /// A non-object explicit value replaces the detected context entirely.
    pub fn merge_into(self, explicit: Value) -> Value {
        let detected = if self.is_empty() {
            Value::Null
        } else {
            serde_json::to_value(&self).unwrap_or(Value::Null)
        };
        match (detected, explicit) {
            (detected, Value::Null) => detected,
            (Value::Object(mut base), Value::Object(overrides)) => {
                base.extend(overrides);
                Value::Object(base)
            }
            (_, explicit) => explicit,
        }
    }

    fn add_framework(&mut self, name: &str) {
        if !self.frameworks.iter().any(|f| f == name) {
            self.frameworks.push(name.to_string());
        }
    }

    fn apply_pyproject(&mut self, pyproject: &toml::Table) {
        if let Some(black) = pyproject.get("tool").and_then(|tool| tool.get("black")) {
            match serde_json::to_value(black) {
                Ok(value) => {
                    self.conventions.insert("black".to_string(), value);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping black settings"),
            }
        }

        let declared = pyproject
            .get("project")
            .and_then(|project| project.get("dependencies"))
            .and_then(toml::Value::as_array);
        for dependency in declared
            .into_iter()
            .flatten()
            .filter_map(toml::Value::as_str)
        {
            if !self.dependencies.iter().any(|d| d == dependency) {
                self.dependencies.push(dependency.to_string());
            }
        }
    }
}

async fn read_optional(path: &Path) -> Option<String> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return None;
    }
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Failed to read project file");
            None
        }
    }
}

fn parse_requirements(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(ToString::to_string)
}

/// Most common language among top-level files; ties go to the name sorted first.
async fn dominant_language(project_dir: &Path) -> Option<Language> {
    let mut entries = match tokio::fs::read_dir(project_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                project = %project_dir.display(),
                error = %e,
                "Project directory not readable"
            );
            return None;
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    // First-seen order over sorted names, so the strict comparison below
    // keeps the earliest language on ties.
    let mut counts: Vec<(Language, usize)> = Vec::new();
    for name in &names {
        let language = Language::from_path(name);
        if language == Language::Unknown {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == language) {
            Some((_, count)) => *count += 1,
            None => counts.push((language, 1)),
        }
    }

    let mut best: Option<(Language, usize)> = None;
    for (language, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((language, count));
        }
    }
    best.map(|(language, _)| language)
}
