//! Table formatting for review results using comfy-table.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::cli::output::truncate;
use crate::domain::models::{Issue, RoundRecord, Severity};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl TableFormatter {
    /// Formatter with color detection from the environment.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    /// Force colors on or off.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Format per-round records as a table
    pub fn format_rounds(&self, rounds: &[RoundRecord]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Round").add_attribute(Attribute::Bold),
            Cell::new("Score").add_attribute(Attribute::Bold),
            Cell::new("Best").add_attribute(Attribute::Bold),
            Cell::new("Issues").add_attribute(Attribute::Bold),
            Cell::new("Fixed").add_attribute(Attribute::Bold),
            Cell::new("High").add_attribute(Attribute::Bold),
            Cell::new("Weighted").add_attribute(Attribute::Bold),
            Cell::new("Notes").add_attribute(Attribute::Bold),
        ]);

        for round in rounds {
            let score_cell = if self.use_colors && round.improved {
                Cell::new(format!("{:.1}", round.score)).fg(Color::Green)
            } else if round.improved {
                Cell::new(format!("{:.1} ↑", round.score))
            } else {
                Cell::new(format!("{:.1}", round.score))
            };

            let mut notes = Vec::new();
            if round.transformer_fallback {
                notes.push("unchanged".to_string());
            }
            if round.optimization_applied {
                notes.push(format!("optimized ({})", round.optimization_suggestions));
            }
            let notes = if notes.is_empty() {
                "-".to_string()
            } else {
                notes.join(", ")
            };

            let high_cell = if self.use_colors && round.high_severity_count > 0 {
                Cell::new(round.high_severity_count).fg(Color::Red)
            } else {
                Cell::new(round.high_severity_count)
            };

            table.add_row(vec![
                Cell::new(round.iteration),
                score_cell,
                Cell::new(format!("{:.1}", round.best_score)),
                Cell::new(round.issue_count),
                Cell::new(round.issues_fixed),
                high_cell,
                Cell::new(format!("{:.1}", round.weighted_issue_score)),
                Cell::new(notes),
            ]);
        }

        table.to_string()
    }

    /// Format findings as a table, showing at most `limit` rows
    pub fn format_issues(&self, issues: &[Issue], limit: usize) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Line").add_attribute(Attribute::Bold),
            Cell::new("Severity").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Source").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

        for issue in issues.iter().take(limit) {
            let line = if issue.line == 0 {
                "-".to_string()
            } else {
                issue.line.to_string()
            };

            let severity_cell = if self.use_colors {
                Cell::new(issue.severity.as_str()).fg(severity_color(issue.severity))
            } else {
                Cell::new(issue.severity.as_str())
            };

            table.add_row(vec![
                Cell::new(line),
                severity_cell,
                Cell::new(issue.category.as_str()),
                Cell::new(issue.source.to_string()),
                Cell::new(truncate(&issue.description, 70)),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Magenta,
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::DarkGrey,
    }
}
