//! Output formatting for CLI commands.
//!
//! This module renders run reports for the terminal or as JSON.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::error::GorcError;
use crate::orchestrator::{Operation, Report};
use crate::planner::{KindPlan, SyncStatus};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Per-kind row for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Update")]
    update: String,
    #[tabled(rename = "Unknown")]
    remove: String,
    #[tabled(rename = "Disposition")]
    disposition: String,
}

/// Organization field row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Desired")]
    desired: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run report for display.
    #[must_use]
    pub fn format_report(&self, report: &Report) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats an error that ended an operation.
    #[must_use]
    pub fn format_error(&self, operation: Operation, error: &GorcError) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "operation": operation,
                    "status": "error",
                    "message": error.to_string(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {operation} failed: {error}\n", "✗".red()),
        }
    }

    fn format_report_text(report: &Report) -> String {
        let mut output = format!(
            "\n{} {} for {}\n",
            "▶".cyan(),
            report.operation.to_string().bold(),
            report.org
        );
        let _ = writeln!(output, "   Run: {}", report.run_id);
        if let Some(fingerprint) = &report.fingerprint {
            let _ = writeln!(output, "   Fingerprint: {}", &fingerprint[..12.min(fingerprint.len())]);
        }
        output.push('\n');

        if report.valid == Some(true) {
            let _ = writeln!(output, "{} Document is valid", "✓".green());
        }

        if !report.changes.is_empty() {
            let rows: Vec<KindRow> = report.changes.iter().map(Self::kind_row).collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        for plan in &report.changes {
            Self::write_details(&mut output, plan);
        }

        if !report.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
            for warning in &report.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        if report.errors.is_empty() {
            let _ = write!(
                output,
                "\n{} {} change(s), no errors\n",
                "✓".green(),
                report.change_count()
            );
        } else {
            let _ = write!(output, "\n{} Errors:\n", "✗".red());
            for error in &report.errors {
                let _ = writeln!(output, "   - {}", error.message);
            }
        }

        output
    }

    fn kind_row(plan: &KindPlan) -> KindRow {
        KindRow {
            kind: plan.kind.to_string(),
            status: Self::format_status(plan.status),
            update: Self::format_keys(&plan.update),
            remove: Self::format_keys(&plan.remove),
            disposition: plan
                .disposition
                .filter(|_| !plan.remove.is_empty())
                .map_or_else(String::new, |d| d.to_string()),
        }
    }

    fn write_details(output: &mut String, plan: &KindPlan) {
        if !plan.fields.is_empty() {
            let _ = write!(output, "\n{} fields:\n", plan.kind);
            let rows: Vec<FieldRow> = plan
                .fields
                .iter()
                .map(|c| FieldRow {
                    field: c.field.clone(),
                    current: c.current.clone().unwrap_or_else(|| String::from("-")),
                    desired: c.desired.clone(),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        for nested in &plan.nested {
            let _ = writeln!(output, "   {} / {}:", nested.parent.bold(), nested.kind);
            for key in &nested.update {
                let _ = writeln!(output, "     {} {key}", "+".green());
            }
            for key in &nested.remove {
                let _ = writeln!(output, "     {} {key} ({})", "-".red(), nested.disposition);
            }
        }
    }

    fn format_status(status: SyncStatus) -> String {
        match status {
            SyncStatus::InSync => "in sync".green().to_string(),
            SyncStatus::Planned => "planned".yellow().to_string(),
            SyncStatus::Applied => "applied".cyan().to_string(),
        }
    }

    /// Joins identities, eliding long lists.
    fn format_keys(keys: &[String]) -> String {
        const SHOWN: usize = 5;
        if keys.len() <= SHOWN {
            keys.join(", ")
        } else {
            format!("{}, +{} more", keys[..SHOWN].join(", "), keys.len() - SHOWN)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_keys_elides() {
        let keys: Vec<String> = (1..=7).map(|i| format!("user{i}")).collect();
        assert_eq!(
            OutputFormatter::format_keys(&keys),
            "user1, user2, user3, user4, user5, +2 more"
        );
        assert_eq!(OutputFormatter::format_keys(&keys[..2]), "user1, user2");
    }

    #[test]
    fn test_json_error() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format_error(
            Operation::Apply,
            &GorcError::UnknownOperation {
                name: String::from("destroy"),
            },
        );
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["operation"], "apply");
        assert_eq!(json["status"], "error");
    }
}
