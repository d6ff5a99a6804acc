//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use optimizer_lib::recommend::Severity;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a dollar amount
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Color severity based on value
pub fn color_severity(severity: Severity) -> String {
    match severity {
        Severity::High => severity.to_string().red().bold().to_string(),
        Severity::Med => severity.to_string().yellow().to_string(),
    }
}

/// Color a confidence percentage
pub fn color_confidence(percent: f64) -> String {
    let formatted = format!("{:.1}%", percent);
    if percent >= 80.0 {
        formatted.green().to_string()
    } else if percent >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_config() {
        assert_eq!(OutputFormat::from_config("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_config("yaml"), None);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(18.0), "$18.00");
        assert_eq!(format_currency(1234.567), "$1234.57");
    }
}
