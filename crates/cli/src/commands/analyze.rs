//! Commands that talk to the optimizer service

use anyhow::{Context, Result};
use colored::Colorize;
use optimizer_lib::recommend::AnalysisReport;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_confidence, color_severity, format_currency, print_json, print_success, print_table, OutputFormat,
};

/// Row for the recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "#")]
    id: usize,
    #[tabled(rename = "Recommendation")]
    kind: String,
    #[tabled(rename = "Resources")]
    count: usize,
    #[tabled(rename = "Current Cost")]
    current_cost: String,
    #[tabled(rename = "Savings/mo")]
    save: String,
    #[tabled(rename = "Confidence")]
    conf: String,
    #[tabled(rename = "Severity")]
    sev: String,
    #[tabled(rename = "Action")]
    action: String,
}

fn print_report(report: &AnalysisReport) {
    println!("{}", "Cost Analysis".bold());
    println!("{}", "=".repeat(50));
    println!("Rows analyzed:          {}", report.total_rows);
    let services: Vec<String> = report
        .services
        .iter()
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect();
    println!("Services:               {}", services.join(", ").cyan());
    println!("Total monthly cost:     {}", format_currency(report.total_cost));
    println!(
        "{} {} ({:.0}%)",
        "Potential savings:     ".bold(),
        format_currency(report.total_savings).green().bold(),
        report.savings_percentage
    );
    println!();

    if report.recommendations.is_empty() {
        print_success("No optimization opportunities found");
        return;
    }

    let rows: Vec<RecommendationRow> = report
        .recommendations
        .iter()
        .map(|r| RecommendationRow {
            id: r.id,
            kind: r.kind.clone(),
            count: r.count,
            current_cost: format_currency(r.current_cost),
            save: format_currency(r.save),
            conf: color_confidence(r.conf),
            sev: color_severity(r.sev),
            action: r.action.clone(),
        })
        .collect();
    print_table(&rows);
}

/// Upload a usage report and show the recommendations
pub async fn analyze(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let report = client.analyze(file).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

/// Analyze a report, then render the recommendations as Terraform
pub async fn terraform(client: &ApiClient, file: &Path, output: Option<&Path>) -> Result<()> {
    let report = client.analyze(file).await?;
    if report.recommendations.is_empty() {
        // stderr, so a script piped from stdout stays clean
        eprintln!(
            "{} No recommendations; the script will contain only the provider setup",
            "⚠".yellow().bold()
        );
    }

    let script = client.terraform(&report.recommendations).await?;
    match output {
        Some(path) => {
            std::fs::write(path, &script).with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!(
                "Wrote Terraform for {} recommendation(s) to {}",
                report.recommendations.len(),
                path.display()
            ));
        }
        None => print!("{}", script),
    }
    Ok(())
}

/// Check that the service is up
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.health().await?;
    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => print_success(&format!("{} ({})", status.message, status.status)),
    }
    Ok(())
}
