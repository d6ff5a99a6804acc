//! Offline dataset commands: synthetic generation and relabeling

use anyhow::{Context, Result};
use colored::Colorize;
use optimizer_lib::dataset::{self, DatasetSummary, TrainingRecord};
use optimizer_lib::generator::{GeneratorConfig, SyntheticGenerator};
use optimizer_lib::labeling::LabelingPolicy;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tabled::Tabled;
use tracing::{debug, warn};

use crate::output::{
    format_currency, print_info, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the label distribution table
#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Recommendation")]
    label: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Share")]
    share: String,
}

fn write_file(path: &Path, records: &[TrainingRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    dataset::write_records(BufWriter::new(file), records)?;
    Ok(())
}

fn print_summary(summary: &DatasetSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            println!();
            println!("{}", "Recommendation Distribution".bold());
            let rows: Vec<LabelRow> = summary
                .label_counts
                .iter()
                .map(|(label, count)| LabelRow {
                    label: label.clone(),
                    rows: *count,
                    share: format!("{:.1}%", *count as f64 / summary.rows.max(1) as f64 * 100.0),
                })
                .collect();
            print_table(&rows);

            println!();
            println!(
                "Cost range:   {} - {}",
                format_currency(summary.min_cost),
                format_currency(summary.max_cost)
            );
            println!("Average cost: {}", format_currency(summary.mean_cost));
            Ok(())
        }
    }
}

/// Generate a labeled synthetic training set
pub fn generate(rows: usize, seed: u64, output: &Path, format: OutputFormat) -> Result<()> {
    let mut generator = SyntheticGenerator::new(GeneratorConfig {
        rows,
        seed,
        ..Default::default()
    })?;
    let records: Vec<TrainingRecord> = generator.generate().iter().map(TrainingRecord::from).collect();
    debug!(rows = records.len(), seed = seed, "Generated synthetic rows");

    write_file(output, &records)?;
    if format == OutputFormat::Table {
        print_success(&format!("Generated {} rows of usage data", records.len()));
        print_info(&format!("Saved to: {}", output.display()));
    }
    print_summary(&DatasetSummary::from_records(&records), format)
}

/// Default output path for `label`: `<stem>_labeled.csv` next to the input
pub fn labeled_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    input.with_file_name(format!("{}_labeled.csv", stem))
}

/// Apply the labeling policy to an existing training file.
///
/// Existing labels are kept unless `force` is set.
pub fn label(
    input: &Path,
    output: Option<PathBuf>,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut records = dataset::read_records(file)?;
    let stats = dataset::relabel(&mut records, &LabelingPolicy::new(), force)?;
    debug!(
        filled = stats.filled,
        agreed = stats.agreed,
        disagreed = stats.disagreed,
        "Applied labeling policy"
    );

    if stats.disagreed > 0 {
        let message = if stats.overwritten {
            format!("Overwrote {} existing labels that disagreed with the policy", stats.disagreed)
        } else {
            format!(
                "Kept {} existing labels that disagree with the policy (use --force to overwrite)",
                stats.disagreed
            )
        };
        warn!("{}", message);
        if format == OutputFormat::Table {
            print_warning(&message);
        }
    }

    let output = output.unwrap_or_else(|| labeled_path(input));
    write_file(&output, &records)?;
    if format == OutputFormat::Table {
        print_success(&format!(
            "Labeled {} rows ({} newly labeled)",
            records.len(),
            stats.filled
        ));
        print_info(&format!("Saved to: {}", output.display()));
    }
    print_summary(&DatasetSummary::from_records(&records), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_path() {
        assert_eq!(
            labeled_path(Path::new("/data/aws_usage_data.csv")),
            PathBuf::from("/data/aws_usage_data_labeled.csv")
        );
    }

    #[test]
    fn test_generate_then_label_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("usage.csv");
        generate(50, 7, &generated, OutputFormat::Json).unwrap();

        let relabeled = dir.path().join("relabeled.csv");
        label(&generated, Some(relabeled.clone()), false, OutputFormat::Json).unwrap();

        let original = dataset::read_records(File::open(&generated).unwrap()).unwrap();
        let after = dataset::read_records(File::open(&relabeled).unwrap()).unwrap();
        assert_eq!(original.len(), 50);
        assert_eq!(after, original);
    }
}
