//! Training dataset I/O
//!
//! Reads and writes the row-oriented training file
//! (`Date, Service, InstanceType, Region, Cost, CPUUtilization,
//! MemoryUtilization, NetworkIO, StorageUsed, RunningHours, Recommendation`).

use crate::error::{OptimizerError, Result};
use crate::generator::GeneratedRow;
use crate::labeling::LabelingPolicy;
use crate::models::{Label, UsageObservation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the training file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "CPUUtilization")]
    pub cpu_utilization: f64,
    #[serde(rename = "MemoryUtilization")]
    pub memory_utilization: f64,
    #[serde(rename = "NetworkIO")]
    pub network_io: f64,
    #[serde(rename = "StorageUsed")]
    pub storage_used: f64,
    #[serde(rename = "RunningHours")]
    pub running_hours: u32,
    #[serde(rename = "Recommendation", default)]
    pub recommendation: Option<String>,
}

impl TrainingRecord {
    pub fn from_observation(observation: &UsageObservation, label: Option<Label>) -> Self {
        Self {
            date: observation.date.map(|d| d.format(DATE_FORMAT).to_string()),
            service: observation.service.as_str().to_string(),
            instance_type: observation.instance_type.clone(),
            region: observation.region.clone(),
            cost: observation.cost,
            cpu_utilization: observation.cpu_utilization,
            memory_utilization: observation.memory_utilization,
            network_io: observation.network_io,
            storage_used: observation.storage_used,
            running_hours: observation.running_hours,
            recommendation: label.map(|l| l.as_str().to_string()),
        }
    }

    /// Convert back into an observation; latent signals are not recoverable
    pub fn to_observation(&self) -> Result<UsageObservation> {
        let date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|e| OptimizerError::InvalidObservation(format!("bad Date '{}': {}", raw, e)))?,
            ),
            _ => None,
        };

        let mut observation = UsageObservation::new(
            self.service.parse()?,
            self.instance_type.clone(),
            self.region.clone(),
            self.cost,
        );
        observation.date = date;
        observation.cpu_utilization = self.cpu_utilization;
        observation.memory_utilization = self.memory_utilization;
        observation.network_io = self.network_io;
        observation.storage_used = self.storage_used;
        observation.running_hours = self.running_hours;
        observation.validate()?;
        Ok(observation)
    }
}

impl From<&GeneratedRow> for TrainingRecord {
    fn from(row: &GeneratedRow) -> Self {
        TrainingRecord::from_observation(&row.observation, Some(row.label))
    }
}

/// Write records with a header row
pub fn write_records<W: Write>(writer: W, records: &[TrainingRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read every record of a training-schema file
pub fn read_records<R: Read>(reader: R) -> Result<Vec<TrainingRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for result in csv_reader.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Counts from a relabeling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelabelStats {
    /// Unlabeled rows that received a policy label
    pub filled: usize,
    /// Labeled rows where the policy agrees with the existing label
    pub agreed: usize,
    /// Labeled rows where the policy disagrees with the existing label
    pub disagreed: usize,
    /// Whether disagreeing labels were replaced
    pub overwritten: bool,
}

/// Apply the labeling policy to a dataset.
///
/// Unlabeled rows are always filled. Existing labels are only replaced when
/// `overwrite` is set: rows read back from a file carry no latent signals and
/// their cost already includes noise, so the policy can disagree with the
/// label the generator assigned. Every row is validated either way.
pub fn relabel(
    records: &mut [TrainingRecord],
    policy: &LabelingPolicy,
    overwrite: bool,
) -> Result<RelabelStats> {
    let mut stats = RelabelStats {
        overwritten: overwrite,
        ..Default::default()
    };

    for record in records.iter_mut() {
        let observation = record.to_observation()?;
        let label = policy.label(&observation).as_str();

        match record.recommendation.as_deref().filter(|l| !l.is_empty()) {
            None => {
                stats.filled += 1;
                record.recommendation = Some(label.to_string());
            }
            Some(existing) if existing == label => stats.agreed += 1,
            Some(_) => {
                stats.disagreed += 1;
                if overwrite {
                    record.recommendation = Some(label.to_string());
                }
            }
        }
    }
    Ok(stats)
}

/// Label counts and cost statistics of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub min_cost: f64,
    pub max_cost: f64,
    pub mean_cost: f64,
}

impl DatasetSummary {
    pub fn from_records(records: &[TrainingRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut label_counts = BTreeMap::new();
        for record in records {
            let label = record.recommendation.clone().unwrap_or_else(|| "unlabeled".to_string());
            *label_counts.entry(label).or_insert(0) += 1;
        }

        let costs = records.iter().map(|r| r.cost);
        let min_cost = costs.clone().fold(f64::INFINITY, f64::min);
        let max_cost = costs.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean_cost = costs.sum::<f64>() / records.len() as f64;

        Self {
            rows: records.len(),
            label_counts,
            min_cost,
            max_cost,
            mean_cost,
        }
    }
}
