//! Serving-time usage report ingestion
//!
//! Parses an uploaded CSV report into observations. `Service`, `Region` and
//! `Cost` are mandatory; the remaining telemetry columns are synthesized when
//! absent. Utilization, network and storage fills are random, so results for
//! reports missing those columns are not reproducible across uploads.

use crate::error::{OptimizerError, Result, REQUIRED_COLUMNS};
use crate::models::UsageObservation;
use chrono::NaiveDate;
use csv::StringRecord;
use rand::Rng;
use std::ops::Range;

/// Instance type assumed when the column is missing
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.large";

/// Running hours assumed when the column is missing (a full month)
pub const DEFAULT_RUNNING_HOURS: u32 = 730;

pub const CPU_FILL: Range<f64> = 20.0..80.0;
pub const MEMORY_FILL: Range<f64> = 20.0..80.0;
pub const NETWORK_FILL: Range<f64> = 10.0..100.0;
pub const STORAGE_FILL: Range<f64> = 50.0..500.0;

/// Column positions resolved from the header row
#[derive(Debug, Clone, Default)]
struct ColumnIndex {
    service: usize,
    region: usize,
    cost: usize,
    date: Option<usize>,
    instance_type: Option<usize>,
    cpu: Option<usize>,
    memory: Option<usize>,
    network: Option<usize>,
    storage: Option<usize>,
    hours: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(**c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(OptimizerError::MissingRequiredColumns(missing));
        }

        Ok(Self {
            service: find("Service").unwrap_or_default(),
            region: find("Region").unwrap_or_default(),
            cost: find("Cost").unwrap_or_default(),
            date: find("Date"),
            instance_type: find("InstanceType"),
            cpu: find("CPUUtilization"),
            memory: find("MemoryUtilization"),
            network: find("NetworkIO"),
            storage: find("StorageUsed"),
            hours: find("RunningHours"),
        })
    }

    fn synthesized(&self) -> Vec<&'static str> {
        [
            ("CPUUtilization", self.cpu),
            ("MemoryUtilization", self.memory),
            ("NetworkIO", self.network),
            ("StorageUsed", self.storage),
            ("RunningHours", self.hours),
            ("InstanceType", self.instance_type),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Parsed upload ready for classification
#[derive(Debug, Clone)]
pub struct UsageBatch {
    pub observations: Vec<UsageObservation>,
    /// Optional columns that were absent and filled with defaults
    pub synthesized_columns: Vec<&'static str>,
}

impl UsageBatch {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Parse an uploaded report
///
/// # Errors
/// * `EmptyOrMalformedUpload` for an empty body, no data rows, or a cell
///   that cannot be parsed
/// * `MissingRequiredColumns` naming every absent mandatory column
/// * `UnknownServiceCategory` for a service outside the five known ones
pub fn parse_upload<R: Rng>(bytes: &[u8], rng: &mut R) -> Result<UsageBatch> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(OptimizerError::EmptyOrMalformedUpload("file is empty".into()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| OptimizerError::EmptyOrMalformedUpload(format!("unreadable header: {}", e)))?
        .clone();
    let columns = ColumnIndex::resolve(&headers)?;

    let mut observations = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| OptimizerError::EmptyOrMalformedUpload(format!("row {}: {}", i + 1, e)))?;
        // Skip blank trailing lines
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        observations.push(parse_row(&record, &columns, i + 1, rng)?);
    }

    if observations.is_empty() {
        return Err(OptimizerError::EmptyOrMalformedUpload("no data rows".into()));
    }

    Ok(UsageBatch {
        observations,
        synthesized_columns: columns.synthesized(),
    })
}

fn parse_row<R: Rng>(
    record: &StringRecord,
    columns: &ColumnIndex,
    row: usize,
    rng: &mut R,
) -> Result<UsageObservation> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let service = field(columns.service).parse()?;
    let cost = parse_number(field(columns.cost), "Cost", row)?;
    let instance_type = columns
        .instance_type
        .map(field)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_INSTANCE_TYPE);

    let mut obs = UsageObservation::new(service, instance_type, field(columns.region), cost);

    // Dates are informational; partial forms like "2025-09" are accepted and ignored
    obs.date = columns
        .date
        .and_then(|idx| NaiveDate::parse_from_str(field(idx), "%Y-%m-%d").ok());

    obs.cpu_utilization = match columns.cpu {
        Some(idx) => parse_number(field(idx), "CPUUtilization", row)?,
        None => rng.random_range(CPU_FILL),
    };
    obs.memory_utilization = match columns.memory {
        Some(idx) => parse_number(field(idx), "MemoryUtilization", row)?,
        None => rng.random_range(MEMORY_FILL),
    };
    obs.network_io = match columns.network {
        Some(idx) => parse_number(field(idx), "NetworkIO", row)?,
        None => rng.random_range(NETWORK_FILL),
    };
    obs.storage_used = match columns.storage {
        Some(idx) => parse_number(field(idx), "StorageUsed", row)?,
        None => rng.random_range(STORAGE_FILL),
    };
    obs.running_hours = match columns.hours {
        Some(idx) => parse_hours(field(idx), row)?,
        None => DEFAULT_RUNNING_HOURS,
    };

    obs.validate()
        .map_err(|e| OptimizerError::EmptyOrMalformedUpload(format!("row {}: {}", row, e)))?;
    Ok(obs)
}

fn parse_number(raw: &str, column: &str, row: usize) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| {
        OptimizerError::EmptyOrMalformedUpload(format!(
            "row {}: column {} has non-numeric value '{}'",
            row, column, raw
        ))
    })
}

fn parse_hours(raw: &str, row: usize) -> Result<u32> {
    let hours = parse_number(raw, "RunningHours", row)?;
    if hours.is_finite() && hours >= 0.0 && hours.fract() == 0.0 && hours <= u32::MAX as f64 {
        Ok(hours as u32)
    } else {
        Err(OptimizerError::EmptyOrMalformedUpload(format!(
            "row {}: RunningHours must be a non-negative integer, got '{}'",
            row, raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceCategory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn test_minimal_upload_synthesizes_optional_columns() {
        let csv = "Service,Region,Cost,Date\n\
                   EC2,us-east-1,450.00,2025-09\n\
                   S3,us-east-1,850.00,2025-09\n\
                   Lambda,us-east-1,45.00,2025-08\n";
        let batch = parse_upload(csv.as_bytes(), &mut rng()).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.synthesized_columns,
            vec![
                "CPUUtilization",
                "MemoryUtilization",
                "NetworkIO",
                "StorageUsed",
                "RunningHours",
                "InstanceType"
            ]
        );

        for obs in &batch.observations {
            assert!(CPU_FILL.contains(&obs.cpu_utilization));
            assert!(MEMORY_FILL.contains(&obs.memory_utilization));
            assert!(NETWORK_FILL.contains(&obs.network_io));
            assert!(STORAGE_FILL.contains(&obs.storage_used));
            assert_eq!(obs.running_hours, DEFAULT_RUNNING_HOURS);
            assert_eq!(obs.instance_type, DEFAULT_INSTANCE_TYPE);
            assert_eq!(obs.date, None);
        }
        assert_eq!(batch.observations[1].service, ServiceCategory::ObjectStorage);
        assert_eq!(batch.observations[2].cost, 45.0);
    }

    #[test]
    fn test_full_upload_keeps_supplied_values() {
        let csv = "Date,Service,InstanceType,Region,Cost,CPUUtilization,MemoryUtilization,NetworkIO,StorageUsed,RunningHours\n\
                   2024-05-01,EBS,io2,eu-west-1,37.5,0,0,12.5,300,730\n";
        let batch = parse_upload(csv.as_bytes(), &mut rng()).unwrap();
        assert!(batch.synthesized_columns.is_empty());

        let obs = &batch.observations[0];
        assert_eq!(obs.instance_type, "io2");
        assert_eq!(obs.network_io, 12.5);
        assert_eq!(obs.storage_used, 300.0);
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_missing_required_columns_are_named() {
        let csv = "Service,Amount\nEC2,10\n";
        match parse_upload(csv.as_bytes(), &mut rng()) {
            Err(OptimizerError::MissingRequiredColumns(missing)) => {
                assert_eq!(missing, vec!["Region".to_string(), "Cost".to_string()]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_uploads_are_rejected() {
        for body in ["", "  \n", "Service,Region,Cost\n", "Service,Region,Cost\n,,\n"] {
            let err = parse_upload(body.as_bytes(), &mut rng()).unwrap_err();
            assert!(
                matches!(err, OptimizerError::EmptyOrMalformedUpload(_)),
                "body {:?} gave {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_non_numeric_cost_is_malformed() {
        let csv = "Service,Region,Cost\nEC2,us-east-1,lots\n";
        let err = parse_upload(csv.as_bytes(), &mut rng()).unwrap_err();
        assert!(matches!(err, OptimizerError::EmptyOrMalformedUpload(ref m) if m.contains("row 1") && m.contains("Cost")));
    }

    #[test]
    fn test_out_of_range_utilization_is_malformed() {
        let csv = "Service,Region,Cost,CPUUtilization\nEC2,us-east-1,10,140\n";
        let err = parse_upload(csv.as_bytes(), &mut rng()).unwrap_err();
        assert!(matches!(err, OptimizerError::EmptyOrMalformedUpload(_)));
    }

    #[test]
    fn test_unknown_service_fails_validation() {
        let csv = "Service,Region,Cost\nCloudFront,us-east-1,10\n";
        let err = parse_upload(csv.as_bytes(), &mut rng()).unwrap_err();
        assert!(matches!(err, OptimizerError::UnknownServiceCategory(ref s) if s == "CloudFront"));
    }

    #[test]
    fn test_fractional_hours_rejected() {
        let csv = "Service,Region,Cost,RunningHours\nEC2,us-east-1,10,12.5\n";
        assert!(parse_upload(csv.as_bytes(), &mut rng()).is_err());

        let csv = "Service,Region,Cost,RunningHours\nEC2,us-east-1,10,700.0\n";
        let batch = parse_upload(csv.as_bytes(), &mut rng()).unwrap();
        assert_eq!(batch.observations[0].running_hours, 700);
    }
}
