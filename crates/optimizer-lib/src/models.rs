//! Core data models for the cost optimizer

use crate::error::{OptimizerError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource category an observation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceCategory {
    /// Compute instances (EC2)
    #[serde(rename = "EC2")]
    ComputeInstance,
    /// Managed relational databases (RDS)
    #[serde(rename = "RDS")]
    ManagedDatabase,
    /// Object storage buckets (S3)
    #[serde(rename = "S3")]
    ObjectStorage,
    /// Serverless functions (Lambda)
    #[serde(rename = "Lambda")]
    ServerlessFunction,
    /// Block storage volumes (EBS)
    #[serde(rename = "EBS")]
    BlockStorage,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        ServiceCategory::ComputeInstance,
        ServiceCategory::ManagedDatabase,
        ServiceCategory::ObjectStorage,
        ServiceCategory::ServerlessFunction,
        ServiceCategory::BlockStorage,
    ];

    /// Canonical name as it appears in usage reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::ComputeInstance => "EC2",
            ServiceCategory::ManagedDatabase => "RDS",
            ServiceCategory::ObjectStorage => "S3",
            ServiceCategory::ServerlessFunction => "Lambda",
            ServiceCategory::BlockStorage => "EBS",
        }
    }

    /// Descriptive, provider-neutral alias
    pub fn alias(&self) -> &'static str {
        match self {
            ServiceCategory::ComputeInstance => "compute-instance",
            ServiceCategory::ManagedDatabase => "managed-database",
            ServiceCategory::ObjectStorage => "object-storage",
            ServiceCategory::ServerlessFunction => "serverless-function",
            ServiceCategory::BlockStorage => "block-storage",
        }
    }

    /// Storage-only services carry no CPU or memory telemetry
    pub fn is_storage_only(&self) -> bool {
        matches!(
            self,
            ServiceCategory::ObjectStorage | ServiceCategory::BlockStorage
        )
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        ServiceCategory::ALL
            .into_iter()
            .find(|c| {
                c.as_str().eq_ignore_ascii_case(trimmed)
                    || c.alias().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| OptimizerError::UnknownServiceCategory(trimmed.to_string()))
    }
}

/// Cost-optimization action assigned to an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Downsize,
    Upsize,
    Terminate,
    ReservedInstance,
    MoveToGlacier,
    IntelligentTiering,
    DeleteUnused,
    DowngradeToGp3,
    ReduceMemory,
    Optimal,
}

impl Label {
    pub const ALL: [Label; 10] = [
        Label::Downsize,
        Label::Upsize,
        Label::Terminate,
        Label::ReservedInstance,
        Label::MoveToGlacier,
        Label::IntelligentTiering,
        Label::DeleteUnused,
        Label::DowngradeToGp3,
        Label::ReduceMemory,
        Label::Optimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Downsize => "downsize",
            Label::Upsize => "upsize",
            Label::Terminate => "terminate",
            Label::ReservedInstance => "reserved_instance",
            Label::MoveToGlacier => "move_to_glacier",
            Label::IntelligentTiering => "intelligent_tiering",
            Label::DeleteUnused => "delete_unused",
            Label::DowngradeToGp3 => "downgrade_to_gp3",
            Label::ReduceMemory => "reduce_memory",
            Label::Optimal => "optimal",
        }
    }

    /// Returns false for the terminal "no action needed" label
    pub fn is_actionable(&self) -> bool {
        *self != Label::Optimal
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        Label::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| OptimizerError::InvalidObservation(format!("unknown label '{}'", s)))
    }
}

/// Signals known when data is synthesized but absent from usage reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatentSignals {
    /// Requests per billing period (object storage)
    pub access_frequency: Option<u32>,
    /// Whether the volume is attached to an instance (block storage)
    pub attached: Option<bool>,
}

/// One row of usage telemetry for a single resource over one billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageObservation {
    pub date: Option<NaiveDate>,
    pub service: ServiceCategory,
    pub instance_type: String,
    pub region: String,
    pub cost: f64,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub network_io: f64,
    pub storage_used: f64,
    pub running_hours: u32,
    #[serde(default)]
    pub signals: LatentSignals,
}

impl UsageObservation {
    /// Observation with all metrics zeroed, for building rows field by field
    pub fn new(
        service: ServiceCategory,
        instance_type: impl Into<String>,
        region: impl Into<String>,
        cost: f64,
    ) -> Self {
        Self {
            date: None,
            service,
            instance_type: instance_type.into(),
            region: region.into(),
            cost,
            cpu_utilization: 0.0,
            memory_utilization: 0.0,
            network_io: 0.0,
            storage_used: 0.0,
            running_hours: 0,
            signals: LatentSignals::default(),
        }
    }

    /// Allocated function memory parsed from a Lambda size tier such as "1024MB"
    pub fn allocated_memory_mb(&self) -> Option<u32> {
        self.instance_type
            .trim()
            .strip_suffix("MB")
            .and_then(|mb| mb.trim().parse().ok())
    }

    /// Check metric ranges
    pub fn validate(&self) -> Result<()> {
        check_non_negative("Cost", self.cost)?;
        check_non_negative("NetworkIO", self.network_io)?;
        check_non_negative("StorageUsed", self.storage_used)?;
        check_percentage("CPUUtilization", self.cpu_utilization)?;
        check_percentage("MemoryUtilization", self.memory_utilization)?;
        Ok(())
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(OptimizerError::InvalidObservation(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )))
    }
}

fn check_percentage(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(OptimizerError::InvalidObservation(format!(
            "{} must be within [0, 100], got {}",
            field, value
        )))
    }
}

/// Classifier output for one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw label emitted by the model; may be one this build does not know
    pub label: String,
    /// Probability of the predicted label, in [0, 1]
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// An observation paired with the classifier's verdict
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredObservation {
    pub observation: UsageObservation,
    pub prediction: Prediction,
}
