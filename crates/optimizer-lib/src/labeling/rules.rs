//! Per-service rule tables
//!
//! Each table is evaluated top to bottom and the first matching rule wins.
//! Rules only read fields that belong to their service category.

use crate::models::{Label, UsageObservation};

/// A named thresholding rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub label: Label,
    pub matches: fn(&UsageObservation) -> bool,
}

/// S3 storage class the tiering rules apply to
pub const STANDARD_TIER: &str = "Standard";

/// Provisioned-IOPS EBS volume types
pub const PROVISIONED_IOPS_TIERS: [&str; 2] = ["io1", "io2"];

pub static COMPUTE_RULES: &[Rule] = &[
    Rule {
        name: "underutilized_and_costly",
        label: Label::Downsize,
        matches: compute_underutilized,
    },
    Rule {
        name: "cpu_and_memory_saturated",
        label: Label::Upsize,
        matches: compute_saturated,
    },
    Rule {
        name: "barely_running",
        label: Label::Terminate,
        matches: compute_barely_running,
    },
];

pub static DATABASE_RULES: &[Rule] = &[
    Rule {
        name: "underutilized_and_costly",
        label: Label::Downsize,
        matches: database_underutilized,
    },
    Rule {
        name: "steady_on_demand",
        label: Label::ReservedInstance,
        matches: database_steady_on_demand,
    },
];

pub static OBJECT_STORAGE_RULES: &[Rule] = &[
    Rule {
        name: "cold_standard_bucket",
        label: Label::MoveToGlacier,
        matches: storage_cold_bucket,
    },
    Rule {
        name: "large_standard_bucket",
        label: Label::IntelligentTiering,
        matches: storage_large_bucket,
    },
];

pub static FUNCTION_RULES: &[Rule] = &[Rule {
    name: "overprovisioned_memory",
    label: Label::ReduceMemory,
    matches: function_overprovisioned,
}];

pub static BLOCK_STORAGE_RULES: &[Rule] = &[
    Rule {
        name: "unattached_volume",
        label: Label::DeleteUnused,
        matches: volume_unattached,
    },
    Rule {
        name: "idle_provisioned_iops",
        label: Label::DowngradeToGp3,
        matches: volume_idle_piops,
    },
];

fn compute_underutilized(o: &UsageObservation) -> bool {
    o.cpu_utilization < 30.0 && o.cost > 50.0
}

fn compute_saturated(o: &UsageObservation) -> bool {
    o.cpu_utilization > 80.0 && o.memory_utilization > 80.0
}

fn compute_barely_running(o: &UsageObservation) -> bool {
    o.running_hours < 200
}

fn database_underutilized(o: &UsageObservation) -> bool {
    o.cpu_utilization < 25.0 && o.cost > 100.0
}

fn database_steady_on_demand(o: &UsageObservation) -> bool {
    o.running_hours > 500 && o.cost > 150.0
}

fn storage_cold_bucket(o: &UsageObservation) -> bool {
    // Unknown access frequency never counts as cold
    let rarely_accessed = o.signals.access_frequency.is_some_and(|f| f < 50);
    o.instance_type == STANDARD_TIER && rarely_accessed && o.storage_used > 1000.0
}

fn storage_large_bucket(o: &UsageObservation) -> bool {
    o.instance_type == STANDARD_TIER && o.storage_used > 5000.0
}

fn function_overprovisioned(o: &UsageObservation) -> bool {
    o.memory_utilization < 40.0 && o.allocated_memory_mb().is_some_and(|mb| mb > 512)
}

fn volume_unattached(o: &UsageObservation) -> bool {
    // Usage reports do not carry attachment state; assume attached
    !o.signals.attached.unwrap_or(true)
}

fn volume_idle_piops(o: &UsageObservation) -> bool {
    PROVISIONED_IOPS_TIERS.contains(&o.instance_type.as_str()) && o.network_io < 50.0
}
